use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::types::{ListenAddr, Portal, PortalParams};

use super::{Engine, ValidationErrors, reconcile};

impl Engine {
    /// Possible choices for the `listen.ip` attribute of portal create and
    /// update. The wildcard addresses are always offered; the rest come from
    /// the address collaborator. Under ALUA the node-local addresses are
    /// listed instead of the shared virtual address, since that is what the
    /// service will actually bind.
    pub fn listen_ip_choices(&self) -> Result<BTreeMap<String, String>> {
        let mut choices = BTreeMap::from([
            ("0.0.0.0".to_string(), "0.0.0.0".to_string()),
            ("::".to_string(), "::".to_string()),
        ]);
        for (addr, label) in self.addrs.ip_choices(self.settings.service.alua)? {
            choices.insert(addr, label);
        }
        Ok(choices)
    }

    fn validate_portal(
        &self,
        data: &PortalParams,
        old: Option<&Portal>,
    ) -> Result<ValidationErrors> {
        let mut verrors = ValidationErrors::new();

        if data.listen.is_empty() {
            verrors.add("listen", "At least one listen entry is required.");
        } else {
            let system_ips = self.listen_ip_choices()?;
            // Addresses the portal already listened on are grandfathered;
            // only addresses introduced by this call must still be
            // configured on the system.
            let old_ips: HashSet<&str> = old
                .map(|o| o.listen.iter().map(|l| l.ip.as_str()).collect())
                .unwrap_or_default();

            for (i, entry) in data.listen.iter().enumerate() {
                if entry.port == 0 {
                    verrors.add(
                        format!("listen.{i}.port"),
                        "Port must be between 1 and 65535.",
                    );
                }

                if self
                    .store
                    .listen_in_use(&entry.ip, entry.port, old.map(|o| o.id))?
                {
                    verrors.add(
                        format!("listen.{i}"),
                        format!("{}:{} already in use.", entry.ip, entry.port),
                    );
                }

                let grandfathered = old.is_some() && old_ips.contains(entry.ip.as_str());
                if !grandfathered && !system_ips.contains_key(&entry.ip) {
                    verrors.add(
                        format!("listen.{i}.ip"),
                        format!("IP {} not configured on this system.", entry.ip),
                    );
                }
            }
        }

        match data.discovery_authgroup {
            Some(tag) => {
                if self.store.list_auth_by_tag(tag)?.is_empty() {
                    verrors.add(
                        "discovery_authgroup",
                        format!("Auth Group \"{tag}\" not found."),
                    );
                }
            }
            None => {
                if data.discovery_authmethod.requires_auth() {
                    verrors.add(
                        "discovery_authgroup",
                        "This field is required if discovery method is set to CHAP or CHAP Mutual.",
                    );
                }
            }
        }

        Ok(verrors)
    }

    /// Create a new portal. `discovery_authgroup` is required for CHAP and
    /// CHAP_MUTUAL discovery.
    pub fn portal_create(&self, data: PortalParams) -> Result<Portal> {
        self.validate_portal(&data, None)?.into_result()?;

        // tag attribute increments sequentially
        let tag = self.store.count_portals()? + 1;

        let id = self.store.create_portal(&Portal {
            id: 0,
            tag,
            comment: data.comment.clone(),
            discovery_authmethod: data.discovery_authmethod,
            discovery_authgroup: data.discovery_authgroup,
            listen: Vec::new(),
        })?;

        if let Err(e) = self.save_listen(id, &data.listen, &[]) {
            self.store.delete_portal(id)?;
            return Err(e);
        }

        self.reload_service()?;
        self.store.get_portal(id)?.ok_or(Error::NotFound)
    }

    /// Update portal `id`, replacing its settings and listen set.
    pub fn portal_update(&self, id: i64, data: PortalParams) -> Result<Portal> {
        let old = self.store.get_portal(id)?.ok_or(Error::NotFound)?;
        self.validate_portal(&data, Some(&old))?.into_result()?;

        self.save_listen(id, &data.listen, &old.listen)?;
        self.store.update_portal(&Portal {
            id,
            tag: old.tag,
            comment: data.comment,
            discovery_authmethod: data.discovery_authmethod,
            discovery_authgroup: data.discovery_authgroup,
            listen: Vec::new(),
        })?;

        self.reload_service()?;
        self.store.get_portal(id)?.ok_or(Error::NotFound)
    }

    /// Delete portal `id`, along with the target groups bound to it, then
    /// renumber the remaining portals to a dense 1..N tag sequence.
    pub fn portal_delete(&self, id: i64) -> Result<()> {
        self.store.get_portal(id)?.ok_or(Error::NotFound)?;

        self.store.delete_groups_for_portal(id)?;
        self.store.delete_listen_for_portal(id)?;
        self.store.delete_portal(id)?;

        for (i, portal) in self.store.list_portals()?.iter().enumerate() {
            self.store.set_portal_tag(portal.id, (i as i64) + 1)?;
        }

        self.reload_service()
    }

    pub fn portal_get(&self, id: i64) -> Result<Portal> {
        self.store.get_portal(id)?.ok_or(Error::NotFound)
    }

    pub fn portal_list(&self) -> Result<Vec<Portal>> {
        self.store.list_portals()
    }

    /// Sync the stored listen set with the requested one: stale pairs are
    /// removed first, new pairs inserted after.
    fn save_listen(&self, portal_id: i64, new: &[ListenAddr], old: &[ListenAddr]) -> Result<()> {
        let diff = reconcile::diff(old, new);
        for addr in &diff.to_delete {
            self.store.delete_listen(portal_id, addr)?;
        }
        for addr in &diff.to_insert {
            self.store.insert_listen(portal_id, addr)?;
        }
        Ok(())
    }
}
