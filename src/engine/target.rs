use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::types::{AuthMethod, Target, TargetGroup, TargetMode, TargetParams};

use super::{Engine, ValidationErrors, reconcile};

const RESERVED_ALIAS: &str = "target";

fn valid_target_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | ':'))
}

impl Engine {
    fn validate_target(
        &self,
        data: &TargetParams,
        old: Option<&Target>,
    ) -> Result<ValidationErrors> {
        let mut verrors = ValidationErrors::new();
        let exclude = old.map(|o| o.id);

        if !valid_target_name(&data.name) {
            verrors.add(
                "name",
                "Lowercase alphanumeric characters plus dot (.), dash (-), and colon (:) are allowed.",
            );
        } else if self.store.target_name_taken(&data.name, exclude)? {
            verrors.add("name", "Target name already exists");
        }

        if let Some(alias) = &data.alias {
            if alias.contains('"') {
                verrors.add("alias", "Double quotes are not allowed");
            } else if alias == RESERVED_ALIAS {
                verrors.add("alias", "target is a reserved word");
            } else if self.store.target_alias_taken(alias, exclude)? {
                verrors.add("alias", "Alias already exists");
            }
        }

        if data.mode != TargetMode::Iscsi && !self.settings.service.fibre_channel {
            verrors.add("mode", "Fibre Channel not enabled");
        }

        let portal_ids: Vec<i64> = data.groups.iter().map(|g| g.portal).collect();
        let db_portals: HashSet<i64> = self
            .store
            .existing_portal_ids(&portal_ids)?
            .into_iter()
            .collect();

        let initiator_ids: Vec<i64> = data.groups.iter().filter_map(|g| g.initiator).collect();
        let db_initiators: HashSet<i64> = self
            .store
            .existing_initiator_ids(&initiator_ids)?
            .into_iter()
            .collect();

        let mut seen_portals = HashSet::new();
        for (i, group) in data.groups.iter().enumerate() {
            if seen_portals.contains(&group.portal) {
                verrors.add(
                    format!("groups.{i}.portal"),
                    format!("Portal {} cannot be duplicated on a target", group.portal),
                );
            } else if !db_portals.contains(&group.portal) {
                verrors.add(
                    format!("groups.{i}.portal"),
                    format!("{} Portal not found in database", group.portal),
                );
            } else {
                seen_portals.insert(group.portal);
            }

            if let Some(initiator) = group.initiator {
                if !db_initiators.contains(&initiator) {
                    verrors.add(
                        format!("groups.{i}.initiator"),
                        format!("{initiator} Initiator not found in database"),
                    );
                }
            }

            match group.auth {
                None if group.authmethod.requires_auth() => {
                    verrors.add(
                        format!("groups.{i}.auth"),
                        "Authentication group is required for CHAP and CHAP Mutual",
                    );
                }
                Some(tag) if group.authmethod == AuthMethod::ChapMutual => {
                    match self.store.list_auth_by_tag(tag)?.first() {
                        None => {
                            verrors.add(format!("groups.{i}.auth"), "Authentication group not found");
                        }
                        Some(auth) if auth.peeruser.is_empty() => {
                            verrors.add(
                                format!("groups.{i}.auth"),
                                format!("Authentication group {tag} does not support CHAP Mutual"),
                            );
                        }
                        Some(_) => {}
                    }
                }
                _ => {}
            }
        }

        Ok(verrors)
    }

    /// Create a target. `groups` bind portals (and optionally initiator
    /// lists and auth credentials) to it.
    pub fn target_create(&self, data: TargetParams) -> Result<Target> {
        self.validate_target(&data, None)?.into_result()?;

        let id = self.store.create_target(&Target {
            id: 0,
            name: data.name.clone(),
            alias: data.alias.clone(),
            mode: data.mode,
            groups: Vec::new(),
        })?;

        if let Err(e) = self.save_groups(id, &data.groups, &[]) {
            self.store.delete_target(id)?;
            return Err(e);
        }

        self.reload_service()?;
        self.store.get_target(id)?.ok_or(Error::NotFound)
    }

    /// Update target `id`, replacing its settings and group set.
    pub fn target_update(&self, id: i64, data: TargetParams) -> Result<Target> {
        let old = self.store.get_target(id)?.ok_or(Error::NotFound)?;
        self.validate_target(&data, Some(&old))?.into_result()?;

        self.store.update_target(&Target {
            id,
            name: data.name,
            alias: data.alias,
            mode: data.mode,
            groups: Vec::new(),
        })?;
        self.save_groups(id, &data.groups, &old.groups)?;

        self.reload_service()?;
        self.store.get_target(id)?.ok_or(Error::NotFound)
    }

    /// Delete target `id` and every association that uses it. Blocked while
    /// the target has an active session unless `force` is set, in which case
    /// the deletion proceeds with a warning.
    pub fn target_delete(&self, id: i64, force: bool) -> Result<()> {
        let target = self.store.get_target(id)?.ok_or(Error::NotFound)?;

        if !self.active_sessions_for_targets(&[id])?.is_empty() {
            if force {
                tracing::warn!("Target {} is in use.", target.name);
            } else {
                return Err(Error::Conflict(format!("Target {} is in use.", target.name)));
            }
        }

        for assoc in self.store.assocs_for_target(id)? {
            self.assoc_delete(assoc.id, force)?;
        }

        self.store.delete_groups_for_target(id)?;
        self.store.delete_target(id)?;

        if self.service.is_running(&self.settings.service.unit)? {
            // scst does not drop a target on reload; it has to be removed
            // from the running service explicitly
            let qualified = self.qualified_name(&target.name);
            if let Err(e) = self.service.remove_target(&qualified) {
                tracing::warn!("Failed to remove {:?} target: {}", target.name, e);
            }
        }

        self.reload_service()
    }

    pub fn target_get(&self, id: i64) -> Result<Target> {
        self.store.get_target(id)?.ok_or(Error::NotFound)
    }

    pub fn target_list(&self) -> Result<Vec<Target>> {
        self.store.list_targets()
    }

    /// Externally visible names of the given targets that currently have at
    /// least one open session.
    pub fn active_sessions_for_targets(&self, ids: &[i64]) -> Result<Vec<String>> {
        let targets = self.store.targets_by_ids(ids)?;
        let names: Vec<String> = targets
            .iter()
            .map(|t| self.qualified_name(&t.name))
            .collect();
        self.sessions.active_sessions(&names)
    }

    /// Sync the stored group set with the requested one: stale groups are
    /// removed first, new groups inserted after.
    fn save_groups(&self, target_id: i64, new: &[TargetGroup], old: &[TargetGroup]) -> Result<()> {
        let diff = reconcile::diff(old, new);
        for group in &diff.to_delete {
            self.store.delete_group(target_id, group)?;
        }
        for group in &diff.to_insert {
            self.store.insert_group(target_id, group)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_target_name() {
        assert!(valid_target_name("disk0"));
        assert!(valid_target_name("iqn.2025-01.dev.lunman:disk0"));
        assert!(!valid_target_name(""));
        assert!(!valid_target_name("Disk0"));
        assert!(!valid_target_name("disk 0"));
        assert!(!valid_target_name("disk_0"));
    }
}
