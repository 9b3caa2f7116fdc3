use crate::error::{Error, Result};
use crate::types::{AuthCredential, AuthParams};

use super::{Engine, ValidationErrors};

const SECRET_MIN: usize = 12;
const SECRET_MAX: usize = 16;

fn validate_auth(data: &AuthParams) -> ValidationErrors {
    let mut verrors = ValidationErrors::new();

    if data.peeruser.is_empty() && !data.peersecret.is_empty() {
        verrors.add(
            "peersecret",
            "The peer user is required if you set a peer secret.",
        );
    }

    let secret_len = data.secret.chars().count();
    if !(SECRET_MIN..=SECRET_MAX).contains(&secret_len) {
        verrors.add("secret", "Secret must be between 12 and 16 characters.");
    }

    if data.peeruser.is_empty() {
        return verrors;
    }

    if data.peersecret.is_empty() {
        verrors.add(
            "peersecret",
            "The peer secret is required if you set a peer user.",
        );
    } else if data.peersecret == data.secret {
        verrors.add(
            "peersecret",
            "The peer secret cannot be the same as user secret.",
        );
    } else {
        let peer_len = data.peersecret.chars().count();
        if !(SECRET_MIN..=SECRET_MAX).contains(&peer_len) {
            verrors.add(
                "peersecret",
                "Peer Secret must be between 12 and 16 characters.",
            );
        }
    }

    verrors
}

impl Engine {
    /// Create an authorized access entry.
    ///
    /// `tag` groups credentials; portals and target groups reference the tag
    /// rather than the row, so several credentials may share one.
    pub fn auth_create(&self, data: AuthParams) -> Result<AuthCredential> {
        validate_auth(&data).into_result()?;

        let id = self.store.create_auth(&AuthCredential {
            id: 0,
            tag: data.tag,
            user: data.user,
            secret: data.secret,
            peeruser: data.peeruser,
            peersecret: data.peersecret,
        })?;

        self.reload_service()?;
        self.store.get_auth(id)?.ok_or(Error::NotFound)
    }

    /// Update authorized access `id`. Moving the entry to a different tag is
    /// refused while the old tag is still referenced and no other credential
    /// carries it.
    pub fn auth_update(&self, id: i64, data: AuthParams) -> Result<AuthCredential> {
        let old = self.store.get_auth(id)?.ok_or(Error::NotFound)?;

        let mut verrors = validate_auth(&data);
        if data.tag != old.tag && !self.store.other_auth_with_tag(old.tag, id)? {
            if let Some(usages) = self.auth_usages(id, old.tag)? {
                verrors.add("tag", usages);
            }
        }
        verrors.into_result()?;

        self.store.update_auth(&AuthCredential {
            id,
            tag: data.tag,
            user: data.user,
            secret: data.secret,
            peeruser: data.peeruser,
            peersecret: data.peersecret,
        })?;

        self.reload_service()?;
        self.store.get_auth(id)?.ok_or(Error::NotFound)
    }

    /// Delete authorized access `id`, refused while its tag is referenced
    /// and no other credential carries the same tag.
    pub fn auth_delete(&self, id: i64) -> Result<()> {
        let config = self.store.get_auth(id)?.ok_or(Error::NotFound)?;

        if !self.store.other_auth_with_tag(config.tag, id)? {
            if let Some(usages) = self.auth_usages(id, config.tag)? {
                return Err(Error::Conflict(usages));
            }
        }

        self.store.delete_auth(id)?;
        self.reload_service()
    }

    pub fn auth_get(&self, id: i64) -> Result<AuthCredential> {
        self.store.get_auth(id)?.ok_or(Error::NotFound)
    }

    pub fn auth_list(&self) -> Result<Vec<AuthCredential>> {
        self.store.list_auth()
    }

    /// Human-readable description of everything still referencing `tag`,
    /// or None when unused.
    fn auth_usages(&self, id: i64, tag: i64) -> Result<Option<String>> {
        let mut usages = Vec::new();

        let portals = self.store.portals_with_authgroup(tag)?;
        if !portals.is_empty() {
            usages.push(format!(
                "Authorized access of {} is being used by portal(s): {}",
                id,
                join_ids(&portals)
            ));
        }

        let targets = self.store.targets_with_authgroup(tag)?;
        if !targets.is_empty() {
            usages.push(format!(
                "Authorized access of {} is being used by following target(s): {}",
                id,
                join_ids(&targets)
            ));
        }

        Ok(if usages.is_empty() {
            None
        } else {
            Some(usages.join("\n"))
        })
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
