use crate::error::{Error, Result};
use crate::types::{TargetExtent, TargetExtentParams};

use super::{Engine, ValidationErrors, ids};

// Matches the SCST LUN map size; valid LUNs are 0..=16382.
const LUN_MAP_SIZE: i64 = 16383;

impl Engine {
    /// Validates an association and resolves its LUN, allocating the
    /// smallest free LUN on the target when the caller left it out.
    fn validate_assoc(
        &self,
        data: &TargetExtentParams,
        old: Option<&TargetExtent>,
    ) -> Result<(i64, ValidationErrors)> {
        let mut verrors = ValidationErrors::new();

        let lunid = match data.lunid {
            Some(lunid) => lunid,
            None => {
                let used: Vec<i64> = self
                    .store
                    .assocs_for_target(data.target)?
                    .iter()
                    .map(|a| a.lunid)
                    .collect();
                ids::next_lun(&used)
            }
        };

        if lunid < 0 || lunid >= LUN_MAP_SIZE {
            verrors.add(
                "lunid",
                format!("LUN ID must be a positive integer and lower than {LUN_MAP_SIZE}"),
            );
        }

        if old.map(|o| o.lunid) != Some(lunid) && self.store.lun_in_use(data.target, lunid)? {
            verrors.add("lunid", "LUN ID is already being used for this target.");
        }

        if old.map(|o| o.target) != Some(data.target)
            && self.store.pair_exists(data.target, data.extent)?
        {
            verrors.add("target", "Extent is already in this target.");
        }

        Ok((lunid, verrors))
    }

    /// Create an association, binding an extent into a target at a LUN.
    pub fn assoc_create(&self, data: TargetExtentParams) -> Result<TargetExtent> {
        let (lunid, verrors) = self.validate_assoc(&data, None)?;
        verrors.into_result()?;

        let id = self.store.create_assoc(&TargetExtent {
            id: 0,
            target: data.target,
            extent: data.extent,
            lunid,
        })?;

        self.reload_service()?;
        self.store.get_assoc(id)?.ok_or(Error::NotFound)
    }

    pub fn assoc_update(&self, id: i64, data: TargetExtentParams) -> Result<TargetExtent> {
        let old = self.store.get_assoc(id)?.ok_or(Error::NotFound)?;

        let (lunid, verrors) = self.validate_assoc(&data, Some(&old))?;
        verrors.into_result()?;

        self.store.update_assoc(&TargetExtent {
            id,
            target: data.target,
            extent: data.extent,
            lunid,
        })?;

        self.reload_service()?;
        self.store.get_assoc(id)?.ok_or(Error::NotFound)
    }

    /// Delete association `id`. Guarded by the owning target's sessions the
    /// same way target deletion is.
    pub fn assoc_delete(&self, id: i64, force: bool) -> Result<()> {
        let assoc = self.store.get_assoc(id)?.ok_or(Error::NotFound)?;

        let active = self.active_sessions_for_targets(&[assoc.target])?;
        if let Some(name) = active.first() {
            if force {
                tracing::warn!("Associated target {} is in use.", name);
            } else {
                return Err(Error::Conflict(format!(
                    "Associated target {name} is in use."
                )));
            }
        }

        self.store.delete_assoc(id)?;
        self.reload_service()
    }

    pub fn assoc_get(&self, id: i64) -> Result<TargetExtent> {
        self.store.get_assoc(id)?.ok_or(Error::NotFound)
    }

    pub fn assoc_list(&self) -> Result<Vec<TargetExtent>> {
        self.store.list_assocs()
    }
}
