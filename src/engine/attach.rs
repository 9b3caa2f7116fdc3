use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;
use crate::sys::volumes::{device_relative, zvol_name_to_path};
use crate::types::ExtentType;

use super::Engine;

impl Engine {
    /// Tear down every DISK extent backed by a zvol under `dataset`, e.g.
    /// when the dataset is exported or locked.
    ///
    /// Associations are removed with their extents, and targets left with no
    /// association at all by this sweep are force-deleted afterwards. Single
    /// extent deletion deliberately does not do that last step; only this
    /// mass-removal path cleans up orphaned targets.
    pub fn detach_dataset(&self, dataset: &str) -> Result<()> {
        let parent = device_relative(&zvol_name_to_path(dataset));

        let mut orphan_ids = BTreeSet::new();
        for extent in self.store.list_extents()? {
            if extent.kind != ExtentType::Disk || !Path::new(&extent.path).starts_with(&parent) {
                continue;
            }
            for assoc in self.store.assocs_for_extent(extent.id)? {
                orphan_ids.insert(assoc.target);
                self.store.delete_assoc(assoc.id)?;
            }
            self.store.delete_extent(extent.id)?;
            tracing::info!("Removed extent {} for detached dataset {}", extent.name, dataset);
        }

        for assoc in self.store.list_assocs()? {
            orphan_ids.remove(&assoc.target);
        }
        for target_id in orphan_ids {
            self.target_delete(target_id, true)?;
        }

        self.reload_service()
    }
}
