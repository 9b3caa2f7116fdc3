use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::sys::volumes::{device_relative, zvol_name_to_path, zvol_path_to_name};
use crate::types::{Extent, ExtentParams, ExtentType};

use super::{Engine, ValidationErrors, ids};

const ALLOWED_BLOCKSIZES: [u32; 4] = [512, 1024, 2048, 4096];
const MAX_SERIAL_LEN: usize = 20; // SCST limit

const VENDOR: &str = "LUNMAN";

impl Engine {
    /// Create an extent.
    ///
    /// FILE extents are materialized on disk: missing parent directories are
    /// created and, when `filesize` is non-zero, the backing file is created
    /// at that size. A zero `filesize` means auto and the file must already
    /// exist. DISK extents must reference an existing, currently present
    /// zvol.
    pub fn extent_create(&self, data: ExtentParams) -> Result<Extent> {
        let serial = match &data.serial {
            Some(serial) => serial.clone(),
            None => {
                let used: HashSet<String> = self.store.extent_serials()?.into_iter().collect();
                ids::generate_serial(&mut rand::thread_rng(), &used)?
            }
        };
        let naa = ids::generate_naa();

        let mut verrors = ValidationErrors::new();
        self.clean_extent(&data, &serial, None, &mut verrors)?;
        verrors.into_result()?;

        let path = self.place_extent(&data)?;

        let id = self.store.create_extent(&Extent {
            id: 0,
            name: data.name.clone(),
            serial,
            naa,
            kind: data.kind,
            path,
            filesize: data.filesize,
            blocksize: data.blocksize,
            pblocksize: data.pblocksize,
            avail_threshold: data.avail_threshold,
            comment: data.comment.clone(),
            insecure_tpc: data.insecure_tpc,
            xen: data.xen,
            rpm: data.rpm,
            ro: data.ro,
            enabled: data.enabled,
            vendor: VENDOR.to_string(),
        })?;

        self.reload_service()?;
        self.store.get_extent(id)?.ok_or(Error::NotFound)
    }

    /// Update extent `id`. The NAA identifier is never regenerated; the
    /// serial is kept unless the caller supplies a new one.
    pub fn extent_update(&self, id: i64, data: ExtentParams) -> Result<Extent> {
        let old = self.store.get_extent(id)?.ok_or(Error::NotFound)?;
        let serial = data.serial.clone().unwrap_or_else(|| old.serial.clone());

        let mut verrors = ValidationErrors::new();
        self.clean_extent(&data, &serial, Some(&old), &mut verrors)?;
        verrors.into_result()?;

        let path = self.place_extent(&data)?;

        self.store.update_extent(&Extent {
            id,
            name: data.name.clone(),
            serial,
            naa: old.naa,
            kind: data.kind,
            path,
            filesize: data.filesize,
            blocksize: data.blocksize,
            pblocksize: data.pblocksize,
            avail_threshold: data.avail_threshold,
            comment: data.comment.clone(),
            insecure_tpc: data.insecure_tpc,
            xen: data.xen,
            rpm: data.rpm,
            ro: data.ro,
            enabled: data.enabled,
            vendor: old.vendor,
        })?;

        self.reload_service()?;
        self.store.get_extent(id)?.ok_or(Error::NotFound)
    }

    /// Delete extent `id` and every association that uses it.
    ///
    /// Blocked while a target backed by this extent has an active session,
    /// unless `force` is set. With `remove`, the backing file of a FILE
    /// extent is unlinked as well. The service is told to reload even when
    /// the row delete fails.
    pub fn extent_delete(&self, id: i64, remove: bool, force: bool) -> Result<()> {
        let data = self.store.get_extent(id)?.ok_or(Error::NotFound)?;

        let assocs = self.store.assocs_for_extent(id)?;
        let target_ids: Vec<i64> = assocs.iter().map(|a| a.target).collect();
        let active = self.active_sessions_for_targets(&target_ids)?;
        if !active.is_empty() {
            let verb = if active.len() == 1 { "is" } else { "are" };
            let msg = format!("Associated target(s) {} {} in use.", active.join(","), verb);
            if force {
                tracing::warn!("{} Forcing deletion of extent.", msg);
            } else {
                return Err(Error::Conflict(msg));
            }
        }

        if remove && data.kind == ExtentType::File {
            fs::remove_file(&data.path)
                .map_err(|_| Error::External("Failed to remove extent file".to_string()))?;
        }

        for assoc in assocs {
            self.assoc_delete(assoc.id, force)?;
        }

        let result = self.store.delete_extent(id);
        self.reload_service()?;
        result.map(|_| ())
    }

    pub fn extent_get(&self, id: i64) -> Result<Extent> {
        self.store.get_extent(id)?.ok_or(Error::NotFound)
    }

    pub fn extent_list(&self) -> Result<Vec<Extent>> {
        self.store.list_extents()
    }

    /// Available zvols for DISK extent creation, keyed by their
    /// device-relative path. Locked volumes are skipped; volumes already
    /// used by an extent are skipped unless listed in `ignore`. Snapshots of
    /// listed volumes are offered read-only.
    pub fn disk_choices(&self, ignore: &[String]) -> Result<BTreeMap<String, String>> {
        let used: HashSet<String> = self
            .store
            .list_extents()?
            .into_iter()
            .filter(|e| e.kind == ExtentType::Disk)
            .map(|e| e.path)
            .filter(|path| !ignore.contains(path))
            .collect();

        let mut choices = BTreeMap::new();
        let mut volume_names = HashSet::new();
        for volume in self.volumes.list_volumes()? {
            if volume.locked {
                continue;
            }
            let key = device_relative(&zvol_name_to_path(&volume.name));
            volume_names.insert(volume.name.clone());
            if !used.contains(&key) {
                choices.insert(key, format!("{} ({})", volume.name, volume.size));
            }
        }

        for snapshot in self.volumes.list_snapshots()? {
            if let Some((dataset, _)) = snapshot.rsplit_once('@') {
                if volume_names.contains(dataset) {
                    choices.insert(
                        device_relative(&zvol_name_to_path(&snapshot)),
                        format!("{snapshot} [ro]"),
                    );
                }
            }
        }

        Ok(choices)
    }

    fn clean_extent(
        &self,
        data: &ExtentParams,
        serial: &str,
        old: Option<&Extent>,
        verrors: &mut ValidationErrors,
    ) -> Result<()> {
        self.clean_extent_name(data, serial, old, verrors)?;
        if self.clean_extent_type_and_path(data, verrors)? {
            self.clean_extent_size(data, verrors);
        }
        Ok(())
    }

    fn clean_extent_name(
        &self,
        data: &ExtentParams,
        serial: &str,
        old: Option<&Extent>,
        verrors: &mut ValidationErrors,
    ) -> Result<()> {
        if data.name.contains('"') {
            verrors.add("name", "Double quotes are not allowed");
        }
        if serial.contains('"') {
            verrors.add("serial", "Double quotes are not allowed");
        }
        if serial.chars().count() > MAX_SERIAL_LEN {
            verrors.add(
                "serial",
                format!("Extent serial can not exceed {MAX_SERIAL_LEN} characters"),
            );
        }

        if !ALLOWED_BLOCKSIZES.contains(&data.blocksize) {
            verrors.add("blocksize", "Block size must be one of 512, 1024, 2048, 4096");
        }
        if let Some(threshold) = data.avail_threshold {
            if !(1..=99).contains(&threshold) {
                verrors.add("avail_threshold", "Threshold must be between 1 and 99 percent");
            }
        }
        if data.filesize < 0 {
            verrors.add("filesize", "File size cannot be negative");
        }

        let name_changed = old.map_or(true, |o| o.name != data.name);
        if name_changed
            && self
                .store
                .extent_name_taken(&data.name, old.map(|o| o.id))?
        {
            verrors.add("name", "Extent name must be unique");
        }

        Ok(())
    }

    /// Returns false when a required reference is missing, in which case the
    /// remaining checks are skipped; the error is already recorded.
    fn clean_extent_type_and_path(
        &self,
        data: &ExtentParams,
        verrors: &mut ValidationErrors,
    ) -> Result<bool> {
        match data.kind {
            ExtentType::Disk => {
                let Some(disk) = data.disk.as_deref().filter(|d| !d.is_empty()) else {
                    verrors.add("disk", "This field is required");
                    return Ok(false);
                };
                if !disk.starts_with("zvol/") {
                    verrors.add("disk", "Disk name must start with \"zvol/\"");
                    return Ok(false);
                }

                let device = Path::new("/dev").join(disk);
                let zvol_name = zvol_path_to_name(&device).unwrap_or_default();
                if !self.volumes.dataset_exists(&zvol_name)? {
                    verrors.add("disk", format!("Volume {zvol_name:?} does not exist"));
                }
                if !self.volumes.device_present(&device)? {
                    verrors.add(
                        "disk",
                        format!("Device {device:?} for volume {zvol_name:?} does not exist"),
                    );
                }
            }
            ExtentType::File => {
                let Some(path) = data.path.as_deref().filter(|p| !p.is_empty()) else {
                    verrors.add("path", "This field is required");
                    return Ok(false);
                };

                let fs_path = Path::new(path);
                if fs_path.exists() && (!fs_path.is_file() || path.ends_with('/')) {
                    verrors.add("path", "You need to specify a filepath not a directory");
                }
                if !self.settings.path_within_roots(fs_path) {
                    verrors.add("path", "The path must reside within a volume mount point");
                }
            }
        }
        Ok(true)
    }

    // only applies to files
    fn clean_extent_size(&self, data: &ExtentParams, verrors: &mut ValidationErrors) {
        if data.kind != ExtentType::File {
            return;
        }
        let Some(path) = data.path.as_deref().filter(|p| !p.is_empty()) else {
            verrors.add("path", "This field is required");
            return;
        };

        if data.filesize == 0 {
            if !Path::new(path).is_file() {
                verrors.add(
                    "path",
                    "The file must exist if the extent size is set to auto (0)",
                );
            }
        } else if ALLOWED_BLOCKSIZES.contains(&data.blocksize)
            && data.filesize > 0
            && data.filesize % i64::from(data.blocksize) != 0
        {
            verrors.add(
                "filesize",
                format!(
                    "File size ({}) must be a multiple of block size ({})",
                    data.filesize, data.blocksize
                ),
            );
        }
    }

    /// Materialize the backing store and return the path persisted on the
    /// row: the backing file path for FILE extents, the zvol reference for
    /// DISK extents.
    fn place_extent(&self, data: &ExtentParams) -> Result<String> {
        match data.kind {
            ExtentType::File => {
                let path = data.path.clone().unwrap_or_default();
                if let Some(parent) = Path::new(&path).parent() {
                    fs::create_dir_all(parent).map_err(|e| {
                        Error::External(format!(
                            "Failed to create {} with error: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
                let fs_path = Path::new(&path);
                if !fs_path.exists() {
                    let file = fs::File::create(fs_path)?;
                    file.set_len(data.filesize as u64)?;
                }
                Ok(path)
            }
            ExtentType::Disk => Ok(data.disk.clone().unwrap_or_default()),
        }
    }
}
