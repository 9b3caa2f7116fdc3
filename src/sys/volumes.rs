use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct VolumeInfo {
    /// Dataset name, e.g. `tank/vol0`.
    pub name: String,
    /// Volume size in bytes.
    pub size: u64,
    /// Locked volumes cannot back an extent.
    pub locked: bool,
}

/// Block volume discovery and dataset state.
pub trait VolumeProvider: Send + Sync {
    fn list_volumes(&self) -> Result<Vec<VolumeInfo>>;

    /// Snapshot names (`dataset@snap`).
    fn list_snapshots(&self) -> Result<Vec<String>>;

    fn dataset_exists(&self, name: &str) -> Result<bool>;

    /// Whether the device node for a zvol is currently present.
    fn device_present(&self, device: &Path) -> Result<bool>;
}

/// Device path a zvol dataset is exposed at.
pub fn zvol_name_to_path(name: &str) -> PathBuf {
    Path::new("/dev/zvol").join(name)
}

/// Dataset name for a `/dev/zvol/...` device path.
pub fn zvol_path_to_name(path: &Path) -> Option<String> {
    path.strip_prefix("/dev/zvol")
        .ok()
        .map(|p| p.to_string_lossy().into_owned())
}

/// Path relative to `/dev`, the form extents store for DISK backing.
pub fn device_relative(path: &Path) -> String {
    path.strip_prefix("/dev")
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Production implementation shelling out to the zfs CLI.
pub struct ZfsCli;

impl ZfsCli {
    fn run(args: &[&str]) -> Result<String> {
        let output = Command::new("zfs").args(args).output()?;
        if !output.status.success() {
            return Err(Error::External(format!(
                "zfs {} exited with {}: {}",
                args.first().unwrap_or(&""),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VolumeProvider for ZfsCli {
    fn list_volumes(&self) -> Result<Vec<VolumeInfo>> {
        let out = Self::run(&["list", "-H", "-p", "-o", "name,volsize,keystatus", "-t", "volume"])?;
        let mut volumes = Vec::new();
        for line in out.lines() {
            let mut fields = line.split('\t');
            let (Some(name), Some(size), keystatus) =
                (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            volumes.push(VolumeInfo {
                name: name.to_string(),
                size: size.parse().unwrap_or(0),
                locked: keystatus == Some("unavailable"),
            });
        }
        Ok(volumes)
    }

    fn list_snapshots(&self) -> Result<Vec<String>> {
        let out = Self::run(&["list", "-H", "-o", "name", "-t", "snapshot"])?;
        Ok(out.lines().map(str::to_string).collect())
    }

    fn dataset_exists(&self, name: &str) -> Result<bool> {
        if name.is_empty() {
            return Ok(false);
        }
        let status = Command::new("zfs")
            .args(["list", "-H", "-o", "name", name])
            .output()?;
        Ok(status.status.success())
    }

    fn device_present(&self, device: &Path) -> Result<bool> {
        Ok(device.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zvol_name_to_path() {
        assert_eq!(
            zvol_name_to_path("tank/vol0"),
            PathBuf::from("/dev/zvol/tank/vol0")
        );
    }

    #[test]
    fn test_zvol_path_to_name() {
        assert_eq!(
            zvol_path_to_name(Path::new("/dev/zvol/tank/vol0")),
            Some("tank/vol0".to_string())
        );
        assert_eq!(zvol_path_to_name(Path::new("/dev/sda")), None);
    }

    #[test]
    fn test_device_relative() {
        assert_eq!(
            device_relative(Path::new("/dev/zvol/tank/vol0")),
            "zvol/tank/vol0"
        );
    }
}
