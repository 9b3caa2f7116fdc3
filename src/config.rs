use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Process-wide settings, loaded once from a TOML file (or defaulted) and
/// read-only afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub service: ServiceSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

/// Storage-service facing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    /// Service unit told to reload after each mutation.
    #[serde(default = "default_unit")]
    pub unit: String,

    /// Global name prefix; target names are exported as `<basename>:<name>`
    /// unless already fully qualified.
    #[serde(default = "default_basename")]
    pub basename: String,

    /// Active-active availability mode. Changes which addresses portals may
    /// listen on.
    #[serde(default)]
    pub alua: bool,

    /// Gates the FC and BOTH target modes.
    #[serde(default)]
    pub fibre_channel: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            unit: default_unit(),
            basename: default_basename(),
            alua: false,
            fibre_channel: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory holding the configuration database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Roots that FILE extent paths must reside under.
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            roots: default_roots(),
        }
    }
}

fn default_unit() -> String {
    "scst".to_string()
}

fn default_basename() -> String {
    "iqn.2025-01.dev.lunman.ctl".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/mnt")]
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.storage.data_dir.join("lunman.db")
    }

    /// Whether `path` sits under one of the configured storage roots.
    pub fn path_within_roots(&self, path: &Path) -> bool {
        self.storage
            .roots
            .iter()
            .any(|root| path.starts_with(root) && path != root.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.service.unit, "scst");
        assert!(!settings.service.alua);
        assert_eq!(settings.storage.roots, vec![PathBuf::from("/mnt")]);
    }

    #[test]
    fn test_path_within_roots() {
        let settings = Settings::default();
        assert!(settings.path_within_roots(Path::new("/mnt/tank/extent0")));
        assert!(!settings.path_within_roots(Path::new("/mnt")));
        assert!(!settings.path_within_roots(Path::new("/etc/passwd")));
    }

    #[test]
    fn test_parse_toml() {
        let settings: Settings = toml::from_str(
            r#"
            [service]
            unit = "scst.service"
            alua = true

            [storage]
            roots = ["/mnt", "/tank"]
            "#,
        )
        .unwrap();
        assert_eq!(settings.service.unit, "scst.service");
        assert!(settings.service.alua);
        assert_eq!(settings.service.basename, default_basename());
        assert_eq!(settings.storage.roots.len(), 2);
    }
}
