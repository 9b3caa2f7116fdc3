use std::path::PathBuf;

use crate::error::Result;

/// Live session state of the storage service.
pub trait SessionSource: Send + Sync {
    /// The subset of `targets` (externally visible names) that currently
    /// have at least one open session.
    fn active_sessions(&self, targets: &[String]) -> Result<Vec<String>>;
}

/// Reads session state from the SCST sysfs tree. A missing tree simply
/// means the service is not running, i.e. no sessions.
pub struct SysfsSessions {
    root: PathBuf,
}

impl SysfsSessions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for SysfsSessions {
    fn default() -> Self {
        Self::new("/sys/kernel/scst_tgt/targets/iscsi")
    }
}

impl SessionSource for SysfsSessions {
    fn active_sessions(&self, targets: &[String]) -> Result<Vec<String>> {
        let mut active = Vec::new();
        for target in targets {
            let sessions_dir = self.root.join(target).join("sessions");
            let Ok(entries) = std::fs::read_dir(&sessions_dir) else {
                continue;
            };
            if entries.filter_map(|e| e.ok()).next().is_some() {
                active.push(target.clone());
            }
        }
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_tree_means_no_sessions() {
        let source = SysfsSessions::new("/nonexistent/scst");
        let active = source
            .active_sessions(&["iqn.2025-01.dev.lunman.ctl:disk0".to_string()])
            .unwrap();
        assert!(active.is_empty());
    }

    #[test]
    fn test_session_dir_with_entries() {
        let temp = TempDir::new().unwrap();
        let name = "iqn.2025-01.dev.lunman.ctl:disk0";
        std::fs::create_dir_all(temp.path().join(name).join("sessions").join("initiator-a"))
            .unwrap();
        std::fs::create_dir_all(temp.path().join("other").join("sessions")).unwrap();

        let source = SysfsSessions::new(temp.path());
        let active = source
            .active_sessions(&[name.to_string(), "other".to_string()])
            .unwrap();
        assert_eq!(active, vec![name.to_string()]);
    }
}
