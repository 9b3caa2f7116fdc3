use std::process::Command;

use crate::error::{Error, Result};

/// Control channel to the storage service.
pub trait ServiceControl: Send + Sync {
    /// Signal the service to re-read its configuration. Invoked after every
    /// successful mutation.
    fn reload(&self, unit: &str) -> Result<()>;

    fn is_running(&self, unit: &str) -> Result<bool>;

    /// Remove a target from the running service. scst does not drop targets
    /// on reload, so forced target deletion calls this explicitly.
    fn remove_target(&self, qualified_name: &str) -> Result<()>;
}

/// Production implementation driving systemd and scstadmin.
pub struct ScstControl;

impl ServiceControl for ScstControl {
    fn reload(&self, unit: &str) -> Result<()> {
        let status = Command::new("systemctl").args(["reload", unit]).status()?;
        if !status.success() {
            return Err(Error::External(format!(
                "systemctl reload {unit} exited with {status}"
            )));
        }
        Ok(())
    }

    fn is_running(&self, unit: &str) -> Result<bool> {
        let status = Command::new("systemctl")
            .args(["is-active", "--quiet", unit])
            .status()?;
        Ok(status.success())
    }

    fn remove_target(&self, qualified_name: &str) -> Result<()> {
        let output = Command::new("scstadmin")
            .args([
                "-force",
                "-noprompt",
                "-rem_target",
                qualified_name,
                "-driver",
                "iscsi",
            ])
            .output()?;
        if !output.status.success() {
            return Err(Error::External(format!(
                "scstadmin exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Edits the configuration database without touching any service. Used by
/// the CLI's offline mode, e.g. when preparing a node before first start.
pub struct NoopServiceControl;

impl ServiceControl for NoopServiceControl {
    fn reload(&self, _unit: &str) -> Result<()> {
        Ok(())
    }

    fn is_running(&self, _unit: &str) -> Result<bool> {
        Ok(false)
    }

    fn remove_target(&self, _qualified_name: &str) -> Result<()> {
        Ok(())
    }
}
