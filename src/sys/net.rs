use std::collections::BTreeMap;
use std::process::Command;

use serde::Deserialize;

use crate::error::Result;

/// Addresses a portal may listen on.
pub trait AddrProvider: Send + Sync {
    /// Candidate addresses keyed by the value stored on the portal, with a
    /// human-readable label. With `alua` set, implementations must report
    /// the node-local addresses rather than any shared virtual address,
    /// since that is what the service binds on each node.
    fn ip_choices(&self, alua: bool) -> Result<BTreeMap<String, String>>;
}

#[derive(Deserialize)]
struct IfaceDump {
    #[serde(default)]
    addr_info: Vec<AddrInfo>,
}

#[derive(Deserialize)]
struct AddrInfo {
    local: Option<String>,
}

/// Production implementation parsing `ip -j addr` output. Degrades to an
/// empty set with a warning when the tool is unavailable; the engine always
/// offers the wildcard addresses on top of these.
pub struct IpCommand;

impl AddrProvider for IpCommand {
    fn ip_choices(&self, _alua: bool) -> Result<BTreeMap<String, String>> {
        // `ip` only ever reports node-local addresses, which is the right
        // answer for both the plain and the ALUA case on a single node.
        let output = match Command::new("ip").args(["-j", "addr", "show"]).output() {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                tracing::warn!("ip -j addr exited with {}", output.status);
                return Ok(BTreeMap::new());
            }
            Err(e) => {
                tracing::warn!("failed to run ip -j addr: {}", e);
                return Ok(BTreeMap::new());
            }
        };

        let interfaces: Vec<IfaceDump> = match serde_json::from_slice(&output.stdout) {
            Ok(interfaces) => interfaces,
            Err(e) => {
                tracing::warn!("failed to parse ip -j addr output: {}", e);
                return Ok(BTreeMap::new());
            }
        };

        let mut choices = BTreeMap::new();
        for iface in interfaces {
            for addr in iface.addr_info {
                if let Some(local) = addr.local {
                    choices.insert(local.clone(), local);
                }
            }
        }
        Ok(choices)
    }
}
