use serde::{Deserialize, Serialize};

use super::{AuthMethod, ExtentRpm, ExtentType, TargetMode};

fn default_port() -> u16 {
    3260
}

fn default_blocksize() -> u32 {
    512
}

fn default_true() -> bool {
    true
}

/// One ip:port pair a portal listens on.
///
/// Compared by value during child reconciliation; the owning portal id is
/// deliberately not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenAddr {
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portal {
    pub id: i64,
    /// Dense 1..N sequence, renumbered after deletions.
    pub tag: i64,
    pub comment: String,
    pub discovery_authmethod: AuthMethod,
    pub discovery_authgroup: Option<i64>,
    pub listen: Vec<ListenAddr>,
}

/// Caller-supplied portal fields for create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalParams {
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub discovery_authmethod: AuthMethod,
    #[serde(default)]
    pub discovery_authgroup: Option<i64>,
    pub listen: Vec<ListenAddr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCredential {
    pub id: i64,
    /// Group tag referenced by portals and target groups. Not unique on its
    /// own; several credentials may share a tag.
    pub tag: i64,
    pub user: String,
    pub secret: String,
    pub peeruser: String,
    pub peersecret: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthParams {
    pub tag: i64,
    pub user: String,
    pub secret: String,
    #[serde(default)]
    pub peeruser: String,
    #[serde(default)]
    pub peersecret: String,
}

/// Initiator access list. Empty `initiators` / `auth_network` means all
/// initiators / all networks are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Initiator {
    pub id: i64,
    pub initiators: Vec<String>,
    pub auth_network: Vec<String>,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitiatorParams {
    #[serde(default)]
    pub initiators: Vec<String>,
    #[serde(default)]
    pub auth_network: Vec<String>,
    #[serde(default)]
    pub comment: String,
}

/// Binding of a portal (and optional initiator list / auth policy) to a
/// target. Value identity, like [`ListenAddr`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetGroup {
    pub portal: i64,
    #[serde(default)]
    pub initiator: Option<i64>,
    #[serde(default)]
    pub authmethod: AuthMethod,
    /// Auth credential tag, required for CHAP and CHAP_MUTUAL.
    #[serde(default)]
    pub auth: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: i64,
    pub name: String,
    pub alias: Option<String>,
    pub mode: TargetMode,
    pub groups: Vec<TargetGroup>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetParams {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub mode: TargetMode,
    #[serde(default)]
    pub groups: Vec<TargetGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extent {
    pub id: i64,
    pub name: String,
    pub serial: String,
    pub naa: String,
    #[serde(rename = "type")]
    pub kind: ExtentType,
    /// DISK: device-relative `zvol/...` reference. FILE: absolute file path.
    pub path: String,
    pub filesize: i64,
    pub blocksize: u32,
    pub pblocksize: bool,
    pub avail_threshold: Option<u8>,
    pub comment: String,
    pub insecure_tpc: bool,
    pub xen: bool,
    pub rpm: ExtentRpm,
    pub ro: bool,
    pub enabled: bool,
    pub vendor: String,
}

impl Extent {
    /// The zvol reference for DISK extents, mirroring how callers address
    /// block-backed extents at create time.
    pub fn disk(&self) -> Option<&str> {
        match self.kind {
            ExtentType::Disk => Some(&self.path),
            ExtentType::File => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtentParams {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: ExtentType,
    /// `zvol/...` reference, required when `kind` is DISK.
    #[serde(default)]
    pub disk: Option<String>,
    /// Auto-generated when absent.
    #[serde(default)]
    pub serial: Option<String>,
    /// Backing file path, required when `kind` is FILE.
    #[serde(default)]
    pub path: Option<String>,
    /// 0 means auto (the backing file must already exist).
    #[serde(default)]
    pub filesize: i64,
    #[serde(default = "default_blocksize")]
    pub blocksize: u32,
    #[serde(default)]
    pub pblocksize: bool,
    #[serde(default)]
    pub avail_threshold: Option<u8>,
    #[serde(default)]
    pub comment: String,
    #[serde(default = "default_true")]
    pub insecure_tpc: bool,
    #[serde(default)]
    pub xen: bool,
    #[serde(default)]
    pub rpm: ExtentRpm,
    #[serde(default)]
    pub ro: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ExtentParams {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: ExtentType::default(),
            disk: None,
            serial: None,
            path: None,
            filesize: 0,
            blocksize: default_blocksize(),
            pblocksize: false,
            avail_threshold: None,
            comment: String::new(),
            insecure_tpc: true,
            xen: false,
            rpm: ExtentRpm::default(),
            ro: false,
            enabled: true,
        }
    }
}

/// Association of an extent to a target at a LUN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetExtent {
    pub id: i64,
    pub target: i64,
    pub extent: i64,
    pub lunid: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetExtentParams {
    pub target: i64,
    pub extent: i64,
    /// Auto-allocated as the smallest free LUN on the target when absent.
    #[serde(default)]
    pub lunid: Option<i64>,
}
