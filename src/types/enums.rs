use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Authentication method for discovery and target groups.
///
/// The canonical names (`NONE`, `CHAP`, `CHAP_MUTUAL`) are what the API and
/// CLI speak; the database keeps the legacy display spellings (`None`,
/// `CHAP`, `CHAP Mutual`). The two `match` blocks below are the entire
/// bidirectional mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthMethod {
    #[default]
    None,
    Chap,
    ChapMutual,
}

impl AuthMethod {
    pub fn as_db(self) -> &'static str {
        match self {
            AuthMethod::None => "None",
            AuthMethod::Chap => "CHAP",
            AuthMethod::ChapMutual => "CHAP Mutual",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "None" => Some(AuthMethod::None),
            "CHAP" => Some(AuthMethod::Chap),
            "CHAP Mutual" => Some(AuthMethod::ChapMutual),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthMethod::None => "NONE",
            AuthMethod::Chap => "CHAP",
            AuthMethod::ChapMutual => "CHAP_MUTUAL",
        }
    }

    /// CHAP and mutual CHAP both need an auth credential attached.
    pub fn requires_auth(self) -> bool {
        !matches!(self, AuthMethod::None)
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(AuthMethod::None),
            "CHAP" => Ok(AuthMethod::Chap),
            "CHAP_MUTUAL" => Ok(AuthMethod::ChapMutual),
            _ => Err(format!("invalid auth method: {s}")),
        }
    }
}

/// Transport mode a target is exported over. FC and BOTH are gated on the
/// Fibre Channel feature flag in [`crate::config::Settings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetMode {
    #[default]
    Iscsi,
    Fc,
    Both,
}

impl TargetMode {
    pub fn as_db(self) -> &'static str {
        match self {
            TargetMode::Iscsi => "iscsi",
            TargetMode::Fc => "fc",
            TargetMode::Both => "both",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "iscsi" => Some(TargetMode::Iscsi),
            "fc" => Some(TargetMode::Fc),
            "both" => Some(TargetMode::Both),
            _ => None,
        }
    }
}

impl FromStr for TargetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ISCSI" => Ok(TargetMode::Iscsi),
            "FC" => Ok(TargetMode::Fc),
            "BOTH" => Ok(TargetMode::Both),
            _ => Err(format!("invalid target mode: {s}")),
        }
    }
}

/// Backing store kind for an extent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtentType {
    #[default]
    Disk,
    File,
}

impl ExtentType {
    pub fn as_db(self) -> &'static str {
        match self {
            ExtentType::Disk => "DISK",
            ExtentType::File => "FILE",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "DISK" => Some(ExtentType::Disk),
            "FILE" => Some(ExtentType::File),
            _ => None,
        }
    }
}

impl FromStr for ExtentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db(s).ok_or_else(|| format!("invalid extent type: {s}"))
    }
}

/// Rotation rate reported to initiators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtentRpm {
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[default]
    #[serde(rename = "SSD")]
    Ssd,
    #[serde(rename = "5400")]
    Rpm5400,
    #[serde(rename = "7200")]
    Rpm7200,
    #[serde(rename = "10000")]
    Rpm10000,
    #[serde(rename = "15000")]
    Rpm15000,
}

impl ExtentRpm {
    pub fn as_db(self) -> &'static str {
        match self {
            ExtentRpm::Unknown => "UNKNOWN",
            ExtentRpm::Ssd => "SSD",
            ExtentRpm::Rpm5400 => "5400",
            ExtentRpm::Rpm7200 => "7200",
            ExtentRpm::Rpm10000 => "10000",
            ExtentRpm::Rpm15000 => "15000",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "UNKNOWN" => Some(ExtentRpm::Unknown),
            "SSD" => Some(ExtentRpm::Ssd),
            "5400" => Some(ExtentRpm::Rpm5400),
            "7200" => Some(ExtentRpm::Rpm7200),
            "10000" => Some(ExtentRpm::Rpm10000),
            "15000" => Some(ExtentRpm::Rpm15000),
            _ => None,
        }
    }
}

impl FromStr for ExtentRpm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db(s).ok_or_else(|| format!("invalid rpm value: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authmethod_db_roundtrip() {
        for m in [AuthMethod::None, AuthMethod::Chap, AuthMethod::ChapMutual] {
            assert_eq!(AuthMethod::from_db(m.as_db()), Some(m));
        }
        assert_eq!(AuthMethod::from_db("CHAP Mutual"), Some(AuthMethod::ChapMutual));
        assert_eq!(AuthMethod::from_db("chap"), None);
    }

    #[test]
    fn test_authmethod_canonical_names() {
        assert_eq!(AuthMethod::ChapMutual.as_str(), "CHAP_MUTUAL");
        assert_eq!("CHAP_MUTUAL".parse::<AuthMethod>(), Ok(AuthMethod::ChapMutual));
        assert_eq!(
            serde_json::to_string(&AuthMethod::ChapMutual).unwrap(),
            "\"CHAP_MUTUAL\""
        );
    }

    #[test]
    fn test_mode_db_roundtrip() {
        for m in [TargetMode::Iscsi, TargetMode::Fc, TargetMode::Both] {
            assert_eq!(TargetMode::from_db(m.as_db()), Some(m));
        }
    }

    #[test]
    fn test_rpm_db_roundtrip() {
        for r in [
            ExtentRpm::Unknown,
            ExtentRpm::Ssd,
            ExtentRpm::Rpm5400,
            ExtentRpm::Rpm7200,
            ExtentRpm::Rpm10000,
            ExtentRpm::Rpm15000,
        ] {
            assert_eq!(ExtentRpm::from_db(r.as_db()), Some(r));
        }
    }
}
