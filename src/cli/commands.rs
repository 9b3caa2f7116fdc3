use clap::Subcommand;

use crate::types::{AuthMethod, ExtentType, TargetMode};

#[derive(Subcommand)]
pub enum PortalCommands {
    /// List portals
    List,

    /// Create a portal
    Create {
        /// ip:port pair to listen on (repeatable); port defaults to 3260
        #[arg(long = "listen", required = true)]
        listen: Vec<String>,

        #[arg(long, default_value = "")]
        comment: String,

        /// Discovery auth method: NONE, CHAP or CHAP_MUTUAL
        #[arg(long, default_value = "NONE")]
        discovery_authmethod: AuthMethod,

        /// Auth credential tag used for discovery
        #[arg(long)]
        discovery_authgroup: Option<i64>,
    },

    /// Replace a portal's settings and listen set
    Update {
        id: i64,

        /// ip:port pair to listen on (repeatable); port defaults to 3260
        #[arg(long = "listen", required = true)]
        listen: Vec<String>,

        #[arg(long, default_value = "")]
        comment: String,

        /// Discovery auth method: NONE, CHAP or CHAP_MUTUAL
        #[arg(long, default_value = "NONE")]
        discovery_authmethod: AuthMethod,

        /// Auth credential tag used for discovery
        #[arg(long)]
        discovery_authgroup: Option<i64>,
    },

    /// Delete a portal and renumber the remaining tags
    Delete { id: i64 },

    /// Show possible listen addresses
    Choices,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// List authorized access credentials
    List,

    /// Create an authorized access credential
    Create {
        /// Group tag referenced by portals and target groups
        #[arg(long)]
        tag: i64,

        #[arg(long)]
        user: String,

        /// CHAP secret, 12-16 characters
        #[arg(long)]
        secret: String,

        /// Peer user for mutual CHAP
        #[arg(long, default_value = "")]
        peeruser: String,

        /// Peer secret for mutual CHAP, 12-16 characters
        #[arg(long, default_value = "")]
        peersecret: String,
    },

    /// Replace an authorized access credential
    Update {
        id: i64,

        #[arg(long)]
        tag: i64,

        #[arg(long)]
        user: String,

        #[arg(long)]
        secret: String,

        #[arg(long, default_value = "")]
        peeruser: String,

        #[arg(long, default_value = "")]
        peersecret: String,
    },

    /// Delete an authorized access credential
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum InitiatorCommands {
    /// List initiator access lists
    List,

    /// Create an initiator access list; no names/networks means allow all
    Create {
        /// Allowed initiator name (repeatable)
        #[arg(long = "initiator")]
        initiators: Vec<String>,

        /// Allowed network in CIDR form (repeatable)
        #[arg(long = "network")]
        auth_network: Vec<String>,

        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Replace an initiator access list
    Update {
        id: i64,

        #[arg(long = "initiator")]
        initiators: Vec<String>,

        #[arg(long = "network")]
        auth_network: Vec<String>,

        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Delete an initiator access list
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum TargetCommands {
    /// List targets
    List,

    /// Create a target
    Create {
        /// Target name (lowercase alphanumeric plus . - :)
        #[arg(long)]
        name: String,

        #[arg(long)]
        alias: Option<String>,

        /// ISCSI, FC or BOTH
        #[arg(long, default_value = "ISCSI")]
        mode: TargetMode,

        /// Group spec `portal[:initiator[:authmethod[:auth]]]` (repeatable)
        #[arg(long = "group")]
        groups: Vec<String>,
    },

    /// Replace a target's settings and group set
    Update {
        id: i64,

        #[arg(long)]
        name: String,

        #[arg(long)]
        alias: Option<String>,

        /// ISCSI, FC or BOTH
        #[arg(long, default_value = "ISCSI")]
        mode: TargetMode,

        /// Group spec `portal[:initiator[:authmethod[:auth]]]` (repeatable)
        #[arg(long = "group")]
        groups: Vec<String>,
    },

    /// Delete a target and its associations
    Delete {
        id: i64,

        /// Proceed even while the target has active sessions
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum ExtentCommands {
    /// List extents
    List,

    /// Create an extent
    Create {
        #[arg(long)]
        name: String,

        /// DISK or FILE
        #[arg(long = "type", default_value = "DISK")]
        kind: ExtentType,

        /// zvol/... reference (DISK extents)
        #[arg(long)]
        disk: Option<String>,

        /// Backing file path (FILE extents)
        #[arg(long)]
        path: Option<String>,

        /// Size in bytes; 0 = auto, the file must already exist
        #[arg(long, default_value_t = 0)]
        filesize: i64,

        #[arg(long, default_value_t = 512)]
        blocksize: u32,

        /// Auto-generated when omitted
        #[arg(long)]
        serial: Option<String>,

        #[arg(long, default_value = "")]
        comment: String,

        /// Expose the extent read-only
        #[arg(long)]
        ro: bool,
    },

    /// Delete an extent and its associations
    Delete {
        id: i64,

        /// Also unlink the backing file of a FILE extent
        #[arg(long)]
        remove: bool,

        /// Proceed even while an associated target has active sessions
        #[arg(long)]
        force: bool,
    },

    /// Show zvols available for DISK extents
    Disks {
        /// Path to offer even if already in use (repeatable)
        #[arg(long = "ignore")]
        ignore: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AssocCommands {
    /// List target-extent associations
    List,

    /// Bind an extent into a target
    Create {
        #[arg(long)]
        target: i64,

        #[arg(long)]
        extent: i64,

        /// LUN number; the smallest free LUN is allocated when omitted
        #[arg(long)]
        lun: Option<i64>,
    },

    /// Delete an association
    Delete {
        id: i64,

        /// Proceed even while the target has active sessions
        #[arg(long)]
        force: bool,
    },
}
