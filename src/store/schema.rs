pub const SCHEMA: &str = r#"
-- Portals: discovery/login listen endpoints
CREATE TABLE IF NOT EXISTS portals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tag INTEGER NOT NULL DEFAULT 1,            -- dense 1..N, renumbered on delete
    comment TEXT NOT NULL DEFAULT '',
    discovery_authmethod TEXT NOT NULL DEFAULT 'None',
    discovery_authgroup INTEGER                -- auth credential tag, NULL = none
);

-- ip:port pairs a portal listens on; globally unique across portals
CREATE TABLE IF NOT EXISTS portal_listen (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    portal_id INTEGER NOT NULL REFERENCES portals(id) ON DELETE CASCADE,
    ip TEXT NOT NULL,
    port INTEGER NOT NULL DEFAULT 3260,

    UNIQUE(ip, port)
);

-- CHAP credentials, grouped by tag (several credentials may share one tag)
CREATE TABLE IF NOT EXISTS auth_credentials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tag INTEGER NOT NULL DEFAULT 1,
    user TEXT NOT NULL,
    secret TEXT NOT NULL,
    peeruser TEXT NOT NULL DEFAULT '',
    peersecret TEXT NOT NULL DEFAULT ''
);

-- Initiator access lists; 'ALL' means unrestricted
CREATE TABLE IF NOT EXISTS initiators (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    initiators TEXT NOT NULL DEFAULT 'ALL',    -- newline-joined initiator names
    auth_network TEXT NOT NULL DEFAULT 'ALL',  -- newline-joined CIDR networks
    comment TEXT NOT NULL DEFAULT ''
);

-- Targets: logical export points
CREATE TABLE IF NOT EXISTS targets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    alias TEXT UNIQUE,
    mode TEXT NOT NULL DEFAULT 'iscsi'
);

-- Portal/initiator/auth bindings per target; a portal appears at most once
CREATE TABLE IF NOT EXISTS target_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL REFERENCES targets(id),
    portal_id INTEGER NOT NULL REFERENCES portals(id),
    initiator_id INTEGER REFERENCES initiators(id) ON DELETE SET NULL,
    authmethod TEXT NOT NULL DEFAULT 'None',
    authgroup INTEGER,                         -- auth credential tag, NULL = none

    UNIQUE(target_id, portal_id)
);

-- Extents: backing stores exposed as LUNs
CREATE TABLE IF NOT EXISTS extents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    serial TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT 'DISK',
    path TEXT NOT NULL,                        -- zvol/... for DISK, absolute path for FILE
    filesize INTEGER NOT NULL DEFAULT 0,       -- bytes; 0 = auto (file must exist)
    blocksize INTEGER NOT NULL DEFAULT 512,
    pblocksize INTEGER NOT NULL DEFAULT 0,
    avail_threshold INTEGER,                   -- percent, NULL = disabled
    comment TEXT NOT NULL DEFAULT '',
    naa TEXT NOT NULL UNIQUE,
    insecure_tpc INTEGER NOT NULL DEFAULT 1,
    xen INTEGER NOT NULL DEFAULT 0,
    rpm TEXT NOT NULL DEFAULT 'SSD',
    ro INTEGER NOT NULL DEFAULT 0,
    enabled INTEGER NOT NULL DEFAULT 1,
    vendor TEXT NOT NULL DEFAULT ''
);

-- LUN bindings; an extent maps into a target at most once
CREATE TABLE IF NOT EXISTS target_extents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL REFERENCES targets(id),
    extent_id INTEGER NOT NULL REFERENCES extents(id),
    lunid INTEGER NOT NULL,

    UNIQUE(target_id, extent_id)
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_portal_listen_portal ON portal_listen(portal_id);
CREATE INDEX IF NOT EXISTS idx_auth_tag ON auth_credentials(tag);
CREATE INDEX IF NOT EXISTS idx_target_groups_target ON target_groups(target_id);
CREATE INDEX IF NOT EXISTS idx_target_groups_portal ON target_groups(portal_id);
CREATE INDEX IF NOT EXISTS idx_target_extents_target ON target_extents(target_id);
CREATE INDEX IF NOT EXISTS idx_target_extents_extent ON target_extents(extent_id);
"#;
