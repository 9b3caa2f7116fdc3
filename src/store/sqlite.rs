use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_authmethod(s: &str) -> AuthMethod {
    AuthMethod::from_db(s).unwrap_or_else(|| {
        tracing::error!("Invalid auth method in database: '{}'", s);
        AuthMethod::None
    })
}

fn parse_mode(s: &str) -> TargetMode {
    TargetMode::from_db(s).unwrap_or_else(|| {
        tracing::error!("Invalid target mode in database: '{}'", s);
        TargetMode::Iscsi
    })
}

fn parse_extent_type(s: &str) -> ExtentType {
    ExtentType::from_db(s).unwrap_or_else(|| {
        tracing::error!("Invalid extent type in database: '{}'", s);
        ExtentType::Disk
    })
}

fn parse_rpm(s: &str) -> ExtentRpm {
    ExtentRpm::from_db(s).unwrap_or_else(|| {
        tracing::error!("Invalid extent rpm in database: '{}'", s);
        ExtentRpm::Ssd
    })
}

/// Newline-joined storage form for initiator access lists; empty lists are
/// stored as the sentinel 'ALL'.
fn join_list(items: &[String]) -> String {
    if items.is_empty() {
        "ALL".to_string()
    } else {
        items.join("\n")
    }
}

fn split_list(s: &str) -> Vec<String> {
    if s == "ALL" {
        Vec::new()
    } else {
        s.split_whitespace().map(str::to_string).collect()
    }
}

/// Builds a `(?,?,...)` placeholder list for IN queries.
fn placeholders(n: usize) -> String {
    let mut s = String::from("(");
    for i in 0..n {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s.push(')');
    s
}

impl SqliteStore {
    fn listen_for_portal(&self, conn: &Connection, portal_id: i64) -> Result<Vec<ListenAddr>> {
        let mut stmt =
            conn.prepare("SELECT ip, port FROM portal_listen WHERE portal_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![portal_id], |row| {
            Ok(ListenAddr {
                ip: row.get(0)?,
                port: row.get::<_, i64>(1)? as u16,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn groups_for_target(&self, conn: &Connection, target_id: i64) -> Result<Vec<TargetGroup>> {
        let mut stmt = conn.prepare(
            "SELECT portal_id, initiator_id, authmethod, authgroup
             FROM target_groups WHERE target_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![target_id], |row| {
            Ok(TargetGroup {
                portal: row.get(0)?,
                initiator: row.get(1)?,
                authmethod: parse_authmethod(&row.get::<_, String>(2)?),
                auth: row.get(3)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn ids_in(&self, table: &str, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn();
        let sql = format!("SELECT id FROM {} WHERE id IN {}", table, placeholders(ids.len()));
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

fn map_extent(row: &rusqlite::Row<'_>) -> rusqlite::Result<Extent> {
    Ok(Extent {
        id: row.get(0)?,
        name: row.get(1)?,
        serial: row.get(2)?,
        kind: parse_extent_type(&row.get::<_, String>(3)?),
        path: row.get(4)?,
        filesize: row.get(5)?,
        blocksize: row.get::<_, i64>(6)? as u32,
        pblocksize: row.get(7)?,
        avail_threshold: row.get::<_, Option<i64>>(8)?.map(|v| v as u8),
        comment: row.get(9)?,
        naa: row.get(10)?,
        insecure_tpc: row.get(11)?,
        xen: row.get(12)?,
        rpm: parse_rpm(&row.get::<_, String>(13)?),
        ro: row.get(14)?,
        enabled: row.get(15)?,
        vendor: row.get(16)?,
    })
}

const EXTENT_COLUMNS: &str = "id, name, serial, type, path, filesize, blocksize, pblocksize, \
     avail_threshold, comment, naa, insecure_tpc, xen, rpm, ro, enabled, vendor";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Portal operations

    fn count_portals(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM portals", [], |row| row.get(0))
            .map_err(Error::from)
    }

    fn create_portal(&self, portal: &Portal) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO portals (tag, comment, discovery_authmethod, discovery_authgroup)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                portal.tag,
                portal.comment,
                portal.discovery_authmethod.as_db(),
                portal.discovery_authgroup,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_portal(&self, id: i64) -> Result<Option<Portal>> {
        let conn = self.conn();
        let portal = conn
            .query_row(
                "SELECT id, tag, comment, discovery_authmethod, discovery_authgroup
                 FROM portals WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Portal {
                        id: row.get(0)?,
                        tag: row.get(1)?,
                        comment: row.get(2)?,
                        discovery_authmethod: parse_authmethod(&row.get::<_, String>(3)?),
                        discovery_authgroup: row.get(4)?,
                        listen: Vec::new(),
                    })
                },
            )
            .optional()?;

        match portal {
            Some(mut portal) => {
                portal.listen = self.listen_for_portal(&conn, portal.id)?;
                Ok(Some(portal))
            }
            None => Ok(None),
        }
    }

    fn list_portals(&self) -> Result<Vec<Portal>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, tag, comment, discovery_authmethod, discovery_authgroup
             FROM portals ORDER BY tag",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Portal {
                id: row.get(0)?,
                tag: row.get(1)?,
                comment: row.get(2)?,
                discovery_authmethod: parse_authmethod(&row.get::<_, String>(3)?),
                discovery_authgroup: row.get(4)?,
                listen: Vec::new(),
            })
        })?;
        let mut portals = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)?;
        for portal in &mut portals {
            portal.listen = self.listen_for_portal(&conn, portal.id)?;
        }
        Ok(portals)
    }

    fn update_portal(&self, portal: &Portal) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE portals SET tag = ?1, comment = ?2, discovery_authmethod = ?3,
             discovery_authgroup = ?4 WHERE id = ?5",
            params![
                portal.tag,
                portal.comment,
                portal.discovery_authmethod.as_db(),
                portal.discovery_authgroup,
                portal.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_portal_tag(&self, id: i64, tag: i64) -> Result<()> {
        let rows = self
            .conn()
            .execute("UPDATE portals SET tag = ?1 WHERE id = ?2", params![tag, id])?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_portal(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM portals WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Portal listen pairs

    fn insert_listen(&self, portal_id: i64, addr: &ListenAddr) -> Result<()> {
        self.conn().execute(
            "INSERT INTO portal_listen (portal_id, ip, port) VALUES (?1, ?2, ?3)",
            params![portal_id, addr.ip, addr.port],
        )?;
        Ok(())
    }

    fn delete_listen(&self, portal_id: i64, addr: &ListenAddr) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM portal_listen WHERE portal_id = ?1 AND ip = ?2 AND port = ?3",
            params![portal_id, addr.ip, addr.port],
        )?;
        Ok(rows > 0)
    }

    fn delete_listen_for_portal(&self, portal_id: i64) -> Result<()> {
        self.conn().execute(
            "DELETE FROM portal_listen WHERE portal_id = ?1",
            params![portal_id],
        )?;
        Ok(())
    }

    fn listen_in_use(&self, ip: &str, port: u16, exclude_portal: Option<i64>) -> Result<bool> {
        let conn = self.conn();
        let in_use = match exclude_portal {
            Some(portal_id) => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM portal_listen
                 WHERE ip = ?1 AND port = ?2 AND portal_id != ?3)",
                params![ip, port, portal_id],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM portal_listen WHERE ip = ?1 AND port = ?2)",
                params![ip, port],
                |row| row.get(0),
            )?,
        };
        Ok(in_use)
    }

    // Auth credential operations

    fn create_auth(&self, auth: &AuthCredential) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO auth_credentials (tag, user, secret, peeruser, peersecret)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![auth.tag, auth.user, auth.secret, auth.peeruser, auth.peersecret],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_auth(&self, id: i64) -> Result<Option<AuthCredential>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, tag, user, secret, peeruser, peersecret
             FROM auth_credentials WHERE id = ?1",
            params![id],
            |row| {
                Ok(AuthCredential {
                    id: row.get(0)?,
                    tag: row.get(1)?,
                    user: row.get(2)?,
                    secret: row.get(3)?,
                    peeruser: row.get(4)?,
                    peersecret: row.get(5)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_auth(&self) -> Result<Vec<AuthCredential>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, tag, user, secret, peeruser, peersecret
             FROM auth_credentials ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AuthCredential {
                id: row.get(0)?,
                tag: row.get(1)?,
                user: row.get(2)?,
                secret: row.get(3)?,
                peeruser: row.get(4)?,
                peersecret: row.get(5)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_auth_by_tag(&self, tag: i64) -> Result<Vec<AuthCredential>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, tag, user, secret, peeruser, peersecret
             FROM auth_credentials WHERE tag = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![tag], |row| {
            Ok(AuthCredential {
                id: row.get(0)?,
                tag: row.get(1)?,
                user: row.get(2)?,
                secret: row.get(3)?,
                peeruser: row.get(4)?,
                peersecret: row.get(5)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn other_auth_with_tag(&self, tag: i64, exclude_id: i64) -> Result<bool> {
        let conn = self.conn();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM auth_credentials WHERE tag = ?1 AND id != ?2)",
            params![tag, exclude_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn update_auth(&self, auth: &AuthCredential) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE auth_credentials SET tag = ?1, user = ?2, secret = ?3,
             peeruser = ?4, peersecret = ?5 WHERE id = ?6",
            params![
                auth.tag,
                auth.user,
                auth.secret,
                auth.peeruser,
                auth.peersecret,
                auth.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_auth(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM auth_credentials WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Initiator operations

    fn create_initiator(&self, initiator: &Initiator) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO initiators (initiators, auth_network, comment) VALUES (?1, ?2, ?3)",
            params![
                join_list(&initiator.initiators),
                join_list(&initiator.auth_network),
                initiator.comment,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_initiator(&self, id: i64) -> Result<Option<Initiator>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, initiators, auth_network, comment FROM initiators WHERE id = ?1",
            params![id],
            |row| {
                Ok(Initiator {
                    id: row.get(0)?,
                    initiators: split_list(&row.get::<_, String>(1)?),
                    auth_network: split_list(&row.get::<_, String>(2)?),
                    comment: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_initiators(&self) -> Result<Vec<Initiator>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, initiators, auth_network, comment FROM initiators ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Initiator {
                id: row.get(0)?,
                initiators: split_list(&row.get::<_, String>(1)?),
                auth_network: split_list(&row.get::<_, String>(2)?),
                comment: row.get(3)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_initiator(&self, initiator: &Initiator) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE initiators SET initiators = ?1, auth_network = ?2, comment = ?3 WHERE id = ?4",
            params![
                join_list(&initiator.initiators),
                join_list(&initiator.auth_network),
                initiator.comment,
                initiator.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_initiator(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM initiators WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Target operations

    fn create_target(&self, target: &Target) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO targets (name, alias, mode) VALUES (?1, ?2, ?3)",
            params![target.name, target.alias, target.mode.as_db()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_target(&self, id: i64) -> Result<Option<Target>> {
        let conn = self.conn();
        let target = conn
            .query_row(
                "SELECT id, name, alias, mode FROM targets WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Target {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        alias: row.get(2)?,
                        mode: parse_mode(&row.get::<_, String>(3)?),
                        groups: Vec::new(),
                    })
                },
            )
            .optional()?;

        match target {
            Some(mut target) => {
                target.groups = self.groups_for_target(&conn, target.id)?;
                Ok(Some(target))
            }
            None => Ok(None),
        }
    }

    fn list_targets(&self) -> Result<Vec<Target>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name, alias, mode FROM targets ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Target {
                id: row.get(0)?,
                name: row.get(1)?,
                alias: row.get(2)?,
                mode: parse_mode(&row.get::<_, String>(3)?),
                groups: Vec::new(),
            })
        })?;
        let mut targets = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)?;
        for target in &mut targets {
            target.groups = self.groups_for_target(&conn, target.id)?;
        }
        Ok(targets)
    }

    fn targets_by_ids(&self, ids: &[i64]) -> Result<Vec<Target>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn();
        let sql = format!(
            "SELECT id, name, alias, mode FROM targets WHERE id IN {} ORDER BY id",
            placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok(Target {
                id: row.get(0)?,
                name: row.get(1)?,
                alias: row.get(2)?,
                mode: parse_mode(&row.get::<_, String>(3)?),
                groups: Vec::new(),
            })
        })?;
        let mut targets = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)?;
        for target in &mut targets {
            target.groups = self.groups_for_target(&conn, target.id)?;
        }
        Ok(targets)
    }

    fn target_name_taken(&self, name: &str, exclude_id: Option<i64>) -> Result<bool> {
        let conn = self.conn();
        let taken = match exclude_id {
            Some(id) => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM targets WHERE name = ?1 AND id != ?2)",
                params![name, id],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM targets WHERE name = ?1)",
                params![name],
                |row| row.get(0),
            )?,
        };
        Ok(taken)
    }

    fn target_alias_taken(&self, alias: &str, exclude_id: Option<i64>) -> Result<bool> {
        let conn = self.conn();
        let taken = match exclude_id {
            Some(id) => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM targets WHERE alias = ?1 AND id != ?2)",
                params![alias, id],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM targets WHERE alias = ?1)",
                params![alias],
                |row| row.get(0),
            )?,
        };
        Ok(taken)
    }

    fn update_target(&self, target: &Target) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE targets SET name = ?1, alias = ?2, mode = ?3 WHERE id = ?4",
            params![target.name, target.alias, target.mode.as_db(), target.id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_target(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM targets WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Target groups

    fn insert_group(&self, target_id: i64, group: &TargetGroup) -> Result<()> {
        self.conn().execute(
            "INSERT INTO target_groups (target_id, portal_id, initiator_id, authmethod, authgroup)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                target_id,
                group.portal,
                group.initiator,
                group.authmethod.as_db(),
                group.auth,
            ],
        )?;
        Ok(())
    }

    fn delete_group(&self, target_id: i64, group: &TargetGroup) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM target_groups WHERE target_id = ?1 AND portal_id = ?2
             AND initiator_id IS ?3 AND authmethod = ?4 AND authgroup IS ?5",
            params![
                target_id,
                group.portal,
                group.initiator,
                group.authmethod.as_db(),
                group.auth,
            ],
        )?;
        Ok(rows > 0)
    }

    fn delete_groups_for_target(&self, target_id: i64) -> Result<()> {
        self.conn().execute(
            "DELETE FROM target_groups WHERE target_id = ?1",
            params![target_id],
        )?;
        Ok(())
    }

    fn delete_groups_for_portal(&self, portal_id: i64) -> Result<()> {
        self.conn().execute(
            "DELETE FROM target_groups WHERE portal_id = ?1",
            params![portal_id],
        )?;
        Ok(())
    }

    fn existing_portal_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        self.ids_in("portals", ids)
    }

    fn existing_initiator_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        self.ids_in("initiators", ids)
    }

    // Usage lookups

    fn portals_with_authgroup(&self, tag: i64) -> Result<Vec<i64>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id FROM portals WHERE discovery_authgroup = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![tag], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn targets_with_authgroup(&self, tag: i64) -> Result<Vec<i64>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT target_id FROM target_groups WHERE authgroup = ?1 ORDER BY target_id",
        )?;
        let rows = stmt.query_map(params![tag], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Extent operations

    fn create_extent(&self, extent: &Extent) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO extents (name, serial, type, path, filesize, blocksize, pblocksize,
             avail_threshold, comment, naa, insecure_tpc, xen, rpm, ro, enabled, vendor)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                extent.name,
                extent.serial,
                extent.kind.as_db(),
                extent.path,
                extent.filesize,
                extent.blocksize,
                extent.pblocksize,
                extent.avail_threshold.map(|v| v as i64),
                extent.comment,
                extent.naa,
                extent.insecure_tpc,
                extent.xen,
                extent.rpm.as_db(),
                extent.ro,
                extent.enabled,
                extent.vendor,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_extent(&self, id: i64) -> Result<Option<Extent>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {EXTENT_COLUMNS} FROM extents WHERE id = ?1"),
            params![id],
            map_extent,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_extents(&self) -> Result<Vec<Extent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {EXTENT_COLUMNS} FROM extents ORDER BY id"))?;
        let rows = stmt.query_map([], map_extent)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn extent_name_taken(&self, name: &str, exclude_id: Option<i64>) -> Result<bool> {
        let conn = self.conn();
        let taken = match exclude_id {
            Some(id) => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM extents WHERE name = ?1 AND id != ?2)",
                params![name, id],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM extents WHERE name = ?1)",
                params![name],
                |row| row.get(0),
            )?,
        };
        Ok(taken)
    }

    fn extent_serials(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT serial FROM extents")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_extent(&self, extent: &Extent) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE extents SET name = ?1, serial = ?2, type = ?3, path = ?4, filesize = ?5,
             blocksize = ?6, pblocksize = ?7, avail_threshold = ?8, comment = ?9, naa = ?10,
             insecure_tpc = ?11, xen = ?12, rpm = ?13, ro = ?14, enabled = ?15, vendor = ?16
             WHERE id = ?17",
            params![
                extent.name,
                extent.serial,
                extent.kind.as_db(),
                extent.path,
                extent.filesize,
                extent.blocksize,
                extent.pblocksize,
                extent.avail_threshold.map(|v| v as i64),
                extent.comment,
                extent.naa,
                extent.insecure_tpc,
                extent.xen,
                extent.rpm.as_db(),
                extent.ro,
                extent.enabled,
                extent.vendor,
                extent.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_extent(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM extents WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Association operations

    fn create_assoc(&self, assoc: &TargetExtent) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO target_extents (target_id, extent_id, lunid) VALUES (?1, ?2, ?3)",
            params![assoc.target, assoc.extent, assoc.lunid],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_assoc(&self, id: i64) -> Result<Option<TargetExtent>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, target_id, extent_id, lunid FROM target_extents WHERE id = ?1",
            params![id],
            |row| {
                Ok(TargetExtent {
                    id: row.get(0)?,
                    target: row.get(1)?,
                    extent: row.get(2)?,
                    lunid: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_assocs(&self) -> Result<Vec<TargetExtent>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, target_id, extent_id, lunid FROM target_extents ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(TargetExtent {
                id: row.get(0)?,
                target: row.get(1)?,
                extent: row.get(2)?,
                lunid: row.get(3)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn assocs_for_target(&self, target_id: i64) -> Result<Vec<TargetExtent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, target_id, extent_id, lunid FROM target_extents
             WHERE target_id = ?1 ORDER BY lunid",
        )?;
        let rows = stmt.query_map(params![target_id], |row| {
            Ok(TargetExtent {
                id: row.get(0)?,
                target: row.get(1)?,
                extent: row.get(2)?,
                lunid: row.get(3)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn assocs_for_extent(&self, extent_id: i64) -> Result<Vec<TargetExtent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, target_id, extent_id, lunid FROM target_extents
             WHERE extent_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![extent_id], |row| {
            Ok(TargetExtent {
                id: row.get(0)?,
                target: row.get(1)?,
                extent: row.get(2)?,
                lunid: row.get(3)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn lun_in_use(&self, target_id: i64, lunid: i64) -> Result<bool> {
        let conn = self.conn();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM target_extents WHERE target_id = ?1 AND lunid = ?2)",
            params![target_id, lunid],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn pair_exists(&self, target_id: i64, extent_id: i64) -> Result<bool> {
        let conn = self.conn();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM target_extents WHERE target_id = ?1 AND extent_id = ?2)",
            params![target_id, extent_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn update_assoc(&self, assoc: &TargetExtent) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE target_extents SET target_id = ?1, extent_id = ?2, lunid = ?3 WHERE id = ?4",
            params![assoc.target, assoc.extent, assoc.lunid, assoc.id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_assoc(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM target_extents WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = test_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"portals".to_string()));
        assert!(tables.contains(&"portal_listen".to_string()));
        assert!(tables.contains(&"auth_credentials".to_string()));
        assert!(tables.contains(&"initiators".to_string()));
        assert!(tables.contains(&"targets".to_string()));
        assert!(tables.contains(&"target_groups".to_string()));
        assert!(tables.contains(&"extents".to_string()));
        assert!(tables.contains(&"target_extents".to_string()));
    }

    #[test]
    fn test_portal_crud_with_listen() {
        let (_temp, store) = test_store();

        let portal = Portal {
            id: 0,
            tag: 1,
            comment: "first".to_string(),
            discovery_authmethod: AuthMethod::None,
            discovery_authgroup: None,
            listen: Vec::new(),
        };
        let id = store.create_portal(&portal).unwrap();
        store
            .insert_listen(
                id,
                &ListenAddr {
                    ip: "10.0.0.1".to_string(),
                    port: 3260,
                },
            )
            .unwrap();

        let fetched = store.get_portal(id).unwrap().unwrap();
        assert_eq!(fetched.tag, 1);
        assert_eq!(fetched.listen.len(), 1);
        assert_eq!(fetched.listen[0].ip, "10.0.0.1");

        assert!(store.listen_in_use("10.0.0.1", 3260, None).unwrap());
        assert!(!store.listen_in_use("10.0.0.1", 3260, Some(id)).unwrap());
        assert!(!store.listen_in_use("10.0.0.1", 3261, None).unwrap());

        let deleted = store.delete_portal(id).unwrap();
        assert!(deleted);
        assert!(store.get_portal(id).unwrap().is_none());
        // listen rows cascade with the portal
        assert!(!store.listen_in_use("10.0.0.1", 3260, None).unwrap());
    }

    #[test]
    fn test_initiator_all_sentinel() {
        let (_temp, store) = test_store();

        let id = store
            .create_initiator(&Initiator {
                id: 0,
                initiators: Vec::new(),
                auth_network: vec!["10.0.0.0/24".to_string()],
                comment: String::new(),
            })
            .unwrap();

        let conn = store.conn();
        let raw: (String, String) = conn
            .query_row(
                "SELECT initiators, auth_network FROM initiators WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        drop(conn);
        assert_eq!(raw.0, "ALL");
        assert_eq!(raw.1, "10.0.0.0/24");

        let fetched = store.get_initiator(id).unwrap().unwrap();
        assert!(fetched.initiators.is_empty());
        assert_eq!(fetched.auth_network, vec!["10.0.0.0/24".to_string()]);
    }

    #[test]
    fn test_target_groups_null_matching() {
        let (_temp, store) = test_store();

        let portal_id = store
            .create_portal(&Portal {
                id: 0,
                tag: 1,
                comment: String::new(),
                discovery_authmethod: AuthMethod::None,
                discovery_authgroup: None,
                listen: Vec::new(),
            })
            .unwrap();
        let target_id = store
            .create_target(&Target {
                id: 0,
                name: "disk0".to_string(),
                alias: None,
                mode: TargetMode::Iscsi,
                groups: Vec::new(),
            })
            .unwrap();

        let group = TargetGroup {
            portal: portal_id,
            initiator: None,
            authmethod: AuthMethod::None,
            auth: None,
        };
        store.insert_group(target_id, &group).unwrap();

        let fetched = store.get_target(target_id).unwrap().unwrap();
        assert_eq!(fetched.groups, vec![group.clone()]);

        // value match must handle NULL initiator/authgroup
        assert!(store.delete_group(target_id, &group).unwrap());
        assert!(store.get_target(target_id).unwrap().unwrap().groups.is_empty());
    }

    #[test]
    fn test_assoc_uniqueness_helpers() {
        let (_temp, store) = test_store();

        let target_id = store
            .create_target(&Target {
                id: 0,
                name: "disk0".to_string(),
                alias: None,
                mode: TargetMode::Iscsi,
                groups: Vec::new(),
            })
            .unwrap();

        store
            .create_assoc(&TargetExtent {
                id: 0,
                target: target_id,
                extent: 7,
                lunid: 0,
            })
            .unwrap();

        assert!(store.lun_in_use(target_id, 0).unwrap());
        assert!(!store.lun_in_use(target_id, 1).unwrap());
        assert!(store.pair_exists(target_id, 7).unwrap());
        assert!(!store.pair_exists(target_id, 8).unwrap());
    }
}
