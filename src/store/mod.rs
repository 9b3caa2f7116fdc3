mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// `get_portal`/`list_portals` return portals with their listen set loaded,
/// and `get_target`/`list_targets` return targets with their groups loaded;
/// the corresponding `create_*`/`update_*` calls persist only the primary
/// row. Child rows are driven explicitly through the `insert_listen` /
/// `delete_listen` / `insert_group` / `delete_group` operations so the
/// engine's reconciliation step controls them.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Portal operations
    fn count_portals(&self) -> Result<i64>;
    fn create_portal(&self, portal: &Portal) -> Result<i64>;
    fn get_portal(&self, id: i64) -> Result<Option<Portal>>;
    fn list_portals(&self) -> Result<Vec<Portal>>;
    fn update_portal(&self, portal: &Portal) -> Result<()>;
    fn set_portal_tag(&self, id: i64, tag: i64) -> Result<()>;
    fn delete_portal(&self, id: i64) -> Result<bool>;

    // Portal listen pairs (child rows)
    fn insert_listen(&self, portal_id: i64, addr: &ListenAddr) -> Result<()>;
    fn delete_listen(&self, portal_id: i64, addr: &ListenAddr) -> Result<bool>;
    fn delete_listen_for_portal(&self, portal_id: i64) -> Result<()>;
    fn listen_in_use(&self, ip: &str, port: u16, exclude_portal: Option<i64>) -> Result<bool>;

    // Auth credential operations
    fn create_auth(&self, auth: &AuthCredential) -> Result<i64>;
    fn get_auth(&self, id: i64) -> Result<Option<AuthCredential>>;
    fn list_auth(&self) -> Result<Vec<AuthCredential>>;
    fn list_auth_by_tag(&self, tag: i64) -> Result<Vec<AuthCredential>>;
    fn other_auth_with_tag(&self, tag: i64, exclude_id: i64) -> Result<bool>;
    fn update_auth(&self, auth: &AuthCredential) -> Result<()>;
    fn delete_auth(&self, id: i64) -> Result<bool>;

    // Initiator operations
    fn create_initiator(&self, initiator: &Initiator) -> Result<i64>;
    fn get_initiator(&self, id: i64) -> Result<Option<Initiator>>;
    fn list_initiators(&self) -> Result<Vec<Initiator>>;
    fn update_initiator(&self, initiator: &Initiator) -> Result<()>;
    fn delete_initiator(&self, id: i64) -> Result<bool>;

    // Target operations
    fn create_target(&self, target: &Target) -> Result<i64>;
    fn get_target(&self, id: i64) -> Result<Option<Target>>;
    fn list_targets(&self) -> Result<Vec<Target>>;
    fn targets_by_ids(&self, ids: &[i64]) -> Result<Vec<Target>>;
    fn target_name_taken(&self, name: &str, exclude_id: Option<i64>) -> Result<bool>;
    fn target_alias_taken(&self, alias: &str, exclude_id: Option<i64>) -> Result<bool>;
    fn update_target(&self, target: &Target) -> Result<()>;
    fn delete_target(&self, id: i64) -> Result<bool>;

    // Target groups (child rows)
    fn insert_group(&self, target_id: i64, group: &TargetGroup) -> Result<()>;
    fn delete_group(&self, target_id: i64, group: &TargetGroup) -> Result<bool>;
    fn delete_groups_for_target(&self, target_id: i64) -> Result<()>;
    fn delete_groups_for_portal(&self, portal_id: i64) -> Result<()>;
    fn existing_portal_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;
    fn existing_initiator_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;

    // Usage lookups for the auth-credential guard
    fn portals_with_authgroup(&self, tag: i64) -> Result<Vec<i64>>;
    fn targets_with_authgroup(&self, tag: i64) -> Result<Vec<i64>>;

    // Extent operations
    fn create_extent(&self, extent: &Extent) -> Result<i64>;
    fn get_extent(&self, id: i64) -> Result<Option<Extent>>;
    fn list_extents(&self) -> Result<Vec<Extent>>;
    fn extent_name_taken(&self, name: &str, exclude_id: Option<i64>) -> Result<bool>;
    fn extent_serials(&self) -> Result<Vec<String>>;
    fn update_extent(&self, extent: &Extent) -> Result<()>;
    fn delete_extent(&self, id: i64) -> Result<bool>;

    // Association operations
    fn create_assoc(&self, assoc: &TargetExtent) -> Result<i64>;
    fn get_assoc(&self, id: i64) -> Result<Option<TargetExtent>>;
    fn list_assocs(&self) -> Result<Vec<TargetExtent>>;
    fn assocs_for_target(&self, target_id: i64) -> Result<Vec<TargetExtent>>;
    fn assocs_for_extent(&self, extent_id: i64) -> Result<Vec<TargetExtent>>;
    fn lun_in_use(&self, target_id: i64, lunid: i64) -> Result<bool>;
    fn pair_exists(&self, target_id: i64, extent_id: i64) -> Result<bool>;
    fn update_assoc(&self, assoc: &TargetExtent) -> Result<()>;
    fn delete_assoc(&self, id: i64) -> Result<bool>;
}
