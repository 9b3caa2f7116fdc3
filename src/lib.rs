//! # Lunman
//!
//! An iSCSI target topology manager, usable both as a standalone binary and
//! as a library.
//!
//! Lunman keeps a relational model of portals, CHAP credentials, initiator
//! access lists, targets, extents, and LUN bindings consistent with each
//! other and with a running SCST service: every mutation is validated
//! against the whole topology, identifiers (portal tags, extent serials,
//! NAA ids, LUNs) are allocated automatically, and the service is told to
//! reload after each change.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! lunman = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lunman::config::Settings;
//! use lunman::engine::Engine;
//! use lunman::store::{SqliteStore, Store};
//! use lunman::sys::{IpCommand, ScstControl, SysfsSessions, ZfsCli};
//!
//! let store = Arc::new(SqliteStore::new("./data/lunman.db").unwrap());
//! store.initialize().unwrap();
//!
//! let engine = Engine::new(
//!     store,
//!     Arc::new(ScstControl),
//!     Arc::new(ZfsCli),
//!     Arc::new(SysfsSessions::default()),
//!     Arc::new(IpCommand),
//!     Settings::default(),
//! );
//! let portals = engine.portal_list().unwrap();
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod store;
pub mod sys;
pub mod types;
