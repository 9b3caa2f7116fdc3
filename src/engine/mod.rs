//! The topology consistency engine.
//!
//! One [`Engine`] instance owns the mutation protocol for every entity:
//! validate, allocate identifiers, persist the primary row, reconcile child
//! collections, guard destructive operations against live usage, and signal
//! the storage service to reload. The engine talks to the outside world only
//! through the [`crate::store::Store`] trait and the collaborator contracts
//! in [`crate::sys`], so every dependency can be substituted in tests.

mod assoc;
mod attach;
mod auth;
mod extent;
mod ids;
mod initiator;
mod portal;
mod reconcile;
mod target;
mod validate;

pub use validate::{FieldError, ValidationErrors};

use std::sync::Arc;

use crate::config::Settings;
use crate::error::Result;
use crate::store::Store;
use crate::sys::{AddrProvider, ServiceControl, SessionSource, VolumeProvider};

pub struct Engine {
    store: Arc<dyn Store>,
    service: Arc<dyn ServiceControl>,
    volumes: Arc<dyn VolumeProvider>,
    sessions: Arc<dyn SessionSource>,
    addrs: Arc<dyn AddrProvider>,
    settings: Settings,
}

impl Engine {
    pub fn new(
        store: Arc<dyn Store>,
        service: Arc<dyn ServiceControl>,
        volumes: Arc<dyn VolumeProvider>,
        sessions: Arc<dyn SessionSource>,
        addrs: Arc<dyn AddrProvider>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            service,
            volumes,
            sessions,
            addrs,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn reload_service(&self) -> Result<()> {
        self.service.reload(&self.settings.service.unit)
    }

    /// The externally visible target name: prefixed with the configured
    /// basename unless already fully qualified.
    fn qualified_name(&self, name: &str) -> String {
        if name.starts_with("iqn.") || name.starts_with("naa.") || name.starts_with("eui.") {
            name.to_string()
        } else {
            format!("{}:{}", self.settings.service.basename, name)
        }
    }
}
