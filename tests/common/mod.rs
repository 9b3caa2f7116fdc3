#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use lunman::config::Settings;
use lunman::engine::Engine;
use lunman::error::Result;
use lunman::store::{SqliteStore, Store};
use lunman::sys::{
    AddrProvider, ServiceControl, SessionSource, VolumeInfo, VolumeProvider, volumes,
};
use lunman::types::{ExtentParams, ExtentType, ListenAddr, PortalParams, TargetGroup, TargetParams};

/// Records service-control calls instead of touching a real service.
#[derive(Default)]
pub struct RecordingService {
    pub reloads: Mutex<usize>,
    pub removed: Mutex<Vec<String>>,
    pub running: bool,
}

impl ServiceControl for RecordingService {
    fn reload(&self, _unit: &str) -> Result<()> {
        *self.reloads.lock().unwrap() += 1;
        Ok(())
    }

    fn is_running(&self, _unit: &str) -> Result<bool> {
        Ok(self.running)
    }

    fn remove_target(&self, qualified_name: &str) -> Result<()> {
        self.removed.lock().unwrap().push(qualified_name.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSessions {
    active: Mutex<HashSet<String>>,
}

impl FakeSessions {
    /// Marks a qualified target name as having an open session.
    pub fn activate(&self, name: &str) {
        self.active.lock().unwrap().insert(name.to_string());
    }
}

impl SessionSource for FakeSessions {
    fn active_sessions(&self, targets: &[String]) -> Result<Vec<String>> {
        let active = self.active.lock().unwrap();
        Ok(targets
            .iter()
            .filter(|t| active.contains(*t))
            .cloned()
            .collect())
    }
}

pub struct FakeVolumes {
    pub volumes: Vec<VolumeInfo>,
    pub snapshots: Vec<String>,
    pub devices: HashSet<PathBuf>,
}

impl Default for FakeVolumes {
    fn default() -> Self {
        let names = ["tank/vol0", "tank/vol1"];
        Self {
            volumes: names
                .iter()
                .map(|name| VolumeInfo {
                    name: name.to_string(),
                    size: 1 << 30,
                    locked: false,
                })
                .collect(),
            snapshots: vec!["tank/vol0@base".to_string()],
            devices: names
                .iter()
                .map(|name| volumes::zvol_name_to_path(name))
                .collect(),
        }
    }
}

impl VolumeProvider for FakeVolumes {
    fn list_volumes(&self) -> Result<Vec<VolumeInfo>> {
        Ok(self.volumes.clone())
    }

    fn list_snapshots(&self) -> Result<Vec<String>> {
        Ok(self.snapshots.clone())
    }

    fn dataset_exists(&self, name: &str) -> Result<bool> {
        Ok(self.volumes.iter().any(|v| v.name == name))
    }

    fn device_present(&self, device: &std::path::Path) -> Result<bool> {
        Ok(self.devices.contains(device))
    }
}

#[derive(Default)]
pub struct FakeAddrs {
    addrs: Mutex<Vec<String>>,
}

impl FakeAddrs {
    pub fn new(addrs: &[&str]) -> Self {
        Self {
            addrs: Mutex::new(addrs.iter().map(|a| a.to_string()).collect()),
        }
    }

    /// Replaces the set of configured system addresses.
    pub fn set(&self, addrs: &[&str]) {
        *self.addrs.lock().unwrap() = addrs.iter().map(|a| a.to_string()).collect();
    }
}

impl AddrProvider for FakeAddrs {
    fn ip_choices(&self, _alua: bool) -> Result<BTreeMap<String, String>> {
        Ok(self
            .addrs
            .lock()
            .unwrap()
            .iter()
            .map(|a| (a.clone(), a.clone()))
            .collect())
    }
}

pub struct Harness {
    pub engine: Engine,
    pub store: Arc<SqliteStore>,
    pub service: Arc<RecordingService>,
    pub sessions: Arc<FakeSessions>,
    pub addrs: Arc<FakeAddrs>,
    pub settings: Settings,
    pub temp: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::new(temp.path().join("lunman.db")).unwrap());
        store.initialize().unwrap();

        let mut settings = Settings::default();
        settings.storage.data_dir = temp.path().to_path_buf();
        settings.storage.roots = vec![temp.path().join("mnt")];

        let service = Arc::new(RecordingService {
            running: true,
            ..Default::default()
        });
        let sessions = Arc::new(FakeSessions::default());
        let addrs = Arc::new(FakeAddrs::new(&["10.0.0.1", "10.0.0.2"]));

        let engine = Engine::new(
            store.clone(),
            service.clone(),
            Arc::new(FakeVolumes::default()),
            sessions.clone(),
            addrs.clone(),
            settings.clone(),
        );

        Harness {
            engine,
            store,
            service,
            sessions,
            addrs,
            settings,
            temp,
        }
    }

    /// Externally visible name for `name`, as the session source sees it.
    pub fn qualified(&self, name: &str) -> String {
        format!("{}:{}", self.settings.service.basename, name)
    }

    /// A FILE extent spec backed by a fresh path under the storage root.
    pub fn file_extent(&self, name: &str, filesize: i64) -> ExtentParams {
        ExtentParams {
            name: name.to_string(),
            kind: ExtentType::File,
            path: Some(
                self.temp
                    .path()
                    .join("mnt")
                    .join("tank")
                    .join(format!("{name}.img"))
                    .to_string_lossy()
                    .into_owned(),
            ),
            filesize,
            ..ExtentParams::default()
        }
    }

    /// A DISK extent spec referencing one of the fake zvols.
    pub fn disk_extent(&self, name: &str, zvol: &str) -> ExtentParams {
        ExtentParams {
            name: name.to_string(),
            kind: ExtentType::Disk,
            disk: Some(format!("zvol/{zvol}")),
            ..ExtentParams::default()
        }
    }
}

pub fn portal_params(ip: &str, port: u16) -> PortalParams {
    PortalParams {
        listen: vec![ListenAddr {
            ip: ip.to_string(),
            port,
        }],
        ..PortalParams::default()
    }
}

pub fn target_params(name: &str, groups: Vec<TargetGroup>) -> TargetParams {
    TargetParams {
        name: name.to_string(),
        groups,
        ..TargetParams::default()
    }
}
