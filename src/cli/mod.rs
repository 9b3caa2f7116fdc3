pub mod commands;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::Settings;
use crate::engine::Engine;
use crate::store::{SqliteStore, Store};
use crate::sys::{IpCommand, NoopServiceControl, ScstControl, ServiceControl, SysfsSessions, ZfsCli};
use crate::types::{
    AuthMethod, AuthParams, ExtentParams, InitiatorParams, ListenAddr, PortalParams, TargetExtentParams,
    TargetGroup, TargetParams,
};

use commands::{
    AssocCommands, AuthCommands, ExtentCommands, InitiatorCommands, PortalCommands, TargetCommands,
};

/// Initialize a data directory with an empty configuration database.
pub fn run_init(data_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("lunman.db");
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    println!("Initialized configuration database at {}", db_path.display());
    Ok(())
}

/// Build an engine over an existing data directory, checking it exists.
pub fn build_engine(
    data_dir: &Path,
    config: Option<&Path>,
    offline: bool,
) -> anyhow::Result<Engine> {
    let mut settings = match config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.storage.data_dir = data_dir.to_path_buf();

    let db_path = settings.db_path();
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'lunman init' first.",
            db_path.display()
        );
    }
    let store = Arc::new(SqliteStore::new(&db_path)?);

    let service: Arc<dyn ServiceControl> = if offline {
        Arc::new(NoopServiceControl)
    } else {
        Arc::new(ScstControl)
    };

    Ok(Engine::new(
        store,
        service,
        Arc::new(ZfsCli),
        Arc::new(SysfsSessions::default()),
        Arc::new(IpCommand),
        settings,
    ))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parses `ip`, `ip:port` or `[ipv6]:port` into a listen pair.
fn parse_listen(spec: &str) -> anyhow::Result<ListenAddr> {
    if let Some(rest) = spec.strip_prefix('[') {
        let (ip, port) = rest
            .split_once(']')
            .ok_or_else(|| anyhow::anyhow!("invalid listen spec: {spec}"))?;
        let port = match port.strip_prefix(':') {
            Some(port) => port.parse()?,
            None => 3260,
        };
        return Ok(ListenAddr {
            ip: ip.to_string(),
            port,
        });
    }

    match spec.rsplit_once(':') {
        // a second colon means a bare IPv6 address, not an ip:port pair
        Some((ip, port)) if !ip.contains(':') => Ok(ListenAddr {
            ip: ip.to_string(),
            port: port.parse()?,
        }),
        _ => Ok(ListenAddr {
            ip: spec.to_string(),
            port: 3260,
        }),
    }
}

/// Parses `portal[:initiator[:authmethod[:auth]]]`; empty segments keep
/// their defaults.
fn parse_group(spec: &str) -> anyhow::Result<TargetGroup> {
    let parts: Vec<&str> = spec.split(':').collect();

    let portal = parts
        .first()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| anyhow::anyhow!("group spec needs a portal id: {spec}"))?
        .parse()?;
    let initiator = match parts.get(1) {
        Some(p) if !p.is_empty() => Some(p.parse()?),
        _ => None,
    };
    let authmethod = match parts.get(2) {
        Some(p) if !p.is_empty() => p.parse::<AuthMethod>().map_err(|e| anyhow::anyhow!(e))?,
        _ => AuthMethod::None,
    };
    let auth = match parts.get(3) {
        Some(p) if !p.is_empty() => Some(p.parse()?),
        _ => None,
    };

    Ok(TargetGroup {
        portal,
        initiator,
        authmethod,
        auth,
    })
}

pub fn run_portal(engine: &Engine, command: PortalCommands) -> anyhow::Result<()> {
    match command {
        PortalCommands::List => print_json(&engine.portal_list()?),
        PortalCommands::Create {
            listen,
            comment,
            discovery_authmethod,
            discovery_authgroup,
        } => {
            let listen = listen
                .iter()
                .map(|s| parse_listen(s))
                .collect::<anyhow::Result<Vec<_>>>()?;
            print_json(&engine.portal_create(PortalParams {
                comment,
                discovery_authmethod,
                discovery_authgroup,
                listen,
            })?)
        }
        PortalCommands::Update {
            id,
            listen,
            comment,
            discovery_authmethod,
            discovery_authgroup,
        } => {
            let listen = listen
                .iter()
                .map(|s| parse_listen(s))
                .collect::<anyhow::Result<Vec<_>>>()?;
            print_json(&engine.portal_update(
                id,
                PortalParams {
                    comment,
                    discovery_authmethod,
                    discovery_authgroup,
                    listen,
                },
            )?)
        }
        PortalCommands::Delete { id } => {
            engine.portal_delete(id)?;
            Ok(())
        }
        PortalCommands::Choices => print_json(&engine.listen_ip_choices()?),
    }
}

pub fn run_auth(engine: &Engine, command: AuthCommands) -> anyhow::Result<()> {
    match command {
        AuthCommands::List => print_json(&engine.auth_list()?),
        AuthCommands::Create {
            tag,
            user,
            secret,
            peeruser,
            peersecret,
        } => print_json(&engine.auth_create(AuthParams {
            tag,
            user,
            secret,
            peeruser,
            peersecret,
        })?),
        AuthCommands::Update {
            id,
            tag,
            user,
            secret,
            peeruser,
            peersecret,
        } => print_json(&engine.auth_update(
            id,
            AuthParams {
                tag,
                user,
                secret,
                peeruser,
                peersecret,
            },
        )?),
        AuthCommands::Delete { id } => {
            engine.auth_delete(id)?;
            Ok(())
        }
    }
}

pub fn run_initiator(engine: &Engine, command: InitiatorCommands) -> anyhow::Result<()> {
    match command {
        InitiatorCommands::List => print_json(&engine.initiator_list()?),
        InitiatorCommands::Create {
            initiators,
            auth_network,
            comment,
        } => print_json(&engine.initiator_create(InitiatorParams {
            initiators,
            auth_network,
            comment,
        })?),
        InitiatorCommands::Update {
            id,
            initiators,
            auth_network,
            comment,
        } => print_json(&engine.initiator_update(
            id,
            InitiatorParams {
                initiators,
                auth_network,
                comment,
            },
        )?),
        InitiatorCommands::Delete { id } => {
            engine.initiator_delete(id)?;
            Ok(())
        }
    }
}

pub fn run_target(engine: &Engine, command: TargetCommands) -> anyhow::Result<()> {
    match command {
        TargetCommands::List => print_json(&engine.target_list()?),
        TargetCommands::Create {
            name,
            alias,
            mode,
            groups,
        } => {
            let groups = groups
                .iter()
                .map(|s| parse_group(s))
                .collect::<anyhow::Result<Vec<_>>>()?;
            print_json(&engine.target_create(TargetParams {
                name,
                alias,
                mode,
                groups,
            })?)
        }
        TargetCommands::Update {
            id,
            name,
            alias,
            mode,
            groups,
        } => {
            let groups = groups
                .iter()
                .map(|s| parse_group(s))
                .collect::<anyhow::Result<Vec<_>>>()?;
            print_json(&engine.target_update(
                id,
                TargetParams {
                    name,
                    alias,
                    mode,
                    groups,
                },
            )?)
        }
        TargetCommands::Delete { id, force } => {
            engine.target_delete(id, force)?;
            Ok(())
        }
    }
}

pub fn run_extent(engine: &Engine, command: ExtentCommands) -> anyhow::Result<()> {
    match command {
        ExtentCommands::List => print_json(&engine.extent_list()?),
        ExtentCommands::Create {
            name,
            kind,
            disk,
            path,
            filesize,
            blocksize,
            serial,
            comment,
            ro,
        } => print_json(&engine.extent_create(ExtentParams {
            name,
            kind,
            disk,
            serial,
            path,
            filesize,
            blocksize,
            comment,
            ro,
            ..ExtentParams::default()
        })?),
        ExtentCommands::Delete { id, remove, force } => {
            engine.extent_delete(id, remove, force)?;
            Ok(())
        }
        ExtentCommands::Disks { ignore } => print_json(&engine.disk_choices(&ignore)?),
    }
}

pub fn run_assoc(engine: &Engine, command: AssocCommands) -> anyhow::Result<()> {
    match command {
        AssocCommands::List => print_json(&engine.assoc_list()?),
        AssocCommands::Create {
            target,
            extent,
            lun,
        } => print_json(&engine.assoc_create(TargetExtentParams {
            target,
            extent,
            lunid: lun,
        })?),
        AssocCommands::Delete { id, force } => {
            engine.assoc_delete(id, force)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listen() {
        let addr = parse_listen("10.0.0.1:3261").unwrap();
        assert_eq!((addr.ip.as_str(), addr.port), ("10.0.0.1", 3261));

        let addr = parse_listen("10.0.0.1").unwrap();
        assert_eq!(addr.port, 3260);

        let addr = parse_listen("[fd00::1]:3261").unwrap();
        assert_eq!((addr.ip.as_str(), addr.port), ("fd00::1", 3261));

        let addr = parse_listen("::").unwrap();
        assert_eq!((addr.ip.as_str(), addr.port), ("::", 3260));
    }

    #[test]
    fn test_parse_group() {
        let group = parse_group("1").unwrap();
        assert_eq!(group.portal, 1);
        assert_eq!(group.initiator, None);
        assert_eq!(group.authmethod, AuthMethod::None);

        let group = parse_group("1:2:CHAP:3").unwrap();
        assert_eq!(group.portal, 1);
        assert_eq!(group.initiator, Some(2));
        assert_eq!(group.authmethod, AuthMethod::Chap);
        assert_eq!(group.auth, Some(3));

        let group = parse_group("1::CHAP:3").unwrap();
        assert_eq!(group.initiator, None);
        assert_eq!(group.authmethod, AuthMethod::Chap);

        assert!(parse_group("").is_err());
    }
}
