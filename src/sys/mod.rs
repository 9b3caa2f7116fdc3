//! Collaborator contracts for everything the engine needs from the host:
//! service control, volume discovery, session state, and listen addresses.
//! Each contract is deliberately narrow so tests can substitute doubles.

mod net;
mod service;
mod sessions;
pub mod volumes;

pub use net::{AddrProvider, IpCommand};
pub use service::{NoopServiceControl, ScstControl, ServiceControl};
pub use sessions::{SessionSource, SysfsSessions};
pub use volumes::{VolumeInfo, VolumeProvider, ZfsCli};
