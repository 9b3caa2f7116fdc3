use std::net::IpAddr;

use crate::error::{Error, Result};
use crate::types::{Initiator, InitiatorParams};

use super::{Engine, ValidationErrors};

fn valid_network(s: &str) -> bool {
    match s.split_once('/') {
        Some((addr, prefix)) => {
            let Ok(addr) = addr.parse::<IpAddr>() else {
                return false;
            };
            let Ok(prefix) = prefix.parse::<u8>() else {
                return false;
            };
            let max = if addr.is_ipv4() { 32 } else { 128 };
            prefix <= max
        }
        None => s.parse::<IpAddr>().is_ok(),
    }
}

fn validate_initiator(data: &InitiatorParams) -> ValidationErrors {
    let mut verrors = ValidationErrors::new();
    for (i, network) in data.auth_network.iter().enumerate() {
        if !valid_network(network) {
            verrors.add(
                format!("auth_network.{i}"),
                format!("\"{network}\" is not a valid IP address or network."),
            );
        }
    }
    verrors
}

impl Engine {
    /// Create an initiator access list. Leaving `initiators` or
    /// `auth_network` empty allows all initiators / all networks.
    pub fn initiator_create(&self, data: InitiatorParams) -> Result<Initiator> {
        validate_initiator(&data).into_result()?;

        let id = self.store.create_initiator(&Initiator {
            id: 0,
            initiators: data.initiators,
            auth_network: data.auth_network,
            comment: data.comment,
        })?;

        self.reload_service()?;
        self.store.get_initiator(id)?.ok_or(Error::NotFound)
    }

    pub fn initiator_update(&self, id: i64, data: InitiatorParams) -> Result<Initiator> {
        self.store.get_initiator(id)?.ok_or(Error::NotFound)?;
        validate_initiator(&data).into_result()?;

        self.store.update_initiator(&Initiator {
            id,
            initiators: data.initiators,
            auth_network: data.auth_network,
            comment: data.comment,
        })?;

        self.reload_service()?;
        self.store.get_initiator(id)?.ok_or(Error::NotFound)
    }

    pub fn initiator_delete(&self, id: i64) -> Result<()> {
        self.store.get_initiator(id)?.ok_or(Error::NotFound)?;
        self.store.delete_initiator(id)?;
        self.reload_service()
    }

    pub fn initiator_get(&self, id: i64) -> Result<Initiator> {
        self.store.get_initiator(id)?.ok_or(Error::NotFound)
    }

    pub fn initiator_list(&self) -> Result<Vec<Initiator>> {
        self.store.list_initiators()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_network() {
        assert!(valid_network("10.0.0.0/24"));
        assert!(valid_network("10.0.0.5"));
        assert!(valid_network("fd00::/64"));
        assert!(!valid_network("10.0.0.0/33"));
        assert!(!valid_network("not-a-network"));
        assert!(!valid_network("10.0.0.0/"));
    }
}
