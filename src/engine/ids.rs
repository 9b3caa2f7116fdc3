//! Identifier allocation: extent serials, NAA identifiers, and LUN numbers.
//! Portal tag sequencing lives with the portal orchestrator since it is a
//! property of the whole table rather than a single value.

use std::collections::HashSet;

use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Error, Result};

pub const SERIAL_LEN: usize = 15;
const SERIAL_ATTEMPTS: usize = 5;

/// Vendor prefix every generated NAA identifier starts with.
const NAA_PREFIX: &str = "0x6589cfc000000";

/// Random hex serial avoiding `used`, retried a bounded number of times.
pub fn generate_serial<R: Rng>(rng: &mut R, used: &HashSet<String>) -> Result<String> {
    for _ in 0..SERIAL_ATTEMPTS {
        let bytes: [u8; 8] = rng.r#gen();
        let mut serial = hex::encode(bytes);
        serial.truncate(SERIAL_LEN);
        if !used.contains(&serial) {
            return Ok(serial);
        }
    }
    Err(Error::Exhausted(
        "failed to generate a random extent serial".to_string(),
    ))
}

/// NAA identifier: the vendor prefix plus a truncated hash of a fresh random
/// UUID, 34 characters in total (`0x` + 32 hex digits).
pub fn generate_naa() -> String {
    let digest = Sha256::digest(Uuid::new_v4().to_string().as_bytes());
    format!("{}{}", NAA_PREFIX, &hex::encode(digest)[..19])
}

/// Smallest non-negative integer absent from `used`, which must be sorted
/// ascending. LUNs freed by deletion are reused before the range grows.
pub fn next_lun(used: &[i64]) -> i64 {
    let mut next = 0;
    for &lun in used {
        if lun == next {
            next += 1;
        } else if lun > next {
            break;
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_next_lun_empty() {
        assert_eq!(next_lun(&[]), 0);
    }

    #[test]
    fn test_next_lun_gap() {
        assert_eq!(next_lun(&[0, 1, 3]), 2);
        assert_eq!(next_lun(&[1, 2]), 0);
    }

    #[test]
    fn test_next_lun_no_gap() {
        assert_eq!(next_lun(&[0, 1, 2]), 3);
    }

    #[test]
    fn test_serial_shape() {
        let serial = generate_serial(&mut rand::thread_rng(), &HashSet::new()).unwrap();
        assert_eq!(serial.len(), SERIAL_LEN);
        assert!(serial.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_serial_skips_collisions() {
        // Reproduce the first four values the generator will draw, seed the
        // used set with them, and check the fifth attempt lands.
        let mut probe = StepRng::new(0, 1);
        let used: HashSet<String> = (0..4)
            .map(|_| generate_serial(&mut probe, &HashSet::new()).unwrap())
            .collect();

        let mut rng = StepRng::new(0, 1);
        let serial = generate_serial(&mut rng, &used).unwrap();
        assert!(!used.contains(&serial));
    }

    #[test]
    fn test_serial_exhaustion() {
        let mut probe = StepRng::new(0, 1);
        let used: HashSet<String> = (0..5)
            .map(|_| generate_serial(&mut probe, &HashSet::new()).unwrap())
            .collect();

        let mut rng = StepRng::new(0, 1);
        match generate_serial(&mut rng, &used) {
            Err(Error::Exhausted(_)) => {}
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn test_naa_shape() {
        let naa = generate_naa();
        assert_eq!(naa.len(), 34);
        assert!(naa.starts_with("0x6589cfc000000"));
        assert!(naa[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_naa_unique() {
        assert_ne!(generate_naa(), generate_naa());
    }
}
