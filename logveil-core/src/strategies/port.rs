//! Port strategies.

use crate::errors::{InvalidValue, ValueKind};
use crate::strategies::context::StableMap;

/// Maps a port to a stable pseudo-random port in `[1024, 65535)`.
///
/// Anything that is not a decimal port number is rejected.
pub fn hash_port(map: &StableMap, value: &str) -> Result<String, InvalidValue> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.parse::<u16>().is_err() {
        return Err(InvalidValue::new(ValueKind::Port, value));
    }
    Ok(map.map_port(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_map_into_unprivileged_range() {
        let map = StableMap::new(b"salt".to_vec());
        for port in ["0", "22", "80", "443", "65535"] {
            let mapped: u32 = hash_port(&map, port).unwrap().parse().unwrap();
            assert!((1024..65535).contains(&mapped));
        }
        assert_eq!(hash_port(&map, "80").unwrap(), hash_port(&map, "80").unwrap());
    }

    #[test]
    fn non_numeric_ports_are_invalid() {
        let map = StableMap::new(b"salt".to_vec());
        assert!(hash_port(&map, "http").is_err());
        assert!(hash_port(&map, "70000").is_err());
        assert!(hash_port(&map, "-").is_err());
    }
}
