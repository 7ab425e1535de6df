//! Field validation for networks and access keys
//!
//! Names (net IDs and display names) must be:
//! - non-empty and within a length limit
//! - drawn from `[A-Za-z0-9-_.]`

use ipnetwork::IpNetwork;
use netmesh_common::{AccessKey, Error, Network, Result};

pub const MAX_NET_ID_LEN: usize = 12;
pub const MAX_DISPLAY_NAME_LEN: usize = 20;
pub const MAX_KEY_NAME_LEN: usize = 20;
pub const MAX_KEY_SECRET_LEN: usize = 16;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn validate_name(field: &str, value: &str, max: usize) -> Result<()> {
    if value.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(Error::Validation(format!(
            "{} must be at most {} characters (got {})",
            field,
            max,
            value.chars().count()
        )));
    }
    if let Some(c) = value.chars().find(|c| !is_name_char(*c)) {
        return Err(Error::Validation(format!(
            "{} contains invalid character '{}'",
            field, c
        )));
    }
    Ok(())
}

pub fn validate_net_id(net_id: &str) -> Result<()> {
    validate_name("netid", net_id, MAX_NET_ID_LEN)
}

pub fn validate_display_name(display_name: &str) -> Result<()> {
    validate_name("displayname", display_name, MAX_DISPLAY_NAME_LEN)
}

/// Parse a CIDR block. A bare address without a prefix is rejected.
pub fn parse_cidr(value: &str) -> Option<IpNetwork> {
    if !value.contains('/') {
        return None;
    }
    value.parse::<IpNetwork>().ok()
}

pub fn is_cidr(value: &str) -> bool {
    parse_cidr(value).is_some()
}

/// Range invariants that hold for every stored network.
pub fn validate_ranges(network: &Network) -> Result<()> {
    match parse_cidr(&network.address_range) {
        Some(IpNetwork::V4(_)) => {}
        _ => {
            return Err(Error::Validation(format!(
                "addressrange '{}' is not a valid IPv4 CIDR",
                network.address_range
            )))
        }
    }

    if network.is_dual_stack() {
        match parse_cidr(&network.address_range6) {
            Some(IpNetwork::V6(_)) => {}
            _ => {
                return Err(Error::Validation(format!(
                    "addressrange6 '{}' is not a valid IPv6 CIDR",
                    network.address_range6
                )))
            }
        }
    }

    if network.is_local() && !is_cidr(&network.local_range) {
        return Err(Error::Validation(format!(
            "localrange '{}' is not a valid CIDR",
            network.local_range
        )));
    }

    Ok(())
}

/// Bounds on the numeric node defaults. Zero means "unset".
pub fn validate_defaults(network: &Network) -> Result<()> {
    let port = network.default_listen_port;
    if port != 0 && !(1024..=65535).contains(&port) {
        return Err(Error::Validation(format!(
            "defaultlistenport {} must be between 1024 and 65535",
            port
        )));
    }
    if !(0..=1000).contains(&network.default_keepalive) {
        return Err(Error::Validation(format!(
            "defaultkeepalive {} must be between 0 and 1000",
            network.default_keepalive
        )));
    }
    let interval = network.default_check_in_interval;
    if interval != 0 && !(2..=100_000).contains(&interval) {
        return Err(Error::Validation(format!(
            "checkininterval {} must be between 2 and 100000",
            interval
        )));
    }
    if network.node_limit < 0 {
        return Err(Error::Validation("nodelimit must not be negative".to_string()));
    }
    Ok(())
}

/// Everything about a network that can be checked without the store.
pub fn validate_network(network: &Network) -> Result<()> {
    validate_net_id(&network.net_id)?;
    validate_display_name(&network.display_name)?;
    validate_ranges(network)?;
    validate_defaults(network)
}

pub fn validate_access_key(key: &AccessKey) -> Result<()> {
    if key.name.chars().count() > MAX_KEY_NAME_LEN {
        return Err(Error::Validation(format!(
            "access key name must be at most {} characters",
            MAX_KEY_NAME_LEN
        )));
    }
    if key.value.len() > MAX_KEY_SECRET_LEN || !key.value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::Validation(format!(
            "access key value must be alphanumeric and at most {} characters",
            MAX_KEY_SECRET_LEN
        )));
    }
    if key.uses < 1 {
        return Err(Error::Validation("access key uses must be at least 1".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(range: &str) -> Network {
        let mut network = Network {
            net_id: "net1".to_string(),
            address_range: range.to_string(),
            ..Default::default()
        };
        network.set_defaults();
        network
    }

    #[test]
    fn test_net_id_rules() {
        assert!(validate_net_id("office-1").is_ok());
        assert!(validate_net_id("a.b_c").is_ok());
        assert!(validate_net_id("").is_err());
        assert!(validate_net_id("thirteenchars").is_err());
        assert!(validate_net_id("bad name").is_err());
        assert!(validate_net_id("net/1").is_err());
    }

    #[test]
    fn test_display_name_rules() {
        assert!(validate_display_name("Head-Office").is_ok());
        assert!(validate_display_name(&"x".repeat(21)).is_err());
        assert!(validate_display_name("héllo").is_err());
    }

    #[test]
    fn test_parse_cidr() {
        assert!(is_cidr("10.0.0.0/24"));
        assert!(is_cidr("fd00::/64"));
        assert!(!is_cidr("10.0.0.1"));
        assert!(!is_cidr("10.0.0.0/33"));
        assert!(!is_cidr("not-a-range"));
    }

    #[test]
    fn test_ranges() {
        assert!(validate_ranges(&network("10.0.0.0/24")).is_ok());
        assert!(validate_ranges(&network("fd00::/64")).is_err());

        let mut dual = network("10.0.0.0/24");
        dual.is_dual_stack = Some(true);
        assert!(validate_ranges(&dual).is_err());
        dual.address_range6 = "fd00::/64".to_string();
        assert!(validate_ranges(&dual).is_ok());

        let mut local = network("10.0.0.0/24");
        local.is_local = Some(true);
        assert!(validate_ranges(&local).is_err());
        local.local_range = "192.168.1.0/24".to_string();
        assert!(validate_ranges(&local).is_ok());
    }

    #[test]
    fn test_local_range_ignored_when_not_local() {
        let mut net = network("10.0.0.0/24");
        net.local_range = "garbage".to_string();
        assert!(validate_ranges(&net).is_ok());
    }

    #[test]
    fn test_defaults_bounds() {
        let mut net = network("10.0.0.0/24");
        assert!(validate_defaults(&net).is_ok());

        net.default_listen_port = 80;
        assert!(validate_defaults(&net).is_err());
        net.default_listen_port = 51821;

        net.default_keepalive = 1001;
        assert!(validate_defaults(&net).is_err());
        net.default_keepalive = 20;

        net.default_check_in_interval = 1;
        assert!(validate_defaults(&net).is_err());
    }

    #[test]
    fn test_access_key_rules() {
        let key = AccessKey {
            name: "laptop".to_string(),
            value: "abc123XYZ".to_string(),
            access_string: String::new(),
            uses: 1,
        };
        assert!(validate_access_key(&key).is_ok());

        let long_name = AccessKey {
            name: "n".repeat(21),
            ..key.clone()
        };
        assert!(validate_access_key(&long_name).is_err());

        let symbol_secret = AccessKey {
            value: "abc-123".to_string(),
            ..key.clone()
        };
        assert!(validate_access_key(&symbol_secret).is_err());

        let no_uses = AccessKey { uses: 0, ..key };
        assert!(validate_access_key(&no_uses).is_err());
    }
}
