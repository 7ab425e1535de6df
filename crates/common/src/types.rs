//! Core types for NetMesh networks, access keys and nodes

use serde::{Deserialize, Serialize};

/// Default WireGuard listen port handed to new nodes
pub const DEFAULT_LISTEN_PORT: i32 = 51821;

/// Default persistent keepalive (seconds)
pub const DEFAULT_KEEPALIVE: i32 = 20;

/// Default node check-in interval (seconds)
pub const DEFAULT_CHECK_IN_INTERVAL: i32 = 30;

/// Node limit applied when none is configured
pub const DEFAULT_NODE_LIMIT: i32 = 999_999_999;

/// Internal network used for server-to-server traffic; never listed to users
pub const COMMS_NETWORK: &str = "comms";

/// Current unix time in seconds
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============================================================================
// Network
// ============================================================================

/// A logical network and the defaults handed to its nodes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
    /// Immutable identifier
    pub net_id: String,
    pub display_name: String,
    /// IPv4 range (CIDR)
    pub address_range: String,
    /// IPv6 range (CIDR), only meaningful when dual-stack
    pub address_range6: String,
    /// Private range (CIDR), only meaningful when local
    pub local_range: String,
    pub is_local: Option<bool>,
    pub is_dual_stack: Option<bool>,
    pub allow_manual_signup: Option<bool>,
    pub default_interface: String,
    pub default_listen_port: i32,
    pub default_post_up: String,
    pub default_post_down: String,
    pub default_keepalive: i32,
    pub default_save_config: String,
    pub default_check_in_interval: i32,
    pub node_limit: i32,
    pub nodes_last_modified: i64,
    pub network_last_modified: i64,
    pub key_update_timestamp: i64,
    pub access_keys: Vec<AccessKey>,
}

impl Network {
    pub fn is_local(&self) -> bool {
        self.is_local.unwrap_or(false)
    }

    pub fn is_dual_stack(&self) -> bool {
        self.is_dual_stack.unwrap_or(false)
    }

    /// Fill every unset field with its default.
    pub fn set_defaults(&mut self) {
        if self.display_name.is_empty() {
            self.display_name = self.net_id.clone();
        }
        if self.default_interface.is_empty() {
            self.default_interface = format!("nm-{}", self.net_id);
        }
        if self.default_listen_port == 0 {
            self.default_listen_port = DEFAULT_LISTEN_PORT;
        }
        if self.node_limit == 0 {
            self.node_limit = DEFAULT_NODE_LIMIT;
        }
        if self.default_keepalive == 0 {
            self.default_keepalive = DEFAULT_KEEPALIVE;
        }
        if self.default_check_in_interval == 0 {
            self.default_check_in_interval = DEFAULT_CHECK_IN_INTERVAL;
        }
        if self.default_save_config.is_empty() {
            self.default_save_config = "no".to_string();
        }
        self.is_local.get_or_insert(false);
        self.is_dual_stack.get_or_insert(false);
        self.allow_manual_signup.get_or_insert(false);
    }

    /// Stamp a new network modification time, never going backwards.
    pub fn touch_network(&mut self) {
        self.network_last_modified = next_stamp(self.network_last_modified);
    }

    /// Stamp a new node-set modification time, never going backwards.
    pub fn touch_nodes(&mut self) {
        self.nodes_last_modified = next_stamp(self.nodes_last_modified);
    }

    pub fn touch_keys(&mut self) {
        self.key_update_timestamp = next_stamp(self.key_update_timestamp);
    }

    pub fn find_key(&self, name: &str) -> Option<&AccessKey> {
        self.access_keys.iter().find(|k| k.name == name)
    }
}

/// Strictly increasing timestamp relative to `previous`
fn next_stamp(previous: i64) -> i64 {
    now_unix().max(previous + 1)
}

/// Partial update for a network.
///
/// Empty strings, zero numbers and `None` flags mean "leave unchanged". A patch
/// therefore cannot clear a field back to empty or zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkPatch {
    pub net_id: String,
    pub display_name: String,
    pub address_range: String,
    pub address_range6: String,
    pub local_range: String,
    pub is_local: Option<bool>,
    pub is_dual_stack: Option<bool>,
    pub allow_manual_signup: Option<bool>,
    pub default_interface: String,
    pub default_listen_port: i32,
    pub default_post_up: String,
    pub default_post_down: String,
    pub default_keepalive: i32,
    pub default_check_in_interval: i32,
}

// ============================================================================
// Access keys
// ============================================================================

/// Provisioning token scoped to one network
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessKey {
    pub name: String,
    pub value: String,
    pub access_string: String,
    pub uses: i32,
}

/// Server connection info embedded in access tokens
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenServerConfig {
    #[serde(rename = "corednsaddr", skip_serializing_if = "String::is_empty")]
    pub core_dns_addr: String,
    #[serde(rename = "apiconn")]
    pub api_conn_string: String,
    #[serde(rename = "apihost")]
    pub api_host: String,
    #[serde(rename = "apiport")]
    pub api_port: String,
    #[serde(rename = "grpcconn")]
    pub grpc_conn_string: String,
    #[serde(rename = "grpchost")]
    pub grpc_host: String,
    #[serde(rename = "grpcport")]
    pub grpc_port: String,
    #[serde(rename = "grpcssl")]
    pub grpc_ssl: String,
}

/// Transport tunnel info embedded in access tokens
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenWireGuard {
    #[serde(rename = "grpcwg")]
    pub grpc_wireguard: String,
    #[serde(rename = "grpcwgaddr")]
    pub grpc_wg_address: String,
    #[serde(rename = "grpcwgport")]
    pub grpc_wg_port: String,
    #[serde(rename = "grpcwgpubkey")]
    pub grpc_wg_pubkey: String,
    #[serde(rename = "grpcwgendpoint")]
    pub grpc_wg_endpoint: String,
}

/// Network-specific part of an access token
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenClientConfig {
    pub network: String,
    pub key: String,
    #[serde(rename = "localrange")]
    pub local_range: String,
}

/// Decoded payload of an access string
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessToken {
    #[serde(rename = "serverconfig")]
    pub server_config: TokenServerConfig,
    #[serde(rename = "wg")]
    pub wireguard: TokenWireGuard,
    #[serde(rename = "clientconfig")]
    pub client_config: TokenClientConfig,
}

// ============================================================================
// Nodes
// ============================================================================

/// A node enrolled in a network
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub network: String,
    pub address: String,
    pub address6: String,
    pub local_address: String,
    pub last_modified: i64,
}
