//! Access keys: provisioning tokens scoped to one network.
//!
//! An access key's `access_string` is a base64-encoded JSON payload holding
//! everything a new node needs to reach the server and join the network.
//! Keys are stored inline on the network record, and every change rewrites
//! the whole key list.

use crate::ports::{Deadline, NetworkStore, SecretGenerator};
use crate::validation::validate_access_key;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use netmesh_common::{
    AccessKey, AccessToken, Error, Network, Result, ServerConfig, TokenClientConfig,
    TokenServerConfig, TokenWireGuard,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Server and tunnel details embedded in every token
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionInfo {
    pub server: TokenServerConfig,
    pub wireguard: TokenWireGuard,
}

impl ConnectionInfo {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            server: TokenServerConfig {
                core_dns_addr: config.core_dns_addr.clone(),
                api_conn_string: config.api_conn_string.clone(),
                api_host: config.api_host.clone(),
                api_port: config.api_port.clone(),
                grpc_conn_string: config.grpc_conn_string.clone(),
                grpc_host: config.grpc_host.clone(),
                grpc_port: config.grpc_port.clone(),
                grpc_ssl: config.grpc_ssl.clone(),
            },
            wireguard: TokenWireGuard {
                grpc_wireguard: config.wireguard.grpc_wireguard.clone(),
                grpc_wg_address: config.wireguard.grpc_wg_address.clone(),
                grpc_wg_port: config.wireguard.grpc_wg_port.clone(),
                grpc_wg_pubkey: config.wireguard.grpc_wg_pubkey.clone(),
                grpc_wg_endpoint: config.api_host.clone(),
            },
        }
    }
}

/// Requested key fields; empty or zero values are generated or defaulted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessKeyRequest {
    pub name: String,
    pub value: String,
    pub uses: i32,
}

pub fn encode_access_token(token: &AccessToken) -> Result<String> {
    let json = serde_json::to_vec(token)?;
    Ok(STANDARD.encode(json))
}

pub fn decode_access_string(access_string: &str) -> Result<AccessToken> {
    let raw = STANDARD
        .decode(access_string.trim())
        .map_err(|e| Error::Validation(format!("access string is not valid base64: {}", e)))?;
    serde_json::from_slice(&raw)
        .map_err(|e| Error::Validation(format!("access string payload is malformed: {}", e)))
}

/// Local range carried in the tokens of `network`; empty unless the network
/// is local
pub fn embedded_local_range(network: &Network) -> &str {
    if network.is_local() {
        &network.local_range
    } else {
        ""
    }
}

/// Rebuild the client section of every key's token from `network`, keeping
/// the server and tunnel sections each key was issued with.
pub fn refresh_access_strings(network: &mut Network) -> Result<()> {
    let local_range = embedded_local_range(network).to_string();
    for key in network.access_keys.iter_mut() {
        let mut token = decode_access_string(&key.access_string)?;
        token.client_config = TokenClientConfig {
            network: network.net_id.clone(),
            key: key.value.clone(),
            local_range: local_range.clone(),
        };
        key.access_string = encode_access_token(&token)?;
    }
    Ok(())
}

/// Issues, lists and revokes access keys
pub struct AccessKeyManager {
    store: Arc<dyn NetworkStore>,
    secrets: Arc<dyn SecretGenerator>,
    connection: ConnectionInfo,
    deadline: Deadline,
}

impl AccessKeyManager {
    pub fn new(
        store: Arc<dyn NetworkStore>,
        secrets: Arc<dyn SecretGenerator>,
        connection: ConnectionInfo,
        deadline: Deadline,
    ) -> Self {
        Self {
            store,
            secrets,
            connection,
            deadline,
        }
    }

    async fn load(&self, net_id: &str) -> Result<Network> {
        self.deadline
            .run(&format!("load network {}", net_id), self.store.get(net_id))
            .await
    }

    async fn save_keys(&self, network: &Network) -> Result<()> {
        self.deadline
            .run(
                &format!("store access keys of {}", network.net_id),
                self.store.put_merged(&network.net_id, network),
            )
            .await
    }

    /// Issue a key on `net_id`, generating whatever the request leaves empty
    pub async fn issue(&self, net_id: &str, request: AccessKeyRequest) -> Result<AccessKey> {
        let mut key = AccessKey {
            name: request.name,
            value: request.value,
            access_string: String::new(),
            uses: request.uses,
        };
        if key.name.is_empty() {
            key.name = self.secrets.gen_name();
        }
        if key.value.is_empty() {
            key.value = self.secrets.gen_secret();
        }
        if key.uses == 0 {
            key.uses = 1;
        }

        let mut network = self.load(net_id).await?;
        if network.find_key(&key.name).is_some() {
            return Err(Error::Conflict("Duplicate AccessKey Name".to_string()));
        }

        let token = AccessToken {
            server_config: self.connection.server.clone(),
            wireguard: self.connection.wireguard.clone(),
            client_config: TokenClientConfig {
                network: network.net_id.clone(),
                key: key.value.clone(),
                local_range: embedded_local_range(&network).to_string(),
            },
        };
        key.access_string = encode_access_token(&token)?;
        validate_access_key(&key)?;

        network.access_keys.push(key.clone());
        self.save_keys(&network).await?;

        debug!(network = %net_id, key = %key.name, uses = key.uses, "Issued access key");
        Ok(key)
    }

    pub async fn list(&self, net_id: &str) -> Result<Vec<AccessKey>> {
        Ok(self.load(net_id).await?.access_keys)
    }

    /// Remove the key named `name`; the rest of the list keeps its order
    pub async fn revoke(&self, net_id: &str, name: &str) -> Result<()> {
        let mut network = self.load(net_id).await?;
        if network.find_key(name).is_none() {
            return Err(Error::not_found("access key", name));
        }

        network.access_keys.retain(|k| k.name != name);
        self.save_keys(&network).await?;
        debug!(network = %net_id, key = %name, "Revoked access key");
        Ok(())
    }

    /// Token carrying only server and tunnel details, for self-service
    /// enrollment
    pub fn signup_token(&self) -> Result<AccessKey> {
        let mut server = self.connection.server.clone();
        server.core_dns_addr.clear();

        let token = AccessToken {
            server_config: server,
            wireguard: self.connection.wireguard.clone(),
            client_config: TokenClientConfig::default(),
        };
        Ok(AccessKey {
            access_string: encode_access_token(&token)?,
            ..Default::default()
        })
    }
}
