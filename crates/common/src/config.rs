//! Server configuration
//!
//! Loaded once at startup and passed explicitly to every service that needs
//! it. Environment variables override file values for secrets.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `master_key`
pub const MASTER_KEY_ENV: &str = "NETMESH_MASTER_KEY";

/// Environment variable overriding `jwt_secret`
pub const JWT_SECRET_ENV: &str = "NETMESH_JWT_SECRET";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Operator secret granting unrestricted access
    pub master_key: String,

    /// HMAC secret used to sign and verify user tokens
    pub jwt_secret: String,

    /// SQLite database location
    pub db_path: PathBuf,

    /// Upper bound on every storage or planner call
    pub store_timeout_secs: u64,

    pub api_host: String,
    pub api_port: String,
    pub api_conn_string: String,
    pub grpc_host: String,
    pub grpc_port: String,
    pub grpc_conn_string: String,
    pub grpc_ssl: String,
    pub core_dns_addr: String,

    /// Transport tunnel configuration
    pub wireguard: WireGuardConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            master_key: "secretkey".to_string(),
            jwt_secret: "netmesh-jwt-secret".to_string(),
            db_path: crate::default_db_path(),
            store_timeout_secs: 10,
            api_host: "127.0.0.1".to_string(),
            api_port: "8081".to_string(),
            api_conn_string: String::new(),
            grpc_host: "127.0.0.1".to_string(),
            grpc_port: "50051".to_string(),
            grpc_conn_string: String::new(),
            grpc_ssl: "off".to_string(),
            core_dns_addr: String::new(),
            wireguard: WireGuardConfig::default(),
        }
    }
}

/// Transport tunnel (gRPC over WireGuard) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WireGuardConfig {
    pub grpc_wireguard: String,
    pub grpc_wg_address: String,
    pub grpc_wg_port: String,
    pub grpc_wg_pubkey: String,
}

impl Default for WireGuardConfig {
    fn default() -> Self {
        Self {
            grpc_wireguard: "off".to_string(),
            grpc_wg_address: "10.101.0.1".to_string(),
            grpc_wg_port: "50555".to_string(),
            grpc_wg_pubkey: String::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| Error::InvalidConfig(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply secret overrides from the environment
    pub fn apply_env(mut self) -> Self {
        if let Ok(key) = std::env::var(MASTER_KEY_ENV) {
            self.master_key = key;
        }
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            self.jwt_secret = secret;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.master_key.is_empty() {
            return Err(Error::InvalidConfig("master_key must not be empty".to_string()));
        }
        if self.jwt_secret.is_empty() {
            return Err(Error::InvalidConfig("jwt_secret must not be empty".to_string()));
        }
        if self.store_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "store_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.store_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.store_timeout_secs, 10);
        assert_eq!(config.api_port, "8081");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = ServerConfig {
            master_key: "operator".to_string(),
            api_host: "api.example.com".to_string(),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = ServerConfig::load(&path).unwrap();
        assert_eq!(loaded.master_key, "operator");
        assert_eq!(loaded.api_host, "api.example.com");
        assert_eq!(loaded.wireguard.grpc_wg_port, "50555");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "master_key = \"k\"\n[wireguard]\ngrpc_wireguard = \"on\"\n").unwrap();

        let loaded = ServerConfig::load(&path).unwrap();
        assert_eq!(loaded.master_key, "k");
        assert_eq!(loaded.wireguard.grpc_wireguard, "on");
        assert_eq!(loaded.wireguard.grpc_wg_address, "10.101.0.1");
        assert_eq!(loaded.grpc_port, "50051");
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "store_timeout_secs = \"soon\"").unwrap();

        assert!(matches!(ServerConfig::load(&path), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_empty_master_key() {
        let config = ServerConfig {
            master_key: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
