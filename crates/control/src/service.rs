//! The control plane service object.
//!
//! [`ControlPlane`] owns the database handle and every component built on
//! it. Front ends call [`ControlPlane::authorize`] first, then pass the
//! resulting scope to the operation they want to run.

use crate::access_keys::{AccessKeyManager, AccessKeyRequest, ConnectionInfo};
use crate::adapters::{JwtCredentialResolver, RandomSecretGenerator, SqliteNetworkStore, SqliteNodeRegistry};
use crate::auth::{AuthorizationGate, AuthorizedScope, CredentialVerifier, NetworkScope, Operation};
use crate::coordinator::MutationCoordinator;
use crate::ports::{CredentialResolver, Deadline, NetworkStore};
use netmesh_common::{
    AccessKey, Database, Error, ErrorKind, Network, NetworkPatch, Node, Result, ServerConfig,
    COMMS_NETWORK,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Control plane: authorization plus every network operation
pub struct ControlPlane {
    db: Database,
    gate: AuthorizationGate,
    coordinator: MutationCoordinator,
    keys: AccessKeyManager,
    nodes: Arc<SqliteNodeRegistry>,
    tokens: Arc<JwtCredentialResolver>,
    deadline: Deadline,
}

impl ControlPlane {
    /// Open the database named by `config` and build the service on it
    pub fn open(config: &ServerConfig) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&config.db_path)?;
        Self::with_database(config, db)
    }

    /// Build the service on an already opened database
    pub fn with_database(config: &ServerConfig, db: Database) -> Result<Self> {
        config.validate()?;
        let deadline = Deadline::new(config.store_timeout());

        let store: Arc<dyn NetworkStore> = Arc::new(SqliteNetworkStore::new(db.clone()));
        let registry = Arc::new(SqliteNodeRegistry::new(db.clone()));
        let tokens = Arc::new(JwtCredentialResolver::new(
            config.jwt_secret.clone(),
            config.master_key.clone(),
        ));

        let resolver: Arc<dyn CredentialResolver> = tokens.clone();
        let gate = AuthorizationGate::new(
            CredentialVerifier::new(resolver, deadline),
            store.clone(),
            deadline,
        );
        let coordinator =
            MutationCoordinator::new(store.clone(), registry.clone(), registry.clone(), deadline);
        let keys = AccessKeyManager::new(
            store,
            Arc::new(RandomSecretGenerator),
            ConnectionInfo::from_config(config),
            deadline,
        );

        info!(timeout_secs = config.store_timeout_secs, "Control plane ready");
        Ok(Self {
            db,
            gate,
            coordinator,
            keys,
            nodes: registry,
            tokens,
            deadline,
        })
    }

    /// Authorize `credential` for `operation`, optionally against one
    /// target network that must also be inside the caller's scope.
    pub async fn authorize(
        &self,
        operation: Operation,
        target: Option<&str>,
        credential: &str,
    ) -> Result<AuthorizedScope> {
        let scope = self
            .gate
            .authorize(operation.requires_operator(), target, credential)
            .await?;
        if let Some(net_id) = target.filter(|n| !n.is_empty()) {
            if let Err(e) = scope.ensure_permits(net_id) {
                warn!(user = %scope.identity, network = %net_id, op = operation.name(), "Network outside caller scope");
                return Err(e);
            }
        }
        debug!(user = %scope.identity, op = operation.name(), "Authorized");
        Ok(scope)
    }

    // ========================================================================
    // Networks
    // ========================================================================

    /// Networks visible to `scope`; the internal comms network is never listed
    pub async fn list_networks(&self, scope: &AuthorizedScope) -> Result<Vec<Network>> {
        let networks = match &scope.networks {
            NetworkScope::Unrestricted => self.coordinator.list().await?,
            NetworkScope::Denied => Vec::new(),
            NetworkScope::Only(names) => {
                let mut found = Vec::with_capacity(names.len());
                for name in names {
                    match self.coordinator.get(name).await {
                        Ok(network) => found.push(network),
                        Err(e) if e.kind() == ErrorKind::NotFound => {
                            debug!(network = %name, "Granted network no longer exists");
                        }
                        Err(e) => return Err(e),
                    }
                }
                found
            }
        };

        debug!(user = %scope.identity, count = networks.len(), "Listed networks");
        Ok(networks
            .into_iter()
            .filter(|n| n.net_id != COMMS_NETWORK)
            .collect())
    }

    pub async fn create_network(&self, scope: &AuthorizedScope, network: Network) -> Result<Network> {
        scope.ensure_unrestricted()?;
        let created = self.coordinator.create(network).await?;
        info!(user = %scope.identity, network = %created.net_id, "Created network");
        Ok(created)
    }

    pub async fn get_network(&self, scope: &AuthorizedScope, net_id: &str) -> Result<Network> {
        scope.ensure_permits(net_id)?;
        let network = self.coordinator.get(net_id).await?;
        debug!(user = %scope.identity, network = %net_id, "Fetched network");
        Ok(network)
    }

    pub async fn update_network(
        &self,
        scope: &AuthorizedScope,
        net_id: &str,
        patch: &NetworkPatch,
    ) -> Result<Network> {
        scope.ensure_permits(net_id)?;
        let updated = self.coordinator.update(net_id, patch).await?;
        info!(user = %scope.identity, network = %net_id, "Updated network");
        Ok(updated)
    }

    pub async fn update_node_limit(
        &self,
        scope: &AuthorizedScope,
        net_id: &str,
        limit: i32,
    ) -> Result<Network> {
        scope.ensure_unrestricted()?;
        let updated = self.coordinator.update_node_limit(net_id, limit).await?;
        info!(user = %scope.identity, network = %net_id, limit = updated.node_limit, "Updated node limit");
        Ok(updated)
    }

    pub async fn delete_network(&self, scope: &AuthorizedScope, net_id: &str) -> Result<u64> {
        scope.ensure_unrestricted()?;
        let deleted = self.coordinator.delete(net_id).await?;
        info!(user = %scope.identity, network = %net_id, "Deleted network");
        Ok(deleted)
    }

    pub async fn key_update(&self, scope: &AuthorizedScope, net_id: &str) -> Result<Network> {
        scope.ensure_permits(net_id)?;
        let network = self.coordinator.key_update(net_id).await?;
        info!(user = %scope.identity, network = %net_id, "Updated network keys");
        Ok(network)
    }

    pub async fn alert_network(&self, scope: &AuthorizedScope, net_id: &str) -> Result<Network> {
        scope.ensure_permits(net_id)?;
        let network = self.coordinator.alert_network(net_id).await?;
        info!(user = %scope.identity, network = %net_id, "Alerted network nodes");
        Ok(network)
    }

    // ========================================================================
    // Access keys
    // ========================================================================

    pub async fn create_access_key(
        &self,
        scope: &AuthorizedScope,
        net_id: &str,
        request: AccessKeyRequest,
    ) -> Result<AccessKey> {
        scope.ensure_permits(net_id)?;
        let key = self.keys.issue(net_id, request).await?;
        info!(user = %scope.identity, network = %net_id, key = %key.name, "Created access key");
        Ok(key)
    }

    pub async fn list_access_keys(&self, scope: &AuthorizedScope, net_id: &str) -> Result<Vec<AccessKey>> {
        scope.ensure_permits(net_id)?;
        let keys = self.keys.list(net_id).await?;
        debug!(user = %scope.identity, network = %net_id, count = keys.len(), "Listed access keys");
        Ok(keys)
    }

    pub async fn delete_access_key(&self, scope: &AuthorizedScope, net_id: &str, name: &str) -> Result<()> {
        scope.ensure_permits(net_id)?;
        self.keys.revoke(net_id, name).await?;
        info!(user = %scope.identity, network = %net_id, key = %name, "Deleted access key");
        Ok(())
    }

    pub async fn signup_token(&self, scope: &AuthorizedScope, net_id: &str) -> Result<AccessKey> {
        scope.ensure_permits(net_id)?;
        let token = self.keys.signup_token()?;
        info!(user = %scope.identity, network = %net_id, "Issued signup token");
        Ok(token)
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    pub async fn add_node(&self, scope: &AuthorizedScope, net_id: &str, name: &str) -> Result<Node> {
        scope.ensure_permits(net_id)?;
        let node = self
            .deadline
            .run(&format!("register node in {}", net_id), async {
                self.nodes.register_node(net_id, name)
            })
            .await?;
        info!(user = %scope.identity, network = %net_id, node = %node.id, "Added node");
        Ok(node)
    }

    pub async fn list_nodes(&self, scope: &AuthorizedScope, net_id: &str) -> Result<Vec<Node>> {
        scope.ensure_permits(net_id)?;
        self.deadline
            .run(&format!("list nodes in {}", net_id), async {
                self.nodes.list_nodes(net_id)
            })
            .await
    }

    pub async fn remove_node(&self, scope: &AuthorizedScope, net_id: &str, node_id: &str) -> Result<()> {
        scope.ensure_permits(net_id)?;
        self.deadline
            .run(&format!("remove node {}", node_id), async {
                self.nodes.remove_node(net_id, node_id)
            })
            .await?;
        info!(user = %scope.identity, network = %net_id, node = %node_id, "Removed node");
        Ok(())
    }

    // ========================================================================
    // Users and lifecycle
    // ========================================================================

    /// Sign a user token. Only unrestricted callers may mint tokens.
    pub fn issue_user_token(
        &self,
        scope: &AuthorizedScope,
        username: &str,
        networks: &[String],
        is_admin: bool,
    ) -> Result<String> {
        scope.ensure_unrestricted()?;
        if username.is_empty() {
            return Err(Error::Validation("username is required".to_string()));
        }
        let token = self.tokens.issue_token(username, networks, is_admin)?;
        info!(user = %scope.identity, subject = %username, is_admin, "Issued user token");
        Ok(token)
    }

    /// Flush storage and release the database
    pub fn shutdown(self) -> Result<()> {
        self.db.close()?;
        info!("Control plane stopped");
        Ok(())
    }
}
