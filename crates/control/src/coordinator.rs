//! Network lifecycle: create, merge-update with cascading address
//! reassignment, the narrow timestamp/limit updates, and guarded deletion.
//!
//! The coordinator performs no locking of its own. A read-merge-write in
//! [`MutationCoordinator::update`] relies on the store replacing a record
//! atomically, so concurrent updates to one network are last-writer-wins.

use crate::access_keys::{embedded_local_range, refresh_access_strings};
use crate::merge::{merge, ChangeKind};
use crate::ports::{AddressPlanner, Deadline, DependentCounter, NetworkStore};
use crate::validation::validate_network;
use netmesh_common::{Error, ErrorKind, Network, NetworkPatch, Result, DEFAULT_NODE_LIMIT};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEPENDENTS_EXIST: &str =
    "Node check failed. All nodes must be deleted before deleting network";

/// Orchestrates merges, persistence and cascades for network records
pub struct MutationCoordinator {
    store: Arc<dyn NetworkStore>,
    planner: Arc<dyn AddressPlanner>,
    counter: Arc<dyn DependentCounter>,
    deadline: Deadline,
}

impl MutationCoordinator {
    pub fn new(
        store: Arc<dyn NetworkStore>,
        planner: Arc<dyn AddressPlanner>,
        counter: Arc<dyn DependentCounter>,
        deadline: Deadline,
    ) -> Self {
        Self {
            store,
            planner,
            counter,
            deadline,
        }
    }

    async fn load(&self, net_id: &str) -> Result<Network> {
        self.deadline
            .run(&format!("load network {}", net_id), self.store.get(net_id))
            .await
    }

    async fn persist(&self, network: &Network) -> Result<()> {
        self.deadline
            .run(
                &format!("persist network {}", network.net_id),
                self.store.put_merged(&network.net_id, network),
            )
            .await
    }

    async fn ensure_display_name_free(&self, display_name: &str) -> Result<()> {
        let taken = self
            .deadline
            .run(
                "check display name",
                self.store.exists_by_display_name(display_name),
            )
            .await?;
        if taken {
            return Err(Error::Validation(format!(
                "displayname '{}' is already in use",
                display_name
            )));
        }
        Ok(())
    }

    /// Create a network: apply defaults, validate, check uniqueness, stamp
    /// both modification timestamps and persist.
    pub async fn create(&self, mut network: Network) -> Result<Network> {
        network.is_local.get_or_insert(false);
        network.is_dual_stack.get_or_insert(false);
        network.set_defaults();
        validate_network(&network)?;

        let exists = self
            .deadline
            .run("check network id", self.store.exists_by_id(&network.net_id))
            .await?;
        if exists {
            return Err(Error::Validation(format!(
                "netid '{}' is already in use",
                network.net_id
            )));
        }
        self.ensure_display_name_free(&network.display_name).await?;

        network.touch_nodes();
        network.touch_network();
        network.touch_keys();
        self.persist(&network).await?;

        debug!(network = %network.net_id, range = %network.address_range, "Created network");
        Ok(network)
    }

    pub async fn get(&self, net_id: &str) -> Result<Network> {
        self.load(net_id).await
    }

    pub async fn list(&self) -> Result<Vec<Network>> {
        self.deadline.run("list networks", self.store.list()).await
    }

    /// Merge `patch` into the stored network and persist it.
    ///
    /// Range changes then trigger address reassignment. A failed
    /// reassignment is reported as `Upstream` while the merged record stays
    /// written, leaving the address plan stale until the cascade is retried.
    pub async fn update(&self, net_id: &str, patch: &NetworkPatch) -> Result<Network> {
        let current = self.load(net_id).await?;
        let mut merged = merge(&current, patch)?;
        validate_network(&merged.network)?;

        if embedded_local_range(&current) != embedded_local_range(&merged.network) {
            refresh_access_strings(&mut merged.network)?;
            debug!(network = %net_id, keys = merged.network.access_keys.len(), "Refreshed access strings");
        }

        if merged.network.display_name != current.display_name {
            self.ensure_display_name_free(&merged.network.display_name)
                .await?;
        }

        self.persist(&merged.network).await?;
        debug!(network = %net_id, changes = ?merged.changes, "Merged network update");

        if merged.changes.contains(ChangeKind::AddressRangeChanged) {
            self.cascade("reassign addresses", net_id, self.planner.reassign_addresses(net_id))
                .await?;
        }
        if merged.changes.contains(ChangeKind::LocalRangeChanged) {
            self.cascade(
                "reassign local addresses",
                net_id,
                self.planner.reassign_local_addresses(net_id),
            )
            .await?;
        }

        self.load(net_id).await
    }

    async fn cascade<F>(&self, step: &str, net_id: &str, call: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        let context = format!("{} for network {}", step, net_id);
        match self.deadline.run(&context, call).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(network = %net_id, error = %e, "Network updated but address plan is stale");
                if e.kind() == ErrorKind::Upstream {
                    Err(e)
                } else {
                    Err(Error::Upstream {
                        context,
                        source: Box::new(e),
                    })
                }
            }
        }
    }

    /// Set the node limit directly. Zero restores the default limit.
    pub async fn update_node_limit(&self, net_id: &str, limit: i32) -> Result<Network> {
        if limit < 0 {
            return Err(Error::Validation("nodelimit must not be negative".to_string()));
        }
        let mut network = self.load(net_id).await?;
        network.node_limit = if limit == 0 { DEFAULT_NODE_LIMIT } else { limit };
        self.persist(&network).await?;
        Ok(network)
    }

    /// Stamp a new key-update time so nodes refresh their keys
    pub async fn key_update(&self, net_id: &str) -> Result<Network> {
        let mut network = self.load(net_id).await?;
        network.touch_keys();
        self.persist(&network).await?;
        Ok(network)
    }

    /// Stamp both modification times so nodes pull fresh configuration
    pub async fn alert_network(&self, net_id: &str) -> Result<Network> {
        let mut network = self.load(net_id).await?;
        network.touch_nodes();
        network.touch_network();
        self.persist(&network).await?;
        Ok(network)
    }

    /// Delete a network that has no nodes, returning the number of records
    /// removed
    pub async fn delete(&self, net_id: &str) -> Result<u64> {
        let nodes = self
            .deadline
            .run(
                &format!("count nodes in {}", net_id),
                self.counter.count_nodes_in(net_id),
            )
            .await?;
        if nodes > 0 {
            info!(network = %net_id, nodes, "Refusing to delete network with nodes");
            return Err(Error::Conflict(DEPENDENTS_EXIST.to_string()));
        }

        self.deadline
            .run(&format!("delete network {}", net_id), self.store.delete(net_id))
            .await
    }
}
