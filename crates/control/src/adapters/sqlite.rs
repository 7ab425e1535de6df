//! Network records and node registry on top of [`Database`]

use crate::ports::{AddressPlanner, DependentCounter, NetworkStore};
use crate::validation::parse_cidr;
use async_trait::async_trait;
use ipnetwork::IpNetwork;
use netmesh_common::db::{NETWORKS_TABLE, NODES_TABLE};
use netmesh_common::{now_unix, Database, Error, Network, Node, Result};
use std::collections::{BTreeMap, HashSet};
use std::net::IpAddr;
use tracing::{debug, info};

// ============================================================================
// Network store
// ============================================================================

/// Network records stored as JSON documents keyed by net ID
#[derive(Clone)]
pub struct SqliteNetworkStore {
    db: Database,
}

impl SqliteNetworkStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NetworkStore for SqliteNetworkStore {
    async fn get(&self, net_id: &str) -> Result<Network> {
        self.db
            .fetch_record(NETWORKS_TABLE, net_id)?
            .ok_or_else(|| Error::not_found("network", net_id))
    }

    async fn list(&self) -> Result<Vec<Network>> {
        let records: BTreeMap<String, Network> = self.db.fetch_records(NETWORKS_TABLE)?;
        Ok(records.into_values().collect())
    }

    async fn put_merged(&self, net_id: &str, network: &Network) -> Result<()> {
        self.db.insert(NETWORKS_TABLE, net_id, network)
    }

    async fn delete(&self, net_id: &str) -> Result<u64> {
        Ok(self.db.delete_record(NETWORKS_TABLE, net_id)? as u64)
    }

    async fn exists_by_id(&self, net_id: &str) -> Result<bool> {
        Ok(self
            .db
            .fetch_record::<Network>(NETWORKS_TABLE, net_id)?
            .is_some())
    }

    async fn exists_by_display_name(&self, display_name: &str) -> Result<bool> {
        Ok(self.db.count_where(NETWORKS_TABLE, "display_name", display_name)? > 0)
    }
}

// ============================================================================
// Node registry
// ============================================================================

/// Nodes enrolled in networks, with sequential address assignment
#[derive(Clone)]
pub struct SqliteNodeRegistry {
    db: Database,
}

impl SqliteNodeRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn load_network(&self, net_id: &str) -> Result<Network> {
        self.db
            .fetch_record(NETWORKS_TABLE, net_id)?
            .ok_or_else(|| Error::not_found("network", net_id))
    }

    /// Record a node-set change on the owning network
    fn touch_nodes(&self, mut network: Network) -> Result<()> {
        network.touch_nodes();
        self.db.insert(NETWORKS_TABLE, &network.net_id, &network)
    }

    /// Nodes of one network, ordered by node ID
    pub fn list_nodes(&self, net_id: &str) -> Result<Vec<Node>> {
        let records: BTreeMap<String, Node> = self.db.fetch_records(NODES_TABLE)?;
        Ok(records
            .into_values()
            .filter(|node| node.network == net_id)
            .collect())
    }

    /// Enroll a node, giving it the first free address of each range.
    pub fn register_node(&self, net_id: &str, name: &str) -> Result<Node> {
        let network = self.load_network(net_id)?;
        let existing = self.list_nodes(net_id)?;

        let limit = network.node_limit.max(0) as usize;
        if existing.len() >= limit {
            return Err(Error::Conflict(format!(
                "node limit of {} reached for network {}",
                network.node_limit, net_id
            )));
        }

        let mut node = Node {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            network: net_id.to_string(),
            last_modified: now_unix(),
            ..Default::default()
        };

        node.address = next_free(&network.address_range, existing.iter().map(|n| &n.address))?;
        if network.is_dual_stack() {
            node.address6 = next_free(&network.address_range6, existing.iter().map(|n| &n.address6))?;
        }
        if network.is_local() {
            node.local_address =
                next_free(&network.local_range, existing.iter().map(|n| &n.local_address))?;
        }

        self.db.insert(NODES_TABLE, &node.id, &node)?;
        self.touch_nodes(network)?;
        info!(network = %net_id, node = %node.id, address = %node.address, "Registered node");
        Ok(node)
    }

    pub fn remove_node(&self, net_id: &str, node_id: &str) -> Result<()> {
        let node: Option<Node> = self.db.fetch_record(NODES_TABLE, node_id)?;
        match node {
            Some(node) if node.network == net_id => {
                self.db.delete_record(NODES_TABLE, node_id)?;
                let network = self.load_network(net_id)?;
                self.touch_nodes(network)?;
                info!(network = %net_id, node = %node_id, "Removed node");
                Ok(())
            }
            _ => Err(Error::not_found("node", node_id)),
        }
    }

    fn reassign(&self, net_id: &str, local_only: bool) -> Result<()> {
        let network = self.load_network(net_id)?;
        let mut nodes = self.list_nodes(net_id)?;
        if nodes.is_empty() {
            return Ok(());
        }

        if local_only {
            if network.is_local() {
                let mut hosts = usable_hosts(require_range(&network.local_range)?);
                for node in nodes.iter_mut() {
                    node.local_address = take_host(&mut hosts, &network.local_range)?;
                }
            } else {
                for node in nodes.iter_mut() {
                    node.local_address.clear();
                }
            }
        } else {
            let mut hosts = usable_hosts(require_range(&network.address_range)?);
            for node in nodes.iter_mut() {
                node.address = take_host(&mut hosts, &network.address_range)?;
            }
            if network.is_dual_stack() {
                let mut hosts6 = usable_hosts(require_range(&network.address_range6)?);
                for node in nodes.iter_mut() {
                    node.address6 = take_host(&mut hosts6, &network.address_range6)?;
                }
            }
        }

        let now = now_unix();
        for node in nodes.iter_mut() {
            node.last_modified = now;
            self.db.insert(NODES_TABLE, &node.id, &*node)?;
        }
        debug!(network = %net_id, count = nodes.len(), local_only, "Reassigned node addresses");
        self.touch_nodes(network)
    }
}

#[async_trait]
impl DependentCounter for SqliteNodeRegistry {
    async fn count_nodes_in(&self, net_id: &str) -> Result<u64> {
        self.db.count_where(NODES_TABLE, "network", net_id)
    }
}

#[async_trait]
impl AddressPlanner for SqliteNodeRegistry {
    async fn reassign_addresses(&self, net_id: &str) -> Result<()> {
        self.reassign(net_id, false)
    }

    async fn reassign_local_addresses(&self, net_id: &str) -> Result<()> {
        self.reassign(net_id, true)
    }
}

fn require_range(range: &str) -> Result<IpNetwork> {
    parse_cidr(range).ok_or_else(|| Error::Validation(format!("'{}' is not a valid CIDR", range)))
}

/// Host addresses of a range, skipping the network address (and the IPv4
/// broadcast address) except on point-to-point prefixes
fn usable_hosts(range: IpNetwork) -> Box<dyn Iterator<Item = IpAddr> + Send> {
    match range {
        IpNetwork::V4(net) => {
            let network = net.network();
            let broadcast = net.broadcast();
            let skip_edges = net.prefix() < 31;
            Box::new(
                net.iter()
                    .filter(move |ip| !skip_edges || (*ip != network && *ip != broadcast))
                    .map(IpAddr::V4),
            )
        }
        IpNetwork::V6(net) => {
            let network = net.network();
            let skip_edges = net.prefix() < 127;
            Box::new(
                net.iter()
                    .filter(move |ip| !skip_edges || *ip != network)
                    .map(IpAddr::V6),
            )
        }
    }
}

fn take_host(hosts: &mut dyn Iterator<Item = IpAddr>, range: &str) -> Result<String> {
    hosts
        .next()
        .map(|ip| ip.to_string())
        .ok_or_else(|| Error::Conflict(format!("address range {} is exhausted", range)))
}

fn next_free<'a>(range: &str, taken: impl Iterator<Item = &'a String>) -> Result<String> {
    let taken: HashSet<&str> = taken.map(String::as_str).collect();
    let mut hosts = usable_hosts(require_range(range)?).filter(|ip| !taken.contains(ip.to_string().as_str()));
    take_host(&mut hosts, range)
}
