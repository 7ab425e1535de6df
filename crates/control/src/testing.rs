//! Test doubles for the collaborator traits

use crate::adapters::SqliteNetworkStore;
use crate::ports::{
    AddressPlanner, CredentialResolver, DependentCounter, NetworkStore, SecretGenerator, UserClaims,
};
use async_trait::async_trait;
use netmesh_common::{Database, Error, Network, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

pub fn memory_store() -> Arc<SqliteNetworkStore> {
    Arc::new(SqliteNetworkStore::new(
        Database::open_memory().expect("in-memory database"),
    ))
}

/// Store a network with defaults applied
pub async fn seed_network(store: &SqliteNetworkStore, net_id: &str, range: &str) -> Network {
    let mut network = Network {
        net_id: net_id.to_string(),
        address_range: range.to_string(),
        ..Default::default()
    };
    network.set_defaults();
    store.put_merged(net_id, &network).await.expect("seed network");
    network
}

/// Resolver with a fixed operator secret and a table of known user tokens
pub struct StaticResolver {
    secret: String,
    users: HashMap<String, UserClaims>,
}

impl StaticResolver {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            users: HashMap::new(),
        }
    }

    pub fn with_user(mut self, token: &str, identity: &str, networks: &[&str], is_admin: bool) -> Self {
        self.users.insert(
            token.to_string(),
            UserClaims {
                identity: identity.to_string(),
                networks: networks.iter().map(|n| n.to_string()).collect(),
                is_admin,
            },
        );
        self
    }
}

#[async_trait]
impl CredentialResolver for StaticResolver {
    async fn resolve_user_token(&self, token: &str) -> Result<UserClaims> {
        self.users
            .get(token)
            .cloned()
            .ok_or_else(|| Error::InvalidCredential("unknown token".to_string()))
    }

    fn operator_secret(&self) -> String {
        self.secret.clone()
    }
}

/// Planner that records every call and optionally fails
#[derive(Default)]
pub struct RecordingPlanner {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingPlanner {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().push(call);
        if self.fail {
            Err(Error::Internal("planner unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AddressPlanner for RecordingPlanner {
    async fn reassign_addresses(&self, net_id: &str) -> Result<()> {
        self.record(format!("addresses:{}", net_id))
    }

    async fn reassign_local_addresses(&self, net_id: &str) -> Result<()> {
        self.record(format!("local:{}", net_id))
    }
}

/// Dependent counter returning a settable node count
#[derive(Default)]
pub struct FixedDependents(AtomicU64);

impl FixedDependents {
    pub fn new(count: u64) -> Self {
        Self(AtomicU64::new(count))
    }

    pub fn set(&self, count: u64) {
        self.0.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl DependentCounter for FixedDependents {
    async fn count_nodes_in(&self, _net_id: &str) -> Result<u64> {
        Ok(self.0.load(Ordering::SeqCst))
    }
}

/// Store wrapper counting writes and deletes
pub struct CountingStore {
    inner: Arc<dyn NetworkStore>,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn NetworkStore>) -> Self {
        Self {
            inner,
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkStore for CountingStore {
    async fn get(&self, net_id: &str) -> Result<Network> {
        self.inner.get(net_id).await
    }

    async fn list(&self) -> Result<Vec<Network>> {
        self.inner.list().await
    }

    async fn put_merged(&self, net_id: &str, network: &Network) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_merged(net_id, network).await
    }

    async fn delete(&self, net_id: &str) -> Result<u64> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(net_id).await
    }

    async fn exists_by_id(&self, net_id: &str) -> Result<bool> {
        self.inner.exists_by_id(net_id).await
    }

    async fn exists_by_display_name(&self, display_name: &str) -> Result<bool> {
        self.inner.exists_by_display_name(display_name).await
    }
}

/// Secret generator with predictable output
pub struct FixedSecrets {
    pub name: String,
    pub secret: String,
}

impl FixedSecrets {
    pub fn new(name: &str, secret: &str) -> Self {
        Self {
            name: name.to_string(),
            secret: secret.to_string(),
        }
    }
}

impl SecretGenerator for FixedSecrets {
    fn gen_name(&self) -> String {
        self.name.clone()
    }

    fn gen_secret(&self) -> String {
        self.secret.clone()
    }
}
