//! Interfaces to the collaborators the control plane depends on.
//!
//! Storage, credential resolution, address planning and secret generation
//! are provided from outside; default implementations live in
//! [`crate::adapters`].

use async_trait::async_trait;
use netmesh_common::{Error, Network, Result};
use std::future::Future;
use std::time::Duration;

/// Persistence for network records, keyed by net ID
#[async_trait]
pub trait NetworkStore: Send + Sync {
    /// Load a network; absent networks are `Error::NotFound`
    async fn get(&self, net_id: &str) -> Result<Network>;

    async fn list(&self) -> Result<Vec<Network>>;

    /// Atomically replace the whole record stored under `net_id`
    async fn put_merged(&self, net_id: &str, network: &Network) -> Result<()>;

    /// Delete a record, returning the number of records removed
    async fn delete(&self, net_id: &str) -> Result<u64>;

    async fn exists_by_id(&self, net_id: &str) -> Result<bool>;

    async fn exists_by_display_name(&self, display_name: &str) -> Result<bool>;
}

/// Identity carried by a resolved user token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserClaims {
    pub identity: String,
    pub networks: Vec<String>,
    pub is_admin: bool,
}

/// Resolves user tokens and exposes the operator secret
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve_user_token(&self, token: &str) -> Result<UserClaims>;

    fn operator_secret(&self) -> String;
}

/// Re-derives node addresses after a network's ranges change
#[async_trait]
pub trait AddressPlanner: Send + Sync {
    async fn reassign_addresses(&self, net_id: &str) -> Result<()>;

    async fn reassign_local_addresses(&self, net_id: &str) -> Result<()>;
}

/// Counts resources that depend on a network
#[async_trait]
pub trait DependentCounter: Send + Sync {
    async fn count_nodes_in(&self, net_id: &str) -> Result<u64>;
}

/// Source of generated key names and secrets
pub trait SecretGenerator: Send + Sync {
    fn gen_name(&self) -> String;

    fn gen_secret(&self) -> String;
}

/// Time bound applied to every collaborator call.
///
/// The timer is dropped on every exit path, and failures come back wrapped
/// with the calling operation's context.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    limit: Duration,
}

impl Deadline {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub async fn run<T, F>(&self, context: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result.map_err(|e| Error::upstream(context, e)),
            Err(_) => Err(Error::upstream(
                context,
                Error::Timeout {
                    seconds: self.limit.as_secs(),
                },
            )),
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmesh_common::ErrorKind;

    #[tokio::test]
    async fn test_deadline_passes_value_through() {
        let deadline = Deadline::default();
        let value = deadline.run("answer", async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_deadline_times_out() {
        let deadline = Deadline::new(Duration::from_millis(20));
        let result: Result<()> = deadline
            .run("slow store", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(err.to_string().starts_with("slow store"));
    }

    #[tokio::test]
    async fn test_deadline_wraps_failures_with_context() {
        let deadline = Deadline::default();
        let result: Result<()> = deadline
            .run("persist network net1", async {
                Err(Error::Internal("disk full".to_string()))
            })
            .await;

        match result {
            Err(Error::Upstream { context, .. }) => assert_eq!(context, "persist network net1"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
