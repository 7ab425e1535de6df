//! NetMesh control plane
//!
//! Authorization, merge-patch updates, guarded deletion and access key
//! management for NetMesh networks. Persistence, address planning, token
//! resolution and secret generation sit behind the traits in [`ports`];
//! [`adapters`] provides implementations on the shared SQLite database.

pub mod access_keys;
pub mod adapters;
pub mod auth;
pub mod coordinator;
pub mod merge;
pub mod ports;
pub mod service;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use access_keys::{AccessKeyManager, AccessKeyRequest, ConnectionInfo};
pub use auth::{
    bearer_token, AuthorizationGate, AuthorizedScope, Credential, CredentialVerifier,
    NetworkScope, Operation,
};
pub use coordinator::MutationCoordinator;
pub use merge::{merge, ChangeKind, ChangeSet, Merged};
pub use ports::{
    AddressPlanner, CredentialResolver, Deadline, DependentCounter, NetworkStore,
    SecretGenerator, UserClaims,
};
pub use service::ControlPlane;
