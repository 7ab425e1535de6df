//! Default collaborator implementations backed by the local database

mod jwt;
mod secrets;
mod sqlite;

pub use jwt::{JwtCredentialResolver, TokenClaims};
pub use secrets::RandomSecretGenerator;
pub use sqlite::{SqliteNetworkStore, SqliteNodeRegistry};
