//! Authorization gate.
//!
//! Every privileged request passes through [`AuthorizationGate::authorize`],
//! which decides who the caller is and which networks they may touch. The
//! gate never mutates state.
//!
//! Two credential kinds are accepted:
//! - the operator secret, a single shared key granting unrestricted access
//! - user tokens, resolved to an identity, an admin flag and a network list

use crate::ports::{CredentialResolver, Deadline, NetworkStore, UserClaims};
use netmesh_common::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Identity reported for callers holding the operator secret
pub const OPERATOR_IDENTITY: &str = "operator";

/// A credential presented by a caller
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    OperatorSecret,
    UserToken(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OperatorSecret => write!(f, "OperatorSecret"),
            Self::UserToken(_) => write!(f, "UserToken(..)"),
        }
    }
}

/// The set of networks a caller may see or modify
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkScope {
    /// Every network, including ones created later
    Unrestricted,
    /// Computed, and empty
    Denied,
    Only(BTreeSet<String>),
}

impl NetworkScope {
    /// Scope for an explicit grant list; an empty list becomes `Denied`
    pub fn from_grants<I, S>(grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = grants
            .into_iter()
            .map(Into::into)
            .filter(|n: &String| !n.is_empty())
            .collect();
        if names.is_empty() {
            Self::Denied
        } else {
            Self::Only(names)
        }
    }

    pub fn permits(&self, net_id: &str) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Denied => false,
            Self::Only(names) => names.contains(net_id),
        }
    }
}

/// Result of a successful authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedScope {
    pub identity: String,
    pub networks: NetworkScope,
}

impl AuthorizedScope {
    pub fn operator() -> Self {
        Self {
            identity: OPERATOR_IDENTITY.to_string(),
            networks: NetworkScope::Unrestricted,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.networks == NetworkScope::Unrestricted
    }

    pub fn permits(&self, net_id: &str) -> bool {
        self.networks.permits(net_id)
    }

    pub fn ensure_permits(&self, net_id: &str) -> Result<()> {
        if self.permits(net_id) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "You are unauthorized to access network {}",
                net_id
            )))
        }
    }

    pub fn ensure_unrestricted(&self) -> Result<()> {
        if self.is_unrestricted() {
            Ok(())
        } else {
            Err(Error::Forbidden(
                "You are unauthorized to access this endpoint".to_string(),
            ))
        }
    }
}

/// Operations the control plane exposes, with their privilege requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListNetworks,
    CreateNetwork,
    GetNetwork,
    UpdateNetwork,
    UpdateNodeLimit,
    DeleteNetwork,
    KeyUpdate,
    AlertNetwork,
    CreateAccessKey,
    ListAccessKeys,
    DeleteAccessKey,
    SignupToken,
    ManageNodes,
    IssueUserToken,
}

impl Operation {
    /// Whether the operation needs the operator secret or an admin user
    pub fn requires_operator(self) -> bool {
        matches!(
            self,
            Self::CreateNetwork
                | Self::UpdateNodeLimit
                | Self::DeleteNetwork
                | Self::IssueUserToken
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ListNetworks => "list_networks",
            Self::CreateNetwork => "create_network",
            Self::GetNetwork => "get_network",
            Self::UpdateNetwork => "update_network",
            Self::UpdateNodeLimit => "update_node_limit",
            Self::DeleteNetwork => "delete_network",
            Self::KeyUpdate => "key_update",
            Self::AlertNetwork => "alert_network",
            Self::CreateAccessKey => "create_access_key",
            Self::ListAccessKeys => "list_access_keys",
            Self::DeleteAccessKey => "delete_access_key",
            Self::SignupToken => "signup_token",
            Self::ManageNodes => "manage_nodes",
            Self::IssueUserToken => "issue_user_token",
        }
    }
}

/// Extract the token from an `Authorization` header value.
///
/// Anything other than `Bearer <token>` yields an empty token, which never
/// matches the operator secret and never resolves as a user token.
pub fn bearer_token(header: Option<&str>) -> &str {
    header
        .and_then(|h| h.split_once(' '))
        .map(|(_, token)| token.trim())
        .unwrap_or("")
}

/// Outcome of verifying a raw credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifiedCaller {
    Operator,
    User(UserClaims),
}

/// Checks operator secrets and resolves user tokens
pub struct CredentialVerifier {
    resolver: Arc<dyn CredentialResolver>,
    deadline: Deadline,
}

impl CredentialVerifier {
    pub fn new(resolver: Arc<dyn CredentialResolver>, deadline: Deadline) -> Self {
        Self { resolver, deadline }
    }

    /// Tag a raw credential. Only an exact match of a configured, non-empty
    /// operator secret counts as the operator secret.
    pub fn classify(&self, raw: &str) -> Credential {
        let secret = self.resolver.operator_secret();
        if !secret.is_empty() && digest(raw) == digest(&secret) {
            Credential::OperatorSecret
        } else {
            Credential::UserToken(raw.to_string())
        }
    }

    pub async fn verify(&self, raw: &str) -> Result<VerifiedCaller> {
        match self.classify(raw) {
            Credential::OperatorSecret => Ok(VerifiedCaller::Operator),
            Credential::UserToken(token) => {
                let claims = self
                    .deadline
                    .run("resolve user token", self.resolver.resolve_user_token(&token))
                    .await
                    .map_err(|e| {
                        debug!("User token rejected: {}", e);
                        Error::InvalidCredential("Error verifying user token".to_string())
                    })?;
                Ok(VerifiedCaller::User(claims))
            }
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Produces an [`AuthorizedScope`] for a request or rejects it
pub struct AuthorizationGate {
    verifier: CredentialVerifier,
    store: Arc<dyn NetworkStore>,
    deadline: Deadline,
}

impl AuthorizationGate {
    pub fn new(verifier: CredentialVerifier, store: Arc<dyn NetworkStore>, deadline: Deadline) -> Self {
        Self {
            verifier,
            store,
            deadline,
        }
    }

    /// Authorize a request.
    ///
    /// A named target network that does not exist is reported as `NotFound`
    /// before the credential is looked at.
    pub async fn authorize(
        &self,
        require_operator: bool,
        target_network: Option<&str>,
        credential: &str,
    ) -> Result<AuthorizedScope> {
        if let Some(net_id) = target_network.filter(|n| !n.is_empty()) {
            let exists = self
                .deadline
                .run("check network existence", self.store.exists_by_id(net_id))
                .await?;
            if !exists {
                warn!(network = %net_id, "Authorization rejected: network does not exist");
                return Err(Error::not_found("network", net_id));
            }
        }

        let scope = match self.verifier.verify(credential).await {
            Ok(VerifiedCaller::Operator) => AuthorizedScope::operator(),
            Ok(VerifiedCaller::User(claims)) => {
                if require_operator && !claims.is_admin {
                    warn!(user = %claims.identity, "Authorization rejected: admin required");
                    return Err(Error::Forbidden(
                        "You are unauthorized to access this endpoint".to_string(),
                    ));
                }
                let networks = if claims.is_admin {
                    NetworkScope::Unrestricted
                } else {
                    NetworkScope::from_grants(claims.networks)
                };
                AuthorizedScope {
                    identity: claims.identity,
                    networks,
                }
            }
            Err(e) => {
                warn!(kind = %e.kind(), "Authorization rejected: invalid credential");
                return Err(e);
            }
        };

        debug!(user = %scope.identity, scope = ?scope.networks, "Authorized request");
        Ok(scope)
    }
}
