//! HS256 user tokens

use crate::ports::{CredentialResolver, UserClaims};
use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use netmesh_common::{now_unix, Error, Result};
use serde::{Deserialize, Serialize};

/// Default lifetime of issued user tokens (24 hours)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Claims carried by a user token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub username: String,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub exp: i64,
}

/// Resolves user tokens signed with a shared HMAC secret
pub struct JwtCredentialResolver {
    jwt_secret: String,
    operator_secret: String,
    ttl_secs: i64,
}

impl JwtCredentialResolver {
    pub fn new(jwt_secret: impl Into<String>, operator_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            operator_secret: operator_secret.into(),
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }

    pub fn with_ttl(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Sign a token for `username`
    pub fn issue_token(&self, username: &str, networks: &[String], is_admin: bool) -> Result<String> {
        let claims = TokenClaims {
            username: username.to_string(),
            networks: networks.to_vec(),
            is_admin,
            exp: now_unix() + self.ttl_secs,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| Error::Internal(format!("failed to sign token: {}", e)))
    }
}

#[async_trait]
impl CredentialResolver for JwtCredentialResolver {
    async fn resolve_user_token(&self, token: &str) -> Result<UserClaims> {
        if token.is_empty() {
            return Err(Error::InvalidCredential("empty token".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| Error::InvalidCredential(e.to_string()))?;

        Ok(UserClaims {
            identity: data.claims.username,
            networks: data.claims.networks,
            is_admin: data.claims.is_admin,
        })
    }

    fn operator_secret(&self) -> String {
        self.operator_secret.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_and_resolve() {
        let resolver = JwtCredentialResolver::new("jwt-secret", "master");
        let token = resolver
            .issue_token("alice", &["net1".to_string()], false)
            .unwrap();

        let claims = resolver.resolve_user_token(&token).await.unwrap();
        assert_eq!(claims.identity, "alice");
        assert_eq!(claims.networks, vec!["net1"]);
        assert!(!claims.is_admin);
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let issuer = JwtCredentialResolver::new("one", "master");
        let verifier = JwtCredentialResolver::new("two", "master");
        let token = issuer.issue_token("alice", &[], true).unwrap();
        assert!(verifier.resolve_user_token(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let resolver = JwtCredentialResolver::new("jwt-secret", "master").with_ttl(-60);
        let token = resolver.issue_token("alice", &[], false).unwrap();
        assert!(resolver.resolve_user_token(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_garbage_rejected() {
        let resolver = JwtCredentialResolver::new("jwt-secret", "master");
        assert!(resolver.resolve_user_token("not.a.jwt").await.is_err());
        assert!(resolver.resolve_user_token("").await.is_err());
    }
}
