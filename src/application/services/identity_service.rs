//! Identity Service
//!
//! Resolves a presented bearer credential into a user id. Tokens are issued
//! elsewhere; this service only verifies them and tracks revocations.

use async_trait::async_trait;
use dashmap::DashSet;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;

/// Identity resolver trait
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Map a credential to the user id it was issued for.
    async fn resolve(&self, credential: &str) -> Result<i64, IdentityError>;
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// JWT ID for token revocation tracking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Identity errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid token")]
    Malformed,

    #[error("Token expired")]
    Expired,

    #[error("Token revoked")]
    Revoked,
}

/// HS256 JWT resolver with an in-process revocation list.
pub struct JwtIdentityResolver {
    decoding_key: DecodingKey,
    validation: Validation,
    revoked_ids: DashSet<String>,
}

impl JwtIdentityResolver {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            revoked_ids: DashSet::new(),
        }
    }

    /// Resolver for the configured secret, refusing the configured JWT IDs.
    pub fn from_settings(settings: &JwtSettings) -> Self {
        let resolver = Self::new(&settings.secret);
        for jti in &settings.revoked_token_ids {
            resolver.revoke_jti(jti.trim());
        }
        if !settings.revoked_token_ids.is_empty() {
            tracing::info!(count = resolver.revoked_ids.len(), "Loaded revoked token IDs");
        }
        resolver
    }

    /// Reject every token carrying this JWT ID from now on.
    pub fn revoke_jti(&self, jti: &str) {
        self.revoked_ids.insert(jti.to_string());
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, IdentityError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::Expired,
                _ => IdentityError::Malformed,
            })?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, credential: &str) -> Result<i64, IdentityError> {
        let claims = self.decode_claims(credential)?;

        if let Some(jti) = &claims.jti {
            if self.revoked_ids.contains(jti) {
                return Err(IdentityError::Revoked);
            }
        }

        claims
            .sub
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or(IdentityError::Malformed)
    }
}
