//! Bearer-JWT verification.
//!
//! The gateway verifies HS256 tokens and hands the core an
//! authenticated `Principal`. Credential storage and password hashing
//! live outside this system; deployments front the gateway with an
//! identity provider that mints compatible tokens. `mint` exists for
//! operational tooling and tests.

use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use ordergate_core::{Principal, Role};

use crate::error::{ApiError, ApiResult};

/// Auth configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret shared with the identity provider.
    pub secret: String,
    /// Token lifetime for minted tokens.
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
}

fn default_token_ttl_minutes() -> i64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // Placeholder for local development only.
            secret: "ordergate-dev-secret-change-in-production".to_string(),
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }
}

/// JWT claims carried by gateway tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    /// Granted role.
    pub role: Role,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Verifies bearer tokens and mints tokens for tooling.
pub struct AuthVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl AuthVerifier {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation: Validation::default(),
            token_ttl: Duration::minutes(config.token_ttl_minutes),
        }
    }

    /// Extract and verify the bearer token from request headers.
    pub fn verify_bearer(&self, headers: &HeaderMap) -> ApiResult<Principal> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Auth("missing bearer token".to_string()))?;

        self.verify(token)
    }

    /// Verify a raw token and build the principal.
    pub fn verify(&self, token: &str) -> ApiResult<Principal> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            warn!(error = %e, "token rejected");
            ApiError::Auth(format!("invalid token: {e}"))
        })?;

        if data.claims.sub.is_empty() {
            return Err(ApiError::Auth("token has empty subject".to_string()));
        }

        Ok(Principal::new(data.claims.sub, data.claims.role))
    }

    /// Mint a token for the given identity.
    pub fn mint(&self, user_id: &str, role: Role) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
    }
}
