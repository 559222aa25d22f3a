use std::sync::Arc;
use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Lifetime of issued client tokens
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 24 * 60 * 60);

/// Bearer token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Client name
    pub sub: String,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

/// HS256 signing and verification keys derived from the shared secret
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issues a token for `subject` valid for `ttl`
    pub fn issue_token(&self, subject: &str, ttl: Duration) -> AppResult<String> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::Internal(format!("invalid token lifetime: {}", e)))?;
        let claims = Claims {
            sub: subject.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Checks signature and expiry and returns the claims
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AppError::Unauthorized("Could not validate credentials".to_string())
            })
    }
}

/// A caller that presented a valid bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    pub name: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedClient
where
    Arc<JwtKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        let keys = Arc::<JwtKeys>::from_ref(state);
        let claims = keys.verify(token)?;

        Ok(AuthenticatedClient { name: claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_issued_token_verifies() {
        let keys = JwtKeys::from_secret("test-secret");
        let token = assert_ok!(keys.issue_token("frontend", DEFAULT_TOKEN_TTL));

        let claims = assert_ok!(keys.verify(&token));
        assert_eq!(claims.sub, "frontend");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = JwtKeys::from_secret("one")
            .issue_token("frontend", DEFAULT_TOKEN_TTL)
            .unwrap();

        let result = JwtKeys::from_secret("two").verify(&token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let keys = JwtKeys::from_secret("test-secret");
        let claims = Claims {
            sub: "frontend".to_string(),
            exp: Utc::now().timestamp() - 60,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).unwrap();

        assert!(matches!(keys.verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let keys = JwtKeys::from_secret("test-secret");
        assert_err!(keys.verify("not-a-jwt"));
    }
}
