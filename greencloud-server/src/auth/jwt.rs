use std::fmt;
use std::time::Duration;

use chrono::Utc;
use greencloud_model::Role;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::service::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Registered claims plus the identity fields carried by access tokens.
/// Refresh tokens omit `email` and `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub typ: TokenKind,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }

    pub fn is_refresh(&self) -> bool {
        self.typ == TokenKind::Refresh
    }

    /// Seconds until expiry, clamped at zero.
    pub fn remaining_seconds(&self) -> u64 {
        u64::try_from(self.exp - Utc::now().timestamp()).unwrap_or(0)
    }
}

#[derive(Debug, Error)]
pub enum JwtConfigError {
    #[error("token lifetime must be greater than zero")]
    ZeroLifetime,
    #[error("signing key must be at least {min} bytes, got {actual}")]
    ShortKey { min: usize, actual: usize },
}

/// Issues and verifies HS256 tokens with a single shared secret.
#[derive(Clone)]
pub struct JwtTokenProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for JwtTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtTokenProvider")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtTokenProvider {
    pub const MIN_KEY_BYTES: usize = 32;

    pub fn new(
        secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<Self, JwtConfigError> {
        if secret.len() < Self::MIN_KEY_BYTES {
            return Err(JwtConfigError::ShortKey {
                min: Self::MIN_KEY_BYTES,
                actual: secret.len(),
            });
        }
        if access_ttl.is_zero() || refresh_ttl.is_zero() {
            return Err(JwtConfigError::ZeroLifetime);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn generate_access_token(
        &self,
        user_id: i64,
        email: &str,
        role: Role,
    ) -> Result<String, AuthError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat,
            exp: iat + ttl_seconds(self.access_ttl),
            email: Some(email.to_string()),
            role: Some(role.as_str().to_string()),
            typ: TokenKind::Access,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    pub fn generate_refresh_token(
        &self,
        user_id: i64,
    ) -> Result<String, AuthError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat,
            exp: iat + ttl_seconds(self.refresh_ttl),
            email: None,
            role: None,
            typ: TokenKind::Refresh,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    /// Verifies signature and expiry. Any failure is reported as
    /// [`AuthError::InvalidToken`].
    pub fn parse_claims(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!(error = %err, "rejected bearer token");
                AuthError::InvalidToken
            })
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|err| AuthError::Internal(err.to_string()))
    }
}

fn ttl_seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2)
}

#[cfg(test)]
pub(crate) fn test_provider() -> JwtTokenProvider {
    JwtTokenProvider::new(
        &[42u8; 32],
        Duration::from_secs(1800),
        Duration::from_secs(1_209_600),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_carries_identity_claims() {
        let provider = test_provider();
        let token = provider
            .generate_access_token(7, "kim@example.com", Role::Admin)
            .unwrap();
        let claims = provider.parse_claims(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.email.as_deref(), Some("kim@example.com"));
        assert_eq!(claims.role.as_deref(), Some("ADMIN"));
        assert_eq!(claims.typ, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn refresh_token_is_marked_and_unique() {
        let provider = test_provider();
        let first = provider.generate_refresh_token(7).unwrap();
        let second = provider.generate_refresh_token(7).unwrap();
        assert_ne!(first, second);

        let claims = provider.parse_claims(&first).unwrap();
        assert!(claims.is_refresh());
        assert!(claims.email.is_none());
        assert_eq!(claims.exp - claims.iat, 1_209_600);
    }

    #[test]
    fn rejects_foreign_signature() {
        let other = JwtTokenProvider::new(
            &[1u8; 32],
            Duration::from_secs(60),
            Duration::from_secs(60),
        )
        .unwrap();
        let token = other.generate_refresh_token(1).unwrap();
        assert!(matches!(
            test_provider().parse_claims(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn rejects_expired_and_malformed_tokens() {
        let provider = test_provider();
        let now = Utc::now().timestamp();
        let expired = Claims {
            sub: "1".into(),
            iat: now - 120,
            exp: now - 60,
            email: None,
            role: None,
            typ: TokenKind::Refresh,
            jti: "j".into(),
        };
        let token = provider.sign(&expired).unwrap();
        assert!(matches!(
            provider.parse_claims(&token),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            provider.parse_claims("not.a.jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn short_keys_are_refused() {
        assert!(matches!(
            JwtTokenProvider::new(
                b"short",
                Duration::from_secs(1),
                Duration::from_secs(1)
            ),
            Err(JwtConfigError::ShortKey { .. })
        ));
    }

    #[test]
    fn remaining_seconds_never_negative() {
        let claims = Claims {
            sub: "1".into(),
            iat: 0,
            exp: 10,
            email: None,
            role: None,
            typ: TokenKind::Access,
            jti: "j".into(),
        };
        assert_eq!(claims.remaining_seconds(), 0);
    }
}
