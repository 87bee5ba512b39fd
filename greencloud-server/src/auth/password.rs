use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, ParamsBuilder, Version,
    password_hash::{
        self, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
        SaltString,
    },
};
use hmac::{Hmac, Mac};
use rand::{TryRngCore, rngs::OsRng};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Password hashing and token digests.
///
/// Passwords are hashed with Argon2id over `password || pepper` and stored as
/// PHC strings. Bearer tokens are never used as storage keys directly; the
/// HMAC-SHA-256 digest from [`PasswordHasher::digest_token`] is used instead.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    pepper: Zeroizing<Vec<u8>>,
    token_mac: HmacSha256,
    /// Hash of a random secret, verified when no account matches so unknown
    /// emails cost the same as wrong passwords.
    decoy_hash: String,
}

#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("password pepper must not be empty")]
    EmptyPepper,
    #[error("token digest key must not be empty")]
    EmptyTokenKey,
    #[error("invalid Argon2 parameters: {0}")]
    InvalidParams(String),
    #[error("password hashing error: {0}")]
    Hash(String),
}

impl From<password_hash::Error> for PasswordHashError {
    fn from(err: password_hash::Error) -> Self {
        PasswordHashError::Hash(err.to_string())
    }
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.argon2.params())
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
    const DEFAULT_ITERATIONS: u32 = 3;
    const DEFAULT_PARALLELISM: u32 = 1;
    const SALT_LENGTH: usize = password_hash::Salt::RECOMMENDED_LENGTH;

    pub fn new(
        pepper: impl AsRef<[u8]>,
        token_key: impl AsRef<[u8]>,
    ) -> Result<Self, PasswordHashError> {
        let params = ParamsBuilder::new()
            .m_cost(Self::DEFAULT_MEMORY_KIB)
            .t_cost(Self::DEFAULT_ITERATIONS)
            .p_cost(Self::DEFAULT_PARALLELISM)
            .output_len(32)
            .build()
            .map_err(|err| PasswordHashError::InvalidParams(err.to_string()))?;
        Self::with_params(pepper, token_key, params)
    }

    /// Cheaper parameters are useful in tests.
    pub fn with_params(
        pepper: impl AsRef<[u8]>,
        token_key: impl AsRef<[u8]>,
        params: Params,
    ) -> Result<Self, PasswordHashError> {
        let pepper = pepper.as_ref();
        if pepper.is_empty() {
            return Err(PasswordHashError::EmptyPepper);
        }

        let key = token_key.as_ref();
        if key.is_empty() {
            return Err(PasswordHashError::EmptyTokenKey);
        }
        let token_mac = HmacSha256::new_from_slice(key)
            .map_err(|_| PasswordHashError::EmptyTokenKey)?;

        let mut hasher = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::default(), params),
            pepper: Zeroizing::new(pepper.to_vec()),
            token_mac,
            decoy_hash: String::new(),
        };
        let mut decoy = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut decoy)
            .map_err(|err| PasswordHashError::Hash(err.to_string()))?;
        hasher.decoy_hash = hasher.hash(&hex::encode(decoy))?;
        Ok(hasher)
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordHashError> {
        let material = self.peppered(password);

        let mut salt_bytes = [0u8; Self::SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|err| PasswordHashError::Hash(err.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes)?;

        Ok(self.argon2.hash_password(&material, &salt)?.to_string())
    }

    /// Returns `Ok(false)` on mismatch; an unparseable stored hash is an error.
    pub fn verify(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, PasswordHashError> {
        let parsed = PasswordHash::new(password_hash)?;
        let material = self.peppered(password);
        Ok(self.argon2.verify_password(&material, &parsed).is_ok())
    }

    /// Runs a full verification that never succeeds.
    pub fn verify_decoy(&self, password: &str) -> Result<bool, PasswordHashError> {
        self.verify(password, &self.decoy_hash)
    }

    /// Hex HMAC-SHA-256 of a bearer token.
    pub fn digest_token(&self, token: &str) -> String {
        let mut mac = self.token_mac.clone();
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn peppered(&self, password: &str) -> Zeroizing<Vec<u8>> {
        let mut material = Zeroizing::new(Vec::with_capacity(
            password.len() + self.pepper.len(),
        ));
        material.extend_from_slice(password.as_bytes());
        material.extend_from_slice(&self.pepper);
        material
    }
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> PasswordHasher {
    let params = Params::new(8, 1, 1, None).unwrap();
    PasswordHasher::with_params("test-pepper", "test-token-key", params)
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_and_verifies_passwords() {
        let hasher = fast_hasher();
        let hash = hasher.hash("Secret#123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("Secret#123", &hash).unwrap());
        assert!(!hasher.verify("Secret#124", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = fast_hasher();
        let first = hasher.hash("Secret#123").unwrap();
        let second = hasher.hash("Secret#123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn pepper_participates_in_verification() {
        let params = Params::new(8, 1, 1, None).unwrap();
        let other =
            PasswordHasher::with_params("other-pepper", "key", params).unwrap();
        let hash = fast_hasher().hash("Secret#123").unwrap();
        assert!(!other.verify("Secret#123", &hash).unwrap());
    }

    #[test]
    fn decoy_never_matches() {
        let hasher = fast_hasher();
        assert!(hasher.decoy_hash.starts_with("$argon2id$"));
        assert!(!hasher.verify_decoy("Secret#123").unwrap());
        assert!(!hasher.verify_decoy("").unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(fast_hasher().verify("x", "not-a-phc-string").is_err());
    }

    #[test]
    fn token_digest_is_stable_hex() {
        let hasher = fast_hasher();
        let digest = hasher.digest_token("header.payload.sig");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, hasher.digest_token("header.payload.sig"));
        assert_ne!(digest, hasher.digest_token("header.payload.other"));
    }

    #[test]
    fn rejects_empty_secrets() {
        assert!(matches!(
            PasswordHasher::new("", "key"),
            Err(PasswordHashError::EmptyPepper)
        ));
        assert!(matches!(
            PasswordHasher::new("pepper", ""),
            Err(PasswordHashError::EmptyTokenKey)
        ));
    }
}
