use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use greencloud_model::{
    AuthTokens, NewUser, Role, SignInRequest, SignUpRequest, User,
    UserProfile,
};
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::jwt::JwtTokenProvider;
use super::password::{PasswordHashError, PasswordHasher};
use super::token_store::{TokenStore, TokenStoreError};
use crate::users::{RepositoryError, UserRepository};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email already used")]
    DuplicateEmail,
    #[error("invalid email or password")]
    BadCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("user not found")]
    UserNotFound,
    #[error("user storage failed: {0}")]
    Repository(#[source] RepositoryError),
    #[error("token storage failed: {0}")]
    TokenStore(#[from] TokenStoreError),
    #[error(transparent)]
    Password(#[from] PasswordHashError),
    #[error("{0}")]
    Internal(String),
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateEmail => AuthError::DuplicateEmail,
            other => AuthError::Repository(other),
        }
    }
}

/// Principal resolved from a valid access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_up(&self, request: SignUpRequest) -> Result<(), AuthError>;

    async fn sign_in(
        &self,
        request: SignInRequest,
    ) -> Result<AuthTokens, AuthError>;

    /// Exchanges a refresh token for a new pair. The presented token must be
    /// the one currently stored for the user; it is replaced on success.
    async fn refresh(&self, refresh_token: &str)
    -> Result<AuthTokens, AuthError>;

    /// Best effort. Revokes the user's refresh token and blacklists the
    /// access token for the rest of its lifetime; failures are logged only.
    async fn logout(&self, access_token: &str, refresh_token: &str);

    async fn is_email_available(&self, email: &str)
    -> Result<bool, AuthError>;

    async fn authenticate(
        &self,
        access_token: &str,
    ) -> Result<AuthenticatedUser, AuthError>;

    async fn current_user(&self, user_id: i64)
    -> Result<UserProfile, AuthError>;
}

pub struct AuthServiceImpl {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenStore>,
    jwt: JwtTokenProvider,
    hasher: Arc<PasswordHasher>,
}

impl fmt::Debug for AuthServiceImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthServiceImpl")
            .field("jwt", &self.jwt)
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

impl AuthServiceImpl {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenStore>,
        jwt: JwtTokenProvider,
        hasher: Arc<PasswordHasher>,
    ) -> Self {
        Self {
            users,
            tokens,
            jwt,
            hasher,
        }
    }

    async fn issue_tokens(&self, user: &User) -> Result<AuthTokens, AuthError> {
        let access =
            self.jwt
                .generate_access_token(user.id, &user.email, user.role)?;
        let refresh = self.jwt.generate_refresh_token(user.id)?;
        self.tokens
            .store_refresh(user.id, &refresh, self.jwt.refresh_ttl())
            .await?;
        Ok(AuthTokens::bearer(access, refresh))
    }

    async fn hash_password(
        &self,
        password: String,
    ) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| AuthError::Internal(err.to_string()))?
            .map_err(AuthError::from)
    }

    async fn verify_password(
        &self,
        password: String,
        hash: String,
    ) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|err| AuthError::Internal(err.to_string()))?
            .map_err(AuthError::from)
    }

    async fn verify_decoy(&self, password: String) {
        let hasher = Arc::clone(&self.hasher);
        let outcome =
            tokio::task::spawn_blocking(move || hasher.verify_decoy(&password))
                .await;
        if !matches!(outcome, Ok(Ok(false))) {
            warn!("decoy password check did not complete");
        }
    }

    async fn revoke_refresh_token(&self, refresh_token: &str) {
        let Ok(claims) = self.jwt.parse_claims(refresh_token) else {
            return;
        };
        if !claims.is_refresh() {
            return;
        }
        let Ok(user_id) = claims.user_id() else {
            return;
        };
        if let Err(err) = self.tokens.revoke_refresh(user_id).await {
            warn!(user_id, error = %err, "failed to revoke refresh token");
        }
    }

    async fn blacklist_access_token(&self, access_token: &str) {
        let Ok(claims) = self.jwt.parse_claims(access_token) else {
            return;
        };
        let remaining = claims.remaining_seconds();
        if remaining == 0 {
            return;
        }
        let digest = self.hasher.digest_token(access_token);
        if let Err(err) = self
            .tokens
            .blacklist_access(&digest, Duration::from_secs(remaining))
            .await
        {
            warn!(error = %err, "failed to blacklist access token");
        }
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    async fn sign_up(&self, request: SignUpRequest) -> Result<(), AuthError> {
        if self.users.exists_by_email(&request.email).await? {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hash_password(request.password).await?;
        let user = self
            .users
            .create(NewUser::new(request.username, request.email, password_hash))
            .await?;

        info!(user_id = user.id, "user signed up");
        Ok(())
    }

    async fn sign_in(
        &self,
        request: SignInRequest,
    ) -> Result<AuthTokens, AuthError> {
        let Some(user) = self.users.find_by_email(&request.email).await? else {
            self.verify_decoy(request.password).await;
            return Err(AuthError::BadCredentials);
        };

        if !self
            .verify_password(request.password, user.password_hash.clone())
            .await?
        {
            debug!(user_id = user.id, "password mismatch");
            return Err(AuthError::BadCredentials);
        }

        let tokens = self.issue_tokens(&user).await?;
        self.users.record_login(user.id).await?;

        info!(user_id = user.id, "user signed in");
        Ok(tokens)
    }

    async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<AuthTokens, AuthError> {
        let claims = self.jwt.parse_claims(refresh_token)?;
        if !claims.is_refresh() {
            return Err(AuthError::InvalidToken);
        }
        let user_id = claims.user_id()?;

        let stored = self.tokens.find_refresh(user_id).await?;
        if stored.as_deref() != Some(refresh_token) {
            debug!(user_id, "refresh token not current");
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let tokens = self.issue_tokens(&user).await?;
        debug!(user_id, "rotated refresh token");
        Ok(tokens)
    }

    async fn logout(&self, access_token: &str, refresh_token: &str) {
        self.revoke_refresh_token(refresh_token).await;
        self.blacklist_access_token(access_token).await;
    }

    async fn is_email_available(
        &self,
        email: &str,
    ) -> Result<bool, AuthError> {
        Ok(!self.users.exists_by_email(email).await?)
    }

    async fn authenticate(
        &self,
        access_token: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let digest = self.hasher.digest_token(access_token);
        if self.tokens.is_blacklisted(&digest).await? {
            return Err(AuthError::InvalidToken);
        }

        let claims = self.jwt.parse_claims(access_token)?;
        if claims.is_refresh() {
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .users
            .find_by_id(claims.user_id()?)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        Ok(AuthenticatedUser::from(&user))
    }

    async fn current_user(
        &self,
        user_id: i64,
    ) -> Result<UserProfile, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|user| user.profile())
            .ok_or(AuthError::UserNotFound)
    }
}
