use std::fmt;
use std::sync::Arc;

use crate::auth::{AuthService, TokenStore};
use crate::users::UserRepository;

/// Shared handles for handlers and middleware. Every field is a trait
/// object so tests can swap in mocks or in-memory stores.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthService>,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenStore>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        auth: Arc<dyn AuthService>,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            auth,
            users,
            tokens,
        }
    }
}
