pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;
pub mod token_store;

pub use jwt::{Claims, JwtConfigError, JwtTokenProvider, TokenKind};
pub use password::{PasswordHashError, PasswordHasher};
pub use service::{AuthError, AuthService, AuthServiceImpl, AuthenticatedUser};
pub use token_store::{
    InMemoryTokenStore, RedisTokenStore, TokenStore, TokenStoreError,
};
