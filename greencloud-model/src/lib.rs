//! Shared data types for the GreenCloud server.
//!
//! Everything in this crate is plain data: request/response bodies, the
//! persisted user shape, and the validation rules applied to incoming
//! requests. No I/O happens here so the types can be reused by clients and
//! tests without pulling in the server stack.

pub mod api;
pub mod auth;
pub mod user;
pub mod validation;

pub use api::ApiResponse;
pub use auth::{
    AuthTokens, EmailAvailability, LogoutRequest, SignInRequest, SignUpRequest,
};
pub use user::{NewUser, Role, RoleError, User, UserProfile};
pub use validation::{FieldErrors, Validate};
