//! Authentication for the storefront services.
//!
//! Passwords are stored as argon2 PHC strings. A successful login issues an
//! opaque session token that is stored server-side with an expiry; every
//! other service treats the token as an opaque string and asks an
//! [`IdentityVerifier`] who it belongs to.

pub mod error;
pub mod identity;
pub mod password;
pub mod service;

pub use error::AuthError;
pub use identity::{IdentityVerifier, RemoteIdentityVerifier};
pub use service::{AuthService, DEFAULT_SESSION_TTL, LoginOutcome};
