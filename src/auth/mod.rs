//! Authentication and authorization core.

pub mod guard;
pub mod password;
pub mod service;
pub mod token;
pub mod validation;

pub use guard::{ensure_owner, require_access_token, AuthenticatedSubject, Owned};
pub use password::CredentialVerifier;
pub use service::{AuthConfig, AuthError, AuthService, TokenPair};
pub use token::{TokenClaims, TokenClass, TokenCodec, TokenError};
