//! Authentication for the `NoteShare` server.
//!
//! Provides bearer token issuance/validation and password hashing.

pub mod claims;
pub mod jwt;
pub mod password;

pub use claims::Claims;
pub use jwt::{IssuedToken, JwtManager};

/// Failures inside the auth primitives.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Hashing task aborted: {0}")]
    Join(String),
}
