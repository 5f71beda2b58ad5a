//! Service-level error taxonomy.
//!
//! Every variant carries a stable machine code; the HTTP layer maps each to a
//! status and renders `{"error": code, "message": text}`.

use noteshare_core::db::DatabaseError;

use crate::auth::AuthError;
use crate::blob::BlobError;
use crate::delivery::DeliveryError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Conflict(String),

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Invalid or expired OTP")]
    InvalidOrExpired,

    #[error("OTP has not been verified")]
    OtpNotVerified,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing or invalid bearer token")]
    Unauthorized,

    #[error("Price must be 0 (free) or between 1 and 100")]
    InvalidPrice,

    #[error("You can only upload 2 free notes out of every 10")]
    QuotaExceeded,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Video and audio files are not allowed")]
    BlockedFileType,

    #[error("You already purchased this note")]
    AlreadyPurchased,

    #[error("Insufficient wallet balance")]
    InsufficientFunds,

    #[error("Code delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("File not found on server")]
    FileMissing,

    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl ServiceError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Conflict(_) => "conflict",
            Self::UsernameTaken => "username_taken",
            Self::InvalidOrExpired => "invalid_or_expired_otp",
            Self::OtpNotVerified => "otp_not_verified",
            Self::NotFound(_) => "not_found",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unauthorized => "unauthorized",
            Self::InvalidPrice => "invalid_price",
            Self::QuotaExceeded => "quota_exceeded",
            Self::InvalidInput(_) => "invalid_input",
            Self::BlockedFileType => "blocked_file_type",
            Self::AlreadyPurchased => "already_purchased",
            Self::InsufficientFunds => "insufficient_funds",
            Self::DeliveryFailed(_) => "delivery_failed",
            Self::FileMissing => "file_missing",
            Self::StorageFailure(_) => "storage_failure",
        }
    }

    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            DatabaseError::Conflict(msg) => Self::Conflict(msg),
            DatabaseError::Constraint(msg) => Self::InvalidInput(msg),
            other => Self::StorageFailure(other.to_string()),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Token(_) => Self::Unauthorized,
            other => Self::StorageFailure(other.to_string()),
        }
    }
}

impl From<DeliveryError> for ServiceError {
    fn from(e: DeliveryError) -> Self {
        Self::DeliveryFailed(e.to_string())
    }
}

impl From<BlobError> for ServiceError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::Blocked(_) => Self::BlockedFileType,
            BlobError::Missing(_) | BlobError::InvalidKey(_) => Self::FileMissing,
            BlobError::Io(e) => Self::StorageFailure(e.to_string()),
        }
    }
}
