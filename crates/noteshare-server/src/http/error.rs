//! JSON error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::service::ServiceError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

pub const fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Conflict(_)
        | ServiceError::UsernameTaken
        | ServiceError::AlreadyPurchased => StatusCode::CONFLICT,
        ServiceError::InvalidOrExpired
        | ServiceError::OtpNotVerified
        | ServiceError::InvalidPrice
        | ServiceError::QuotaExceeded
        | ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) | ServiceError::FileMissing => StatusCode::NOT_FOUND,
        ServiceError::InvalidCredentials | ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        ServiceError::BlockedFileType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ServiceError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
        ServiceError::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
        ServiceError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "Request failed");
        }
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases = [
            (ServiceError::UsernameTaken, 409),
            (ServiceError::InvalidOrExpired, 400),
            (ServiceError::OtpNotVerified, 400),
            (ServiceError::NotFound("Note".into()), 404),
            (ServiceError::InvalidCredentials, 401),
            (ServiceError::QuotaExceeded, 400),
            (ServiceError::BlockedFileType, 415),
            (ServiceError::InsufficientFunds, 402),
            (ServiceError::DeliveryFailed("x".into()), 502),
            (ServiceError::FileMissing, 404),
            (ServiceError::StorageFailure("x".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err).as_u16(), status, "{}", err.code());
        }
    }
}
