//! Request extractors: bearer identity and JSON bodies with uniform errors.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::AppState;
use crate::auth::Claims;
use crate::service::ServiceError;

/// Claims of a valid bearer token. Rejects with `unauthorized` otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> &str {
        self.0.user_id()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ServiceError::Unauthorized)?;
        let claims = state.jwt.validate(token)?;
        Ok(Self(claims))
    }
}

#[derive(Debug, Deserialize)]
struct RequesterQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

/// Who is asking, for counter self-exclusion.
///
/// Taken from the bearer token when an `Authorization` header is present,
/// otherwise from the `userId` query parameter. Absent for anonymous calls.
#[derive(Debug, Clone, Default)]
pub struct Requester(pub Option<String>);

impl Requester {
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl FromRequestParts<AppState> for Requester {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if parts.headers.contains_key(AUTHORIZATION) {
            let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
            return Ok(Self(Some(claims.sub)));
        }
        let user_id = Query::<RequesterQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.user_id)
            .filter(|id| !id.trim().is_empty());
        Ok(Self(user_id))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// `Json<T>` whose rejection renders as an `invalid_input` error body.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::InvalidInput(rejection.body_text()))?;
        Ok(Self(value))
    }
}
