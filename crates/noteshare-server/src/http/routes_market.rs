//! Purchase, wallet and follow routes. All require a bearer token.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use super::AppState;
use super::extract::{ApiJson, AuthUser};
use crate::service::ServiceError;
use crate::service::purchase::PurchaseReceipt;
use crate::service::social::FollowCounts;
use crate::storage::{Purchase, User};

#[derive(Debug, Deserialize)]
pub struct CreditBody {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub cents: i64,
}

/// `POST /api/user/notes/{id}/buy`
pub async fn buy(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    user: AuthUser,
) -> Result<Json<PurchaseReceipt>, ServiceError> {
    let receipt = state
        .purchases
        .purchase_note(user.user_id(), &note_id)
        .await?;
    Ok(Json(receipt))
}

/// `GET /api/user/purchases`
pub async fn purchases(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Purchase>>, ServiceError> {
    Ok(Json(state.purchases.purchases(user.user_id()).await?))
}

/// `POST /api/user/wallet/credit`, platform account only.
pub async fn credit(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreditBody>,
) -> Result<Json<User>, ServiceError> {
    let credited = state
        .purchases
        .credit_wallet_as(user.user_id(), &body.user_id, body.cents)
        .await?;
    Ok(Json(credited))
}

/// `POST /api/user/follow/{user_id}`
pub async fn follow(
    State(state): State<AppState>,
    Path(followee): Path<String>,
    user: AuthUser,
) -> Result<Json<FollowCounts>, ServiceError> {
    Ok(Json(state.social.follow(user.user_id(), &followee).await?))
}

/// `DELETE /api/user/follow/{user_id}`
pub async fn unfollow(
    State(state): State<AppState>,
    Path(followee): Path<String>,
    user: AuthUser,
) -> Result<Json<FollowCounts>, ServiceError> {
    Ok(Json(state.social.unfollow(user.user_id(), &followee).await?))
}
