//! Signup and login routes.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use noteshare_core::Contact;

use super::AppState;
use super::extract::ApiJson;
use crate::service::ServiceError;
use crate::service::registration::OtpIssued;
use crate::service::session::LoginResponse;
use crate::storage::User;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ContactBody {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct SetUsernameBody {
    #[serde(default)]
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Registered {
    pub message: &'static str,
    pub user: User,
}

fn contact(email: Option<&str>, phone: Option<&str>) -> Contact {
    Contact::new(email, phone)
}

/// `POST /api/user/register`
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterBody>,
) -> Result<Json<OtpIssued>, ServiceError> {
    let contact = contact(body.email.as_deref(), body.phone.as_deref());
    let issued = state
        .registration
        .request_registration(&body.name, &contact, &body.password)
        .await?;
    Ok(Json(issued))
}

/// `POST /api/user/send-otp`
pub async fn send_otp(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ContactBody>,
) -> Result<Json<OtpIssued>, ServiceError> {
    let contact = contact(body.email.as_deref(), body.phone.as_deref());
    Ok(Json(state.registration.request_otp(&contact).await?))
}

/// `POST /api/user/verify-otp`
pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<VerifyBody>,
) -> Result<Json<Message>, ServiceError> {
    let contact = contact(body.email.as_deref(), body.phone.as_deref());
    state.registration.verify_otp(&contact, &body.otp).await?;
    Ok(Json(Message {
        message: "OTP verified successfully",
    }))
}

/// `POST /api/user/set-username`
pub async fn set_username(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SetUsernameBody>,
) -> Result<(StatusCode, Json<Registered>), ServiceError> {
    let contact = contact(body.email.as_deref(), body.phone.as_deref());
    let user = state
        .registration
        .finalize_registration(&body.username, &contact)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Registered {
            message: "Registration complete",
            user,
        }),
    ))
}

/// `POST /api/user/login`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginBody>,
) -> Result<Json<LoginResponse>, ServiceError> {
    Ok(Json(state.session.login(&body.email, &body.password).await?))
}
