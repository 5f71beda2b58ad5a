//! Login and token issuance.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use noteshare_core::Contact;

use super::ServiceError;
use crate::auth::{JwtManager, password};
use crate::presence::PresenceTracker;
use crate::storage::NoteshareDatabase;

#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in_secs: i64,
    pub user: SessionUser,
}

#[derive(Clone)]
pub struct SessionService {
    db: NoteshareDatabase,
    jwt: Arc<JwtManager>,
    presence: Arc<dyn PresenceTracker>,
}

impl SessionService {
    pub fn new(
        db: NoteshareDatabase,
        jwt: Arc<JwtManager>,
        presence: Arc<dyn PresenceTracker>,
    ) -> Self {
        Self { db, jwt, presence }
    }

    #[instrument(skip(self, password), fields(op = "login"))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ServiceError> {
        let Some(email) = Contact::new(Some(email), None).email else {
            return Err(ServiceError::invalid_input("Email is required"));
        };

        let user = self.db.get_user_by_email(&email).await?;

        let valid =
            password::verify_password_blocking(password.to_string(), user.password_hash.clone())
                .await?;
        if !valid {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(ServiceError::InvalidCredentials);
        }

        let issued = self.jwt.issue(&user.id, &user.username)?;
        self.presence.mark(&user.username).await;

        info!(user_id = %user.id, username = %user.username, "User logged in");

        Ok(LoginResponse {
            token: issued.token,
            expires_in_secs: issued.expires_in_secs,
            user: SessionUser {
                id: user.id,
                username: user.username,
                email: user.email,
            },
        })
    }
}
