//! OTP-gated signup.
//!
//! A signup moves through four calls: stage credentials and send a code,
//! optionally re-send the code, verify it, then pick a username. The pending
//! row is bound to the contact's email and/or phone and lives for the code
//! lifetime only.

use serde::Serialize;
use tracing::{info, instrument, warn};

use noteshare_core::db::{DatabaseError, unix_timestamp};
use noteshare_core::{Contact, otp};

use super::ServiceError;
use crate::auth::password;
use crate::delivery::OtpDispatcher;
use crate::storage::{NewUser, NoteshareDatabase, PendingParams, User};

/// Returned once a code has been delivered and stored.
#[derive(Debug, Clone, Serialize)]
pub struct OtpIssued {
    pub message: &'static str,
    pub channels: Vec<&'static str>,
    pub expires_at: i64,
}

#[derive(Clone)]
pub struct RegistrationService {
    db: NoteshareDatabase,
    dispatcher: OtpDispatcher,
    otp_ttl_secs: i64,
}

impl RegistrationService {
    pub fn new(db: NoteshareDatabase, dispatcher: OtpDispatcher, otp_ttl_secs: i64) -> Self {
        Self {
            db,
            dispatcher,
            otp_ttl_secs,
        }
    }

    /// Stage a signup and send its code.
    #[instrument(skip(self, password), fields(op = "request_registration"))]
    pub async fn request_registration(
        &self,
        name: &str,
        contact: &Contact,
        password: &str,
    ) -> Result<OtpIssued, ServiceError> {
        let name = name.trim();
        if name.is_empty() || password.is_empty() {
            return Err(ServiceError::invalid_input("Name and password are required"));
        }
        require_channel(contact)?;

        if self.db.find_user_by_contact(contact).await?.is_some() {
            warn!("Registration for an already bound contact");
            return Err(ServiceError::Conflict(
                "Email or phone already registered".into(),
            ));
        }

        let hash = password::hash_password_blocking(password.to_string()).await?;
        self.issue_at(contact, Some((name, hash.as_str())), unix_timestamp())
            .await
    }

    /// Send a fresh code without staging credentials.
    #[instrument(skip(self), fields(op = "request_otp"))]
    pub async fn request_otp(&self, contact: &Contact) -> Result<OtpIssued, ServiceError> {
        require_channel(contact)?;
        self.issue_at(contact, None, unix_timestamp()).await
    }

    /// Check a submitted code and flag the pending signup as verified.
    #[instrument(skip(self, code), fields(op = "verify_otp"))]
    pub async fn verify_otp(&self, contact: &Contact, code: &str) -> Result<(), ServiceError> {
        self.verify_at(contact, code, unix_timestamp()).await
    }

    /// Turn a verified pending signup into an account.
    #[instrument(skip(self), fields(op = "finalize_registration"))]
    pub async fn finalize_registration(
        &self,
        username: &str,
        contact: &Contact,
    ) -> Result<User, ServiceError> {
        self.finalize_at(username, contact, unix_timestamp()).await
    }

    /// Generate, deliver and persist a code. Persisting happens last, so a
    /// failed delivery leaves no usable record.
    pub(crate) async fn issue_at(
        &self,
        contact: &Contact,
        staged: Option<(&str, &str)>,
        now: i64,
    ) -> Result<OtpIssued, ServiceError> {
        if staged.is_none() && self.db.resend_widens_staged(contact).await? {
            warn!("Re-send names a channel the staged signup does not hold");
            return Err(ServiceError::Conflict(
                "Pending registration is bound to other channels".into(),
            ));
        }

        let code = otp::generate_code();
        let channels = contact.channels();

        self.dispatcher.dispatch(&channels, &code).await?;

        let id = uuid::Uuid::new_v4().to_string();
        let expires_at = otp::expires_at(now, self.otp_ttl_secs);
        let pending = self
            .db
            .upsert_pending(&PendingParams {
                id: &id,
                contact,
                code: &code,
                staged,
                created_at: now,
                expires_at,
            })
            .await?;

        info!(
            pending_id = %pending.id,
            staged = staged.is_some(),
            "One-time code issued"
        );

        Ok(OtpIssued {
            message: "OTP sent successfully",
            channels: channels.iter().map(|c| c.kind()).collect(),
            expires_at,
        })
    }

    pub(crate) async fn verify_at(
        &self,
        contact: &Contact,
        code: &str,
        now: i64,
    ) -> Result<(), ServiceError> {
        let channel = require_channel(contact)?;
        if code.trim().is_empty() {
            return Err(ServiceError::invalid_input("OTP is required"));
        }

        let pending = self
            .db
            .find_live_pending(&channel, now)
            .await?
            .ok_or(ServiceError::InvalidOrExpired)?;

        if !otp::codes_match(&pending.code, code) {
            warn!(channel = channel.kind(), "Wrong one-time code");
            return Err(ServiceError::InvalidOrExpired);
        }

        if !self.db.mark_pending_verified(&pending.id, now).await? {
            return Err(ServiceError::InvalidOrExpired);
        }

        info!(pending_id = %pending.id, "One-time code verified");
        Ok(())
    }

    pub(crate) async fn finalize_at(
        &self,
        username: &str,
        contact: &Contact,
        now: i64,
    ) -> Result<User, ServiceError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ServiceError::invalid_input("Username is required"));
        }
        let channel = require_channel(contact)?;

        if self.db.username_exists(username).await? {
            return Err(ServiceError::UsernameTaken);
        }

        let pending = self
            .db
            .find_live_pending(&channel, now)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Registration data".into()))?;
        let Some((name, password_hash)) = pending.staged() else {
            return Err(ServiceError::NotFound("Registration data".into()));
        };
        if !pending.verified {
            return Err(ServiceError::OtpNotVerified);
        }

        let user_id = uuid::Uuid::new_v4().to_string();
        let user = self
            .db
            .complete_registration(
                &pending.id,
                &NewUser {
                    id: &user_id,
                    name,
                    username,
                    email: pending.email.as_deref(),
                    phone: pending.phone.as_deref(),
                    password_hash,
                },
            )
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict(msg) if msg.contains("users.username") => {
                    ServiceError::UsernameTaken
                }
                other => other.into(),
            })?;

        info!(user_id = %user.id, username = %user.username, "Registration complete");
        Ok(user)
    }
}

fn require_channel(contact: &Contact) -> Result<noteshare_core::Channel, ServiceError> {
    contact
        .primary()
        .ok_or_else(|| ServiceError::invalid_input("Email or phone is required"))
}
