//! Data models for `NoteShare` storage.

use noteshare_core::Contact;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub profile_picture: String,
    pub bio: String,
    pub is_admin: bool,
    /// Wallet balance in cents.
    pub wallet_cents: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub uploader_id: String,
    pub image_path: String,
    pub file_path: String,
    pub views: i64,
    pub downloads: i64,
    pub price: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Note {
    pub const fn is_free(&self) -> bool {
        self.price == 0
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.uploader_id == user_id
    }
}

/// A note joined with the public profile fields of its uploader.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NoteWithUploader {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub note: Note,
    pub uploader_username: String,
    pub uploader_picture: String,
}

/// A staged signup awaiting code verification.
///
/// Only the argon2 digest of the chosen password is ever stored here.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingRegistration {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub code: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub verified: bool,
    pub created_at: i64,
    pub expires_at: i64,
}

impl PendingRegistration {
    /// Name and password hash, when the record came from a signup request
    /// rather than a bare code re-send.
    pub fn staged(&self) -> Option<(&str, &str)> {
        match (&self.name, &self.password_hash) {
            (Some(name), Some(hash)) => Some((name.as_str(), hash.as_str())),
            _ => None,
        }
    }

    /// Whether every channel in `contact` is one this row is bound to.
    pub fn holds(&self, contact: &Contact) -> bool {
        let email_ok = contact.email.is_none() || contact.email == self.email;
        let phone_ok = contact.phone.is_none() || contact.phone == self.phone;
        email_ok && phone_ok
    }
}

/// Aggregate counters over one uploader's notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NoteTotals {
    pub count: i64,
    pub views: i64,
    pub downloads: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Purchase {
    pub user_id: String,
    pub note_id: String,
    pub price_cents: i64,
    pub purchased_at: i64,
}
