//! Pending registration queries.
//!
//! Rows are keyed by channel: issuing a new code for an email or phone
//! replaces whatever was pending for it. Every read filters on `expires_at`,
//! so a row the sweeper has not reached yet is already invisible.

use noteshare_core::db::DatabaseError;
use noteshare_core::{Channel, Contact};

use super::NoteshareDatabase;
use super::models::PendingRegistration;

/// Fields for issuing a code.
#[derive(Debug, Clone, Copy)]
pub struct PendingParams<'a> {
    pub id: &'a str,
    pub contact: &'a Contact,
    pub code: &'a str,
    /// Name and password hash to stage, or `None` for a bare re-send that
    /// keeps whatever was staged before.
    pub staged: Option<(&'a str, &'a str)>,
    pub created_at: i64,
    pub expires_at: i64,
}

impl NoteshareDatabase {
    /// Replace any pending rows for the contact's channels with a fresh code.
    ///
    /// A staged request binds exactly the channels it names. A bare re-send
    /// keeps the credentials and channels of the staged row it targets, and
    /// fails with `Conflict` if it names a channel that row does not hold.
    /// The `verified` flag always resets.
    pub async fn upsert_pending(
        &self,
        params: &PendingParams<'_>,
    ) -> Result<PendingRegistration, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let existing = sqlx::query_as::<_, PendingRegistration>(
            "SELECT * FROM pending_registrations WHERE email = ? OR phone = ? \
             ORDER BY created_at DESC",
        )
        .bind(params.contact.email.as_deref())
        .bind(params.contact.phone.as_deref())
        .fetch_all(&mut *tx)
        .await?;

        let mut email = params.contact.email.clone();
        let mut phone = params.contact.phone.clone();
        let mut name = None;
        let mut password_hash = None;

        match params.staged {
            Some((staged_name, hash)) => {
                name = Some(staged_name.to_string());
                password_hash = Some(hash.to_string());
            }
            None => {
                let staged: Vec<&PendingRegistration> =
                    existing.iter().filter(|p| p.staged().is_some()).collect();
                if staged.iter().any(|row| !row.holds(params.contact)) {
                    return Err(DatabaseError::Conflict(
                        "Pending registration is bound to other channels".into(),
                    ));
                }
                if let Some(row) = staged.first() {
                    email.clone_from(&row.email);
                    phone.clone_from(&row.phone);
                    name.clone_from(&row.name);
                    password_hash.clone_from(&row.password_hash);
                }
            }
        }

        sqlx::query("DELETE FROM pending_registrations WHERE email = ? OR phone = ?")
            .bind(email.as_deref())
            .bind(phone.as_deref())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO pending_registrations \
             (id, email, phone, code, name, password_hash, verified, created_at, expires_at) \
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(params.id)
        .bind(email.as_deref())
        .bind(phone.as_deref())
        .bind(params.code)
        .bind(name.as_deref())
        .bind(password_hash.as_deref())
        .bind(params.created_at)
        .bind(params.expires_at)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, PendingRegistration>(
            "SELECT * FROM pending_registrations WHERE id = ?",
        )
        .bind(params.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row)
    }

    /// Whether a bare re-send for `contact` names a channel that a staged
    /// row for one of its other channels does not hold.
    pub async fn resend_widens_staged(&self, contact: &Contact) -> Result<bool, DatabaseError> {
        let rows = sqlx::query_as::<_, PendingRegistration>(
            "SELECT * FROM pending_registrations WHERE (email = ? OR phone = ?) \
             AND name IS NOT NULL AND password_hash IS NOT NULL",
        )
        .bind(contact.email.as_deref())
        .bind(contact.phone.as_deref())
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().any(|row| !row.holds(contact)))
    }

    /// The unexpired pending row bound to `channel`, if any.
    pub async fn find_live_pending(
        &self,
        channel: &Channel,
        now: i64,
    ) -> Result<Option<PendingRegistration>, DatabaseError> {
        let sql = match channel {
            Channel::Email(_) => {
                "SELECT * FROM pending_registrations WHERE email = ? AND expires_at > ?"
            }
            Channel::Phone(_) => {
                "SELECT * FROM pending_registrations WHERE phone = ? AND expires_at > ?"
            }
        };

        let row = sqlx::query_as::<_, PendingRegistration>(sql)
            .bind(channel.value())
            .bind(now)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    /// Flag a pending row as verified. Returns `false` if it no longer exists
    /// or has expired.
    pub async fn mark_pending_verified(&self, id: &str, now: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE pending_registrations SET verified = 1 WHERE id = ? AND expires_at > ?",
        )
        .bind(id)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete rows whose expiry has passed. Returns how many were removed.
    pub async fn sweep_expired_pending(&self, now: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM pending_registrations WHERE expires_at <= ?")
            .bind(now)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    /// Count pending rows, expired or not.
    pub async fn count_pending(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pending_registrations")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }
}
