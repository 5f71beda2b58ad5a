//! Wallet and purchase queries.

use noteshare_core::db::{DatabaseError, unix_timestamp};

use super::NoteshareDatabase;
use super::models::{Purchase, User};

/// Amounts for one purchase, all in cents.
#[derive(Debug, Clone, Copy)]
pub struct PurchaseParams<'a> {
    pub buyer_id: &'a str,
    pub note_id: &'a str,
    pub uploader_id: &'a str,
    pub admin_id: &'a str,
    pub price_cents: i64,
    pub uploader_share_cents: i64,
    pub admin_share_cents: i64,
}

/// Result of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Completed,
    AlreadyPurchased,
    InsufficientFunds,
}

impl NoteshareDatabase {
    /// Add `cents` to a user's wallet and return the updated user.
    pub async fn credit_wallet(&self, user_id: &str, cents: i64) -> Result<User, DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET wallet_cents = wallet_cents + ?, updated_at = ? WHERE id = ?",
        )
        .bind(cents)
        .bind(unix_timestamp())
        .bind(user_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {user_id}")));
        }
        self.get_user(user_id).await
    }

    /// Move money from buyer to uploader and platform and record ownership,
    /// all in one transaction.
    pub async fn purchase_note(
        &self,
        params: &PurchaseParams<'_>,
    ) -> Result<PurchaseOutcome, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let owned = sqlx::query(
            "INSERT OR IGNORE INTO purchases (user_id, note_id, price_cents, purchased_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(params.buyer_id)
        .bind(params.note_id)
        .bind(params.price_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        if owned.rows_affected() == 0 {
            return Ok(PurchaseOutcome::AlreadyPurchased);
        }

        let debited = sqlx::query(
            "UPDATE users SET wallet_cents = wallet_cents - ?1, updated_at = ?2 \
             WHERE id = ?3 AND wallet_cents >= ?1",
        )
        .bind(params.price_cents)
        .bind(now)
        .bind(params.buyer_id)
        .execute(&mut *tx)
        .await?;
        if debited.rows_affected() == 0 {
            // Dropping the transaction rolls back the ownership row.
            return Ok(PurchaseOutcome::InsufficientFunds);
        }

        for (user_id, cents) in [
            (params.uploader_id, params.uploader_share_cents),
            (params.admin_id, params.admin_share_cents),
        ] {
            sqlx::query(
                "UPDATE users SET wallet_cents = wallet_cents + ?, updated_at = ? WHERE id = ?",
            )
            .bind(cents)
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(PurchaseOutcome::Completed)
    }

    /// Whether `user_id` already owns `note_id`.
    pub async fn has_purchased(&self, user_id: &str, note_id: &str) -> Result<bool, DatabaseError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM purchases WHERE user_id = ? AND note_id = ?")
                .bind(user_id)
                .bind(note_id)
                .fetch_one(self.pool())
                .await?;
        Ok(row.0 > 0)
    }

    /// Purchases made by a user, most recent first.
    pub async fn purchases_by_user(&self, user_id: &str) -> Result<Vec<Purchase>, DatabaseError> {
        let rows = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE user_id = ? ORDER BY purchased_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
