//! Wallet purchases of priced notes.
//!
//! Prices are whole currency units; wallets hold cents. The uploader keeps
//! 90% of the price and the platform account receives the rest.

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::ServiceError;
use crate::storage::{NoteshareDatabase, Purchase, PurchaseOutcome, PurchaseParams, User};

pub const CENTS_PER_UNIT: i64 = 100;
pub const UPLOADER_SHARE_PERCENT: i64 = 90;

/// `(uploader, platform)` shares of a price in cents. The platform takes any
/// rounding remainder.
pub const fn split_price(price_cents: i64) -> (i64, i64) {
    let uploader = price_cents * UPLOADER_SHARE_PERCENT / 100;
    (uploader, price_cents - uploader)
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub note_id: String,
    pub price_cents: i64,
    pub uploader_share_cents: i64,
    pub platform_share_cents: i64,
    pub wallet_cents: i64,
}

#[derive(Clone)]
pub struct PurchaseService {
    db: NoteshareDatabase,
}

impl PurchaseService {
    pub fn new(db: NoteshareDatabase) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(op = "purchase_note"))]
    pub async fn purchase_note(
        &self,
        buyer_id: &str,
        note_id: &str,
    ) -> Result<PurchaseReceipt, ServiceError> {
        let note = self.db.get_note(note_id).await?;
        let buyer = self.db.get_user(buyer_id).await?;
        let admin = self
            .db
            .find_admin()
            .await?
            .ok_or_else(|| ServiceError::NotFound("Platform account".into()))?;

        if note.is_free() {
            return Err(ServiceError::invalid_input("This note is already free"));
        }
        if self.db.has_purchased(&buyer.id, &note.id).await? {
            return Err(ServiceError::AlreadyPurchased);
        }

        let price_cents = note.price * CENTS_PER_UNIT;
        let (uploader_share_cents, admin_share_cents) = split_price(price_cents);

        let outcome = self
            .db
            .purchase_note(&PurchaseParams {
                buyer_id: &buyer.id,
                note_id: &note.id,
                uploader_id: &note.uploader_id,
                admin_id: &admin.id,
                price_cents,
                uploader_share_cents,
                admin_share_cents,
            })
            .await?;

        match outcome {
            PurchaseOutcome::Completed => {}
            PurchaseOutcome::AlreadyPurchased => return Err(ServiceError::AlreadyPurchased),
            PurchaseOutcome::InsufficientFunds => {
                warn!(wallet_cents = buyer.wallet_cents, price_cents, "Purchase refused");
                return Err(ServiceError::InsufficientFunds);
            }
        }

        let buyer = self.db.get_user(&buyer.id).await?;
        info!(buyer_id = %buyer.id, note_id = %note.id, price_cents, "Note purchased");

        Ok(PurchaseReceipt {
            note_id: note.id,
            price_cents,
            uploader_share_cents,
            platform_share_cents: admin_share_cents,
            wallet_cents: buyer.wallet_cents,
        })
    }

    /// Operator top-up of a wallet.
    #[instrument(skip(self), fields(op = "credit_wallet"))]
    pub async fn credit_wallet(&self, user_id: &str, cents: i64) -> Result<User, ServiceError> {
        if cents <= 0 {
            return Err(ServiceError::invalid_input("Amount must be positive"));
        }
        let user = self.db.credit_wallet(user_id, cents).await?;
        info!(user_id, cents, balance = user.wallet_cents, "Wallet credited");
        Ok(user)
    }

    /// Top-up requested by a signed-in user; only the platform account may
    /// credit wallets.
    pub async fn credit_wallet_as(
        &self,
        operator_id: &str,
        user_id: &str,
        cents: i64,
    ) -> Result<User, ServiceError> {
        let operator = self.db.get_user(operator_id).await?;
        if !operator.is_admin {
            warn!(operator_id, "Wallet credit by a non-admin account");
            return Err(ServiceError::Unauthorized);
        }
        self.credit_wallet(user_id, cents).await
    }

    /// Give `username` the platform role that receives purchase commission.
    #[instrument(skip(self), fields(op = "grant_platform_role"))]
    pub async fn grant_platform_role(&self, username: &str) -> Result<User, ServiceError> {
        let user = self.db.get_user_by_username(username).await?;
        self.db.set_admin(&user.id, true).await?;
        info!(user_id = %user.id, "Platform role granted");
        Ok(self.db.get_user(&user.id).await?)
    }

    /// A user's purchases, most recent first.
    pub async fn purchases(&self, user_id: &str) -> Result<Vec<Purchase>, ServiceError> {
        Ok(self.db.purchases_by_user(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_ninety_ten() {
        assert_eq!(split_price(1_000), (900, 100));
        assert_eq!(split_price(100), (90, 10));
        assert_eq!(split_price(10_000), (9_000, 1_000));
    }
}
