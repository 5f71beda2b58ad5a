//! User and follow queries.

use noteshare_core::Contact;
use noteshare_core::db::unix_timestamp;

use super::NoteshareDatabase;
use super::models::User;
use noteshare_core::db::DatabaseError;

/// Fields for a new account row.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub password_hash: &'a str,
}

const INSERT_USER_SQL: &str = "INSERT INTO users \
     (id, name, username, email, phone, password_hash, created_at, updated_at) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

impl NoteshareDatabase {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a new user.
    pub async fn create_user(&self, user: &NewUser<'_>) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(INSERT_USER_SQL)
            .bind(user.id)
            .bind(user.name)
            .bind(user.username)
            .bind(user.email)
            .bind(user.phone)
            .bind(user.password_hash)
            .bind(now)
            .bind(now)
            .execute(self.pool())
            .await?;

        self.get_user(user.id).await
    }

    /// Turn a verified pending registration into an account.
    ///
    /// The pending row is deleted in the same transaction, so a second
    /// submission of the same registration finds nothing to consume.
    pub async fn complete_registration(
        &self,
        pending_id: &str,
        user: &NewUser<'_>,
    ) -> Result<User, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let consumed = sqlx::query("DELETE FROM pending_registrations WHERE id = ?")
            .bind(pending_id)
            .execute(&mut *tx)
            .await?;
        if consumed.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Pending registration {pending_id}"
            )));
        }

        sqlx::query(INSERT_USER_SQL)
            .bind(user.id)
            .bind(user.name)
            .bind(user.username)
            .bind(user.email)
            .bind(user.phone)
            .bind(user.password_hash)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Get a user by email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with email {email}")))
    }

    /// Get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {username}")))
    }

    /// Whether a username is already taken.
    pub async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(self.pool())
            .await?;
        Ok(row.0 > 0)
    }

    /// Find an account bound to either channel of `contact`.
    pub async fn find_user_by_contact(
        &self,
        contact: &Contact,
    ) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = ? OR phone = ? LIMIT 1",
        )
        .bind(contact.email.as_deref())
        .bind(contact.phone.as_deref())
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    /// Grant or revoke the platform (admin) role.
    pub async fn set_admin(&self, id: &str, is_admin: bool) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET is_admin = ?, updated_at = ? WHERE id = ?")
            .bind(is_admin)
            .bind(unix_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {id}")));
        }
        Ok(())
    }

    /// The platform account receiving the purchase commission.
    pub async fn find_admin(&self) -> Result<Option<User>, DatabaseError> {
        let admin = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE is_admin = 1 ORDER BY created_at LIMIT 1",
        )
        .fetch_optional(self.pool())
        .await?;
        Ok(admin)
    }

    // =========================================================================
    // Follow queries
    // =========================================================================

    /// Record that `follower_id` follows `followee_id`. Returns `false` when
    /// the edge already existed.
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(follower_id)
        .bind(followee_id)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a follow edge. Returns `false` when there was none.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(follower_id)
            .bind(followee_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// `(followers, following)` counts for a user.
    pub async fn follow_counts(&self, user_id: &str) -> Result<(i64, i64), DatabaseError> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT \
               (SELECT COUNT(*) FROM follows WHERE followee_id = ?1), \
               (SELECT COUNT(*) FROM follows WHERE follower_id = ?1)",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;

        Ok(row)
    }
}
