//! Bearer token issuance and validation.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use noteshare_core::db::unix_timestamp;

use super::AuthError;
use super::claims::Claims;

/// A freshly signed token and its lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in_secs: i64,
}

/// Signs and checks HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl JwtManager {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    pub const fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a token for the given user.
    pub fn issue(&self, user_id: &str, username: &str) -> Result<IssuedToken, AuthError> {
        let now = unix_timestamp();

        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(IssuedToken {
            token,
            expires_in_secs: self.ttl_secs,
        })
    }

    /// Validate a token (signature and expiry) and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_jwt() -> JwtManager {
        JwtManager::new(b"test-secret-key-for-testing", 3600)
    }

    #[test]
    fn issue_and_validate() {
        let jwt = test_jwt();
        let issued = jwt.issue("user-1", "alice").unwrap();
        assert_eq!(issued.expires_in_secs, 3600);

        let claims = jwt.validate(&issued.token).unwrap();
        assert_eq!(claims.user_id(), "user-1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let jwt = test_jwt();
        let a = jwt.issue("user-1", "alice").unwrap();
        let b = jwt.issue("user-1", "alice").unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn garbage_token_fails_validation() {
        let jwt = test_jwt();
        assert!(jwt.validate("not-a-valid-token").is_err());
    }

    #[test]
    fn wrong_secret_fails_validation() {
        let jwt1 = test_jwt();
        let jwt2 = JwtManager::new(b"different-secret", 3600);

        let issued = jwt1.issue("user-1", "alice").unwrap();
        assert!(jwt2.validate(&issued.token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Default validation allows 60s of leeway.
        let jwt = JwtManager::new(b"test-secret-key-for-testing", -120);
        let issued = jwt.issue("user-1", "alice").unwrap();
        assert!(jwt.validate(&issued.token).is_err());
    }
}
