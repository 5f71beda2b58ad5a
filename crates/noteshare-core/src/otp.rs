//! One-time code rules: contact channels, code generation and expiry.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Pending codes become unreadable this many seconds after issuance.
pub const DEFAULT_OTP_TTL_SECS: i64 = 300;

/// Number of decimal digits in a generated code.
pub const CODE_DIGITS: u32 = 6;

/// A single delivery channel a code can be bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Email(String),
    Phone(String),
}

impl Channel {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::Phone(_) => "phone",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Email(v) | Self::Phone(v) => v,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

/// Email and/or phone supplied by a client. At least one must be present for
/// any registration step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Contact {
    /// Normalise raw client input: blank values are dropped, emails are
    /// trimmed and lower-cased, phones trimmed.
    pub fn new(email: Option<&str>, phone: Option<&str>) -> Self {
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_ascii_lowercase);
        let phone = phone
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ToString::to_string);
        Self { email, phone }
    }

    pub const fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }

    /// Channel used to look a pending code up. Email takes precedence when
    /// both are supplied.
    pub fn primary(&self) -> Option<Channel> {
        self.email
            .clone()
            .map(Channel::Email)
            .or_else(|| self.phone.clone().map(Channel::Phone))
    }

    /// Every channel a code should be delivered to.
    pub fn channels(&self) -> Vec<Channel> {
        let mut out = Vec::with_capacity(2);
        if let Some(email) = &self.email {
            out.push(Channel::Email(email.clone()));
        }
        if let Some(phone) = &self.phone {
            out.push(Channel::Phone(phone.clone()));
        }
        out
    }
}

/// Generate a zero-padded numeric code from the OS RNG.
pub fn generate_code() -> String {
    let upper = 10_u32.pow(CODE_DIGITS);
    let n = rand::rngs::OsRng.gen_range(0..upper);
    format!("{n:0width$}", width = CODE_DIGITS as usize)
}

/// Expiry instant for a code issued at `created_at`.
pub const fn expires_at(created_at: i64, ttl_secs: i64) -> i64 {
    created_at + ttl_secs
}

/// A code is readable strictly before its expiry instant; at exactly
/// `created_at + ttl` it is already gone.
pub const fn is_live(expires_at: i64, now: i64) -> bool {
    now < expires_at
}

/// Constant-time comparison of a submitted code against the stored one.
pub fn codes_match(stored: &str, submitted: &str) -> bool {
    stored.as_bytes().ct_eq(submitted.trim().as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()), "{code}");
        }
    }

    #[test]
    fn expiry_boundaries() {
        let t = 1_700_000_000;
        let exp = expires_at(t, DEFAULT_OTP_TTL_SECS);
        assert!(is_live(exp, t));
        assert!(is_live(exp, t + 299));
        assert!(!is_live(exp, t + 300));
        assert!(!is_live(exp, t + 301));
    }

    #[test]
    fn contact_normalisation() {
        let c = Contact::new(Some("  A@X.com "), Some("   "));
        assert_eq!(c.email.as_deref(), Some("a@x.com"));
        assert!(c.phone.is_none());
        assert!(!c.is_empty());
        assert!(Contact::new(None, Some("")).is_empty());
    }

    #[test]
    fn email_is_primary_channel() {
        let both = Contact::new(Some("a@x.com"), Some("+15550001"));
        assert_eq!(both.primary(), Some(Channel::Email("a@x.com".into())));
        assert_eq!(both.channels().len(), 2);

        let phone_only = Contact::new(None, Some("+15550001"));
        assert_eq!(phone_only.primary(), Some(Channel::Phone("+15550001".into())));
        assert_eq!(phone_only.primary().map(|c| c.to_string()).as_deref(), Some("phone:+15550001"));
    }

    #[test]
    fn code_comparison() {
        assert!(codes_match("012345", "012345"));
        assert!(codes_match("012345", " 012345 "));
        assert!(!codes_match("012345", "012346"));
        assert!(!codes_match("012345", "12345"));
        assert!(!codes_match("012345", "0123456"));
        assert!(!codes_match("012345", ""));
    }
}
