//! Tests for the signup flow and login.

#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use noteshare_core::Contact;
use noteshare_core::db::unix_timestamp;

use super::ServiceError;
use super::test_helpers::{TEST_OTP_TTL, harness, seed_user};
use crate::presence::PresenceTracker;

fn email(addr: &str) -> Contact {
    Contact::new(Some(addr), None)
}

#[tokio::test]
async fn register_verify_finalize_login() {
    let h = harness().await;
    let contact = email("a@x.com");

    let issued = h
        .registration
        .request_registration("Alice", &contact, "p1")
        .await
        .unwrap();
    assert_eq!(issued.channels, vec!["email"]);
    assert_eq!(h.email.sent()[0].to, "a@x.com");

    let code = h.email.last_code().unwrap();
    h.registration.verify_otp(&contact, &code).await.unwrap();

    let user = h
        .registration
        .finalize_registration("alice", &contact)
        .await
        .unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.name, "Alice");
    assert_eq!(user.email.as_deref(), Some("a@x.com"));
    assert!(user.password_hash.starts_with("$argon2id$"));
    assert_eq!(h.db.count_pending().await.unwrap(), 0);

    let session = h.session.login("a@x.com", "p1").await.unwrap();
    let claims = h.jwt.validate(&session.token).unwrap();
    assert_eq!(claims.user_id(), user.id);
    assert_eq!(claims.username, "alice");
    assert_eq!(session.expires_in_secs, 3600);
    assert_eq!(h.presence.snapshot().await, vec!["alice"]);

    let err = h.session.login("a@x.com", "wrong").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidCredentials));
}

#[tokio::test]
async fn login_unknown_email_is_not_found() {
    let h = harness().await;
    let err = h.session.login("ghost@x.com", "p1").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert!(h.presence.snapshot().await.is_empty());
}

#[tokio::test]
async fn login_normalises_email_case() {
    let h = harness().await;
    let contact = email("Bob@X.com");
    h.registration
        .request_registration("Bob", &contact, "pw")
        .await
        .unwrap();
    let code = h.email.last_code().unwrap();
    h.registration.verify_otp(&contact, &code).await.unwrap();
    h.registration
        .finalize_registration("bob", &contact)
        .await
        .unwrap();

    assert!(h.session.login("  BOB@x.COM ", "pw").await.is_ok());
}

#[tokio::test]
async fn registration_requires_a_channel_and_credentials() {
    let h = harness().await;

    let err = h
        .registration
        .request_registration("Alice", &Contact::default(), "p1")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let err = h
        .registration
        .request_registration("  ", &email("a@x.com"), "p1")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let err = h
        .registration
        .request_registration("Alice", &email("a@x.com"), "")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
    assert!(h.email.sent().is_empty());
}

#[tokio::test]
async fn registration_conflicts_with_existing_account() {
    let h = harness().await;
    seed_user(&h.db, "u1", "alice").await;

    let err = h
        .registration
        .request_registration("Alice", &email("alice@example.com"), "p1")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert!(h.email.sent().is_empty());
    assert_eq!(h.db.count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn code_expiry_boundary() {
    let h = harness().await;
    let contact = email("a@x.com");
    let t = unix_timestamp();

    h.registration
        .issue_at(&contact, Some(("Alice", "hash")), t)
        .await
        .unwrap();
    let code = h.email.last_code().unwrap();
    assert!(h.registration.verify_at(&contact, &code, t + 299).await.is_ok());

    h.registration
        .issue_at(&contact, Some(("Alice", "hash")), t)
        .await
        .unwrap();
    let code = h.email.last_code().unwrap();
    for late in [t + TEST_OTP_TTL, t + 301] {
        let err = h
            .registration
            .verify_at(&contact, &code, late)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOrExpired));
    }
}

#[tokio::test]
async fn wrong_code_is_rejected() {
    let h = harness().await;
    let contact = email("a@x.com");
    h.registration
        .request_registration("Alice", &contact, "p1")
        .await
        .unwrap();
    let code = h.email.last_code().unwrap();
    let wrong = if code == "000000" { "000001" } else { "000000" };

    let err = h.registration.verify_otp(&contact, wrong).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOrExpired));

    // Another channel's code never matches.
    let err = h
        .registration
        .verify_otp(&email("b@x.com"), &code)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOrExpired));
}

#[tokio::test]
async fn verification_may_repeat() {
    let h = harness().await;
    let contact = email("a@x.com");
    h.registration
        .request_registration("Alice", &contact, "p1")
        .await
        .unwrap();
    let code = h.email.last_code().unwrap();
    h.registration.verify_otp(&contact, &code).await.unwrap();
    h.registration.verify_otp(&contact, &code).await.unwrap();
    assert_eq!(h.db.count_pending().await.unwrap(), 1);
}

#[tokio::test]
async fn finalize_requires_verification() {
    let h = harness().await;
    let contact = email("a@x.com");
    h.registration
        .request_registration("Alice", &contact, "p1")
        .await
        .unwrap();

    let err = h
        .registration
        .finalize_registration("alice", &contact)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::OtpNotVerified));
    assert!(!h.db.username_exists("alice").await.unwrap());
}

#[tokio::test]
async fn second_finalize_is_not_found() {
    let h = harness().await;
    let contact = email("a@x.com");
    h.registration
        .request_registration("Alice", &contact, "p1")
        .await
        .unwrap();
    let code = h.email.last_code().unwrap();
    h.registration.verify_otp(&contact, &code).await.unwrap();
    h.registration
        .finalize_registration("alice", &contact)
        .await
        .unwrap();

    let err = h
        .registration
        .finalize_registration("alice2", &contact)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn finalize_with_taken_username() {
    let h = harness().await;
    seed_user(&h.db, "u1", "alice").await;
    let contact = email("new@x.com");
    h.registration
        .request_registration("Other", &contact, "p1")
        .await
        .unwrap();
    let code = h.email.last_code().unwrap();
    h.registration.verify_otp(&contact, &code).await.unwrap();

    let err = h
        .registration
        .finalize_registration("alice", &contact)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::UsernameTaken));
    // The pending signup survives so another username can be tried.
    assert!(
        h.registration
            .finalize_registration("other", &contact)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn finalize_without_staged_credentials_is_not_found() {
    let h = harness().await;
    let contact = email("a@x.com");
    h.registration.request_otp(&contact).await.unwrap();
    let code = h.email.last_code().unwrap();
    h.registration.verify_otp(&contact, &code).await.unwrap();

    let err = h
        .registration
        .finalize_registration("alice", &contact)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn resend_keeps_staged_credentials_and_replaces_code() {
    let h = harness().await;
    let contact = email("a@x.com");
    h.registration
        .request_registration("Alice", &contact, "p1")
        .await
        .unwrap();
    let first = h.email.last_code().unwrap();
    h.registration.verify_otp(&contact, &first).await.unwrap();

    h.registration.request_otp(&contact).await.unwrap();
    let second = h.email.last_code().unwrap();
    assert_eq!(h.db.count_pending().await.unwrap(), 1);

    // The re-send reset verification.
    let err = h
        .registration
        .finalize_registration("alice", &contact)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::OtpNotVerified));

    h.registration.verify_otp(&contact, &second).await.unwrap();
    let user = h
        .registration
        .finalize_registration("alice", &contact)
        .await
        .unwrap();
    assert_eq!(user.name, "Alice");
    assert!(h.session.login("a@x.com", "p1").await.is_ok());
}

#[tokio::test]
async fn failed_delivery_stores_nothing() {
    let h = harness().await;
    h.email.set_failing(true);

    let err = h
        .registration
        .request_registration("Alice", &email("a@x.com"), "p1")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::DeliveryFailed(_)));
    assert_eq!(h.db.count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn phone_only_signup_goes_by_sms() {
    let h = harness().await;
    let contact = Contact::new(None, Some("+15550001"));
    let issued = h
        .registration
        .request_registration("Pat", &contact, "p1")
        .await
        .unwrap();
    assert_eq!(issued.channels, vec!["phone"]);
    assert!(h.email.sent().is_empty());

    let code = h.sms.last_code().unwrap();
    h.registration.verify_otp(&contact, &code).await.unwrap();
    let user = h
        .registration
        .finalize_registration("pat", &contact)
        .await
        .unwrap();
    assert_eq!(user.phone.as_deref(), Some("+15550001"));
    assert!(user.email.is_none());
}

#[tokio::test]
async fn both_channels_receive_the_same_code() {
    let h = harness().await;
    let contact = Contact::new(Some("a@x.com"), Some("+15550001"));
    h.registration
        .request_registration("Alice", &contact, "p1")
        .await
        .unwrap();
    assert_eq!(h.email.last_code(), h.sms.last_code());

    // Verifying by phone alone finds the same pending record.
    let code = h.sms.last_code().unwrap();
    let by_phone = Contact::new(None, Some("+15550001"));
    h.registration.verify_otp(&by_phone, &code).await.unwrap();
    let user = h
        .registration
        .finalize_registration("alice", &by_phone)
        .await
        .unwrap();
    assert_eq!(user.email.as_deref(), Some("a@x.com"));
    assert_eq!(user.phone.as_deref(), Some("+15550001"));
}

#[tokio::test]
async fn resend_cannot_redirect_a_staged_signup_to_another_phone() {
    let h = harness().await;
    let victim = email("a@x.com");
    h.registration
        .request_registration("Alice", &victim, "p1")
        .await
        .unwrap();
    let original_code = h.email.last_code().unwrap();

    let widened = Contact::new(Some("a@x.com"), Some("+1999"));
    let err = h.registration.request_otp(&widened).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)), "got {err:?}");
    assert!(h.sms.sent().is_empty());
    assert_eq!(h.email.sent().len(), 1);

    let phone = Contact::new(None, Some("+1999"));
    let err = h
        .registration
        .verify_otp(&phone, &original_code)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOrExpired));
    let err = h
        .registration
        .finalize_registration("mallory", &phone)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // The genuine signup is untouched.
    h.registration
        .verify_otp(&victim, &original_code)
        .await
        .unwrap();
    let user = h
        .registration
        .finalize_registration("alice", &victim)
        .await
        .unwrap();
    assert!(user.phone.is_none());
}
