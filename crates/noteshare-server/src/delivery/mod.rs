//! One-time code delivery over email and SMS.
//!
//! The registration flow only sees the [`EmailSender`] and [`SmsSender`]
//! traits. Production wiring picks the HTTP mail client and the Twilio
//! client when their settings are present and the log-only sender otherwise.

pub mod log;
pub mod mail;
pub mod sms;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use noteshare_core::Channel;

pub use self::log::LogSender;
pub use mail::HttpMailSender;
pub use sms::TwilioSmsSender;

/// Errors raised by a delivery provider.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The HTTP request could not be sent or its response not read.
    #[error("Delivery request error: {0}")]
    Request(String),

    /// The provider answered with a non-success status code.
    #[error("Delivery provider error (status {status}): {body}")]
    Provider {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Response body from the provider.
        body: String,
    },
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError>;
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), DeliveryError>;
}

pub const OTP_EMAIL_SUBJECT: &str = "Your OTP Code";

pub fn otp_email_body(code: &str) -> String {
    format!("Your OTP code is: {code}")
}

pub fn otp_sms_body(code: &str) -> String {
    format!("Your NoteShare OTP is: {code}")
}

/// Routes a code to every channel of a contact.
#[derive(Clone)]
pub struct OtpDispatcher {
    email: Arc<dyn EmailSender>,
    sms: Arc<dyn SmsSender>,
}

impl OtpDispatcher {
    pub fn new(email: Arc<dyn EmailSender>, sms: Arc<dyn SmsSender>) -> Self {
        Self { email, sms }
    }

    /// Send `code` to each channel in order. Stops at the first failure; a
    /// message already delivered to an earlier channel is not retracted.
    pub async fn dispatch(&self, channels: &[Channel], code: &str) -> Result<(), DeliveryError> {
        for channel in channels {
            match channel {
                Channel::Email(address) => {
                    self.email
                        .send(address, OTP_EMAIL_SUBJECT, &otp_email_body(code))
                        .await?;
                }
                Channel::Phone(number) => {
                    self.sms.send(number, &otp_sms_body(code)).await?;
                }
            }
            info!(channel = channel.kind(), "One-time code dispatched");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// A message captured by [`RecordingSender`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Sent {
        pub to: String,
        pub body: String,
    }

    /// Captures messages instead of sending them; can be told to fail.
    #[derive(Default)]
    pub struct RecordingSender {
        sent: Mutex<Vec<Sent>>,
        fail: Mutex<bool>,
    }

    impl RecordingSender {
        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        pub fn set_failing(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }

        /// The six-digit code in the most recent message.
        pub fn last_code(&self) -> Option<String> {
            self.sent.lock().unwrap().last().and_then(|m| {
                m.body
                    .rsplit(' ')
                    .next()
                    .map(ToString::to_string)
            })
        }

        fn record(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
            if *self.fail.lock().unwrap() {
                return Err(DeliveryError::Provider {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            self.sent.lock().unwrap().push(Sent {
                to: to.to_string(),
                body: body.to_string(),
            });
            Ok(())
        }
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, to: &str, _subject: &str, body: &str) -> Result<(), DeliveryError> {
            self.record(to, body)
        }
    }

    #[async_trait]
    impl SmsSender for RecordingSender {
        async fn send(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
            self.record(to, body)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::testing::RecordingSender;
    use super::*;

    #[tokio::test]
    async fn dispatch_reaches_every_channel() {
        let email = Arc::new(RecordingSender::default());
        let sms = Arc::new(RecordingSender::default());
        let dispatcher = OtpDispatcher::new(email.clone(), sms.clone());

        let channels = [
            Channel::Email("a@x.com".into()),
            Channel::Phone("+15550001".into()),
        ];
        dispatcher.dispatch(&channels, "042137").await.unwrap();

        assert_eq!(email.sent()[0].to, "a@x.com");
        assert_eq!(email.sent()[0].body, "Your OTP code is: 042137");
        assert_eq!(sms.sent()[0].to, "+15550001");
        assert_eq!(sms.last_code().as_deref(), Some("042137"));
    }

    #[tokio::test]
    async fn sms_failure_after_email_surfaces() {
        let email = Arc::new(RecordingSender::default());
        let sms = Arc::new(RecordingSender::default());
        sms.set_failing(true);
        let dispatcher = OtpDispatcher::new(email.clone(), sms);

        let channels = [
            Channel::Email("a@x.com".into()),
            Channel::Phone("+15550001".into()),
        ];
        let err = dispatcher.dispatch(&channels, "111111").await.unwrap_err();

        assert!(matches!(err, DeliveryError::Provider { status: 503, .. }));
        // The email already went out and stays sent.
        assert_eq!(email.sent().len(), 1);
    }
}
