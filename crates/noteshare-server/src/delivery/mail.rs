//! Transactional mail over an HTTP JSON API.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use super::{DeliveryError, EmailSender};

/// Request body accepted by the mail API.
#[derive(Debug, Serialize)]
pub struct MailMessage<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
    pub text: &'a str,
}

/// Posts messages to a mail provider authenticated by a bearer API key.
#[derive(Debug, Clone)]
pub struct HttpMailSender {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailSender {
    pub fn new(http: reqwest::Client, api_url: &str, api_key: &str, from: &str) -> Self {
        Self {
            http,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }

    pub fn build_message<'a>(&'a self, to: &'a str, subject: &'a str, text: &'a str) -> MailMessage<'a> {
        MailMessage {
            from: &self.from,
            to,
            subject,
            text,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl EmailSender for HttpMailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.build_message(to, subject, body))
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!("Mail accepted by provider");
            Ok(())
        } else {
            let status_code = status.as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            warn!(status = status_code, body = %body, "Mail API returned error");
            Err(DeliveryError::Provider {
                status: status_code,
                body,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sender() -> HttpMailSender {
        HttpMailSender::new(
            reqwest::Client::new(),
            "https://mail.example.com/v1/send",
            "key-123",
            "no-reply@noteshare.test",
        )
    }

    #[test]
    fn message_serializes_to_json() {
        let sender = sender();
        let msg = sender.build_message("a@x.com", "Your OTP Code", "Your OTP code is: 123456");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["from"], "no-reply@noteshare.test");
        assert_eq!(json["to"], "a@x.com");
        assert_eq!(json["subject"], "Your OTP Code");
        assert_eq!(json["text"], "Your OTP code is: 123456");
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_request_error() {
        let sender = HttpMailSender::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/send",
            "key",
            "from@x.com",
        );
        let err = sender.send("a@x.com", "s", "b").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Request(_)));
    }
}
