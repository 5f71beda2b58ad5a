//! SMS through the Twilio Messages REST API.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{DeliveryError, SmsSender};

const TWILIO_API_URL_TEMPLATE: &str =
    "https://api.twilio.com/2010-04-01/Accounts/{account_sid}/Messages.json";

#[derive(Debug, Clone)]
pub struct TwilioSmsSender {
    http: reqwest::Client,
    api_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
}

impl TwilioSmsSender {
    pub fn new(http: reqwest::Client, account_sid: &str, auth_token: &str, from: &str) -> Self {
        Self {
            http,
            api_url: TWILIO_API_URL_TEMPLATE.replace("{account_sid}", account_sid),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from: from.to_string(),
        }
    }

    /// Form fields for a Messages create call.
    pub fn form<'a>(&'a self, to: &'a str, body: &'a str) -> [(&'static str, &'a str); 3] {
        [("To", to), ("From", self.from.as_str()), ("Body", body)]
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
        let response = self
            .http
            .post(&self.api_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&self.form(to, body))
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!("SMS queued by Twilio");
            Ok(())
        } else {
            let status_code = status.as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            warn!(status = status_code, body = %body, "Twilio API returned error");
            Err(DeliveryError::Provider {
                status: status_code,
                body,
            })
        }
    }
}
