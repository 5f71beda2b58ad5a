//! Fallback sender that only logs.
//!
//! Used when no provider is configured, so a development server can still
//! walk through registration by reading codes from the log.

use async_trait::async_trait;
use tracing::warn;

use super::{DeliveryError, EmailSender, SmsSender};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

#[async_trait]
impl EmailSender for LogSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        warn!(to, subject, body, "No mail provider configured; message logged only");
        Ok(())
    }
}

#[async_trait]
impl SmsSender for LogSender {
    async fn send(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
        warn!(to, body, "No SMS provider configured; message logged only");
        Ok(())
    }
}
