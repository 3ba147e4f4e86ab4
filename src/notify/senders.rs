//! Message senders.
//!
//! Only logging senders ship here; real gateways plug in behind the traits.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Delivers an email message.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Delivers a text message.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, phone: &str, message: &str) -> Result<()>;
}

/// Email sender that writes the message to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        info!(target: "gradebook::email", to, subject, "{}", body);
        Ok(())
    }
}

/// SMS sender that writes the message to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSmsSender;

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send_sms(&self, phone: &str, message: &str) -> Result<()> {
        info!(target: "gradebook::sms", phone, "{}", message);
        Ok(())
    }
}
