mod fcm;
mod inmemory;

use care_reminder_domain::Notification;
pub use fcm::{FcmPushNotifier, ServiceAccountKey};
pub use inmemory::{InMemoryPushNotifier, SentPush};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Unable to authorize with the push service: {0}")]
    Auth(String),
    #[error("Push request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Push service rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers a single push notification to a single device token
#[async_trait::async_trait]
pub trait IPushNotifier: Send + Sync {
    /// Returns the delivery id assigned by the push service
    async fn send(&self, device_token: &str, notification: &Notification) -> Result<String, PushError>;
}
