use super::{IPushNotifier, PushError};
use care_reminder_domain::Notification;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq)]
pub struct SentPush {
    pub device_token: String,
    pub notification: Notification,
}

/// Records every push instead of sending it. Tokens registered with
/// `fail_for` are rejected.
pub struct InMemoryPushNotifier {
    sent: Mutex<Vec<SentPush>>,
    failing_tokens: Mutex<HashSet<String>>,
}

impl InMemoryPushNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing_tokens: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_for(&self, device_token: &str) {
        self.failing_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device_token.to_string());
    }

    /// Successfully delivered pushes in the order they were sent
    pub fn sent(&self) -> Vec<SentPush> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for InMemoryPushNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IPushNotifier for InMemoryPushNotifier {
    async fn send(&self, device_token: &str, notification: &Notification) -> Result<String, PushError> {
        let failing = self
            .failing_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(device_token);
        if failing {
            return Err(PushError::Rejected {
                status: 404,
                body: "UNREGISTERED".into(),
            });
        }

        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        sent.push(SentPush {
            device_token: device_token.to_string(),
            notification: notification.clone(),
        });
        Ok(format!("projects/test/messages/{}", sent.len()))
    }
}
