use super::{topology::REMINDERS_EXCHANGE, BrokerError};
use care_reminder_domain::ReminderMessage;
use lapin::{
    options::BasicPublishOptions, publisher_confirm::Confirmation, BasicProperties, Channel,
};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);
const PERSISTENT_DELIVERY_MODE: u8 = 2;

/// Publishes reminder messages to the main reminders exchange
#[async_trait::async_trait]
pub trait IReminderPublisher: Send + Sync {
    async fn publish(&self, message: &ReminderMessage) -> Result<(), BrokerError>;
}

pub struct AmqpReminderPublisher {
    channel: Channel,
}

impl AmqpReminderPublisher {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    /// Publishes on a channel in confirm mode and waits for the broker to
    /// take responsibility for the message
    async fn publish_confirmed(&self, payload: &[u8]) -> Result<(), BrokerError> {
        let confirmation = self
            .channel
            .basic_publish(
                REMINDERS_EXCHANGE,
                "",
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(PERSISTENT_DELIVERY_MODE),
            )
            .await?
            .await?;
        check_confirmation(confirmation)
    }
}

fn check_confirmation(confirmation: Confirmation) -> Result<(), BrokerError> {
    match confirmation {
        Confirmation::Ack(_) => Ok(()),
        Confirmation::Nack(_) => Err(BrokerError::PublishNacked),
        Confirmation::NotRequested => Err(BrokerError::ConfirmsNotEnabled),
    }
}

#[async_trait::async_trait]
impl IReminderPublisher for AmqpReminderPublisher {
    async fn publish(&self, message: &ReminderMessage) -> Result<(), BrokerError> {
        let payload = message.to_vec()?;
        tokio::time::timeout(PUBLISH_TIMEOUT, self.publish_confirmed(&payload))
            .await
            .map_err(|_| BrokerError::PublishTimeout)??;
        debug!(
            schedule_type = %message.schedule_type,
            schedule_id = %message.schedule_id,
            time_slot = ?message.time_slot,
            "Reminder message published"
        );
        Ok(())
    }
}

/// Publisher that keeps the messages in memory
pub struct InMemoryReminderPublisher {
    published: Mutex<Vec<ReminderMessage>>,
}

impl InMemoryReminderPublisher {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn published(&self) -> Vec<ReminderMessage> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for InMemoryReminderPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IReminderPublisher for InMemoryReminderPublisher {
    async fn publish(&self, message: &ReminderMessage) -> Result<(), BrokerError> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}
