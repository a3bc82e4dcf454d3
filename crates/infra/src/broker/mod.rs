mod publisher;
mod topology;

use care_reminder_domain::MalformedMessage;
use lapin::{
    options::{BasicConsumeOptions, BasicQosOptions, ConfirmSelectOptions},
    types::FieldTable,
    Channel, Connection, ConnectionProperties, Consumer,
};
pub use publisher::{AmqpReminderPublisher, IReminderPublisher, InMemoryReminderPublisher};
use thiserror::Error;
pub use topology::{Topology, REMINDERS_DLQ, REMINDERS_DLX, REMINDERS_EXCHANGE, REMINDERS_QUEUE};
use tracing::{info, warn};

const CONSUMER_TAG: &str = "care_reminder_worker";

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),
    #[error("Timed out waiting for the broker to confirm a publish")]
    PublishTimeout,
    #[error("The broker refused to take the published message")]
    PublishNacked,
    #[error("Publisher confirms are not enabled on the channel")]
    ConfirmsNotEnabled,
    #[error(transparent)]
    Serialize(#[from] MalformedMessage),
}

/// Connection to the message broker. Publishing and consuming use
/// separate channels so a slow consumer never blocks the producer.
pub struct AmqpBroker {
    connection: Connection,
    publish_channel: Channel,
    consume_channel: Channel,
}

impl AmqpBroker {
    /// Connects and declares the reminder topology
    pub async fn connect(uri: &str, topology: &Topology) -> Result<Self, BrokerError> {
        info!("AMQP CHECKING CONNECTION ...");
        let connection = Connection::connect(uri, ConnectionProperties::default()).await?;
        info!("AMQP CHECKING CONNECTION ... [done]");

        let publish_channel = connection.create_channel().await?;
        topology.declare(&publish_channel).await?;
        publish_channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        let consume_channel = connection.create_channel().await?;
        // One unacknowledged message at a time per worker
        consume_channel
            .basic_qos(1, BasicQosOptions::default())
            .await?;

        Ok(Self {
            connection,
            publish_channel,
            consume_channel,
        })
    }

    pub fn publisher(&self) -> AmqpReminderPublisher {
        AmqpReminderPublisher::new(self.publish_channel.clone())
    }

    pub async fn consume(&self) -> Result<Consumer, BrokerError> {
        let consumer = self
            .consume_channel
            .basic_consume(
                REMINDERS_QUEUE,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        info!(queue = REMINDERS_QUEUE, "Consumer started");
        Ok(consumer)
    }

    /// Closes the channels and then the connection. Failures are logged,
    /// there is nothing left to do about them at this point.
    pub async fn close(&self) {
        for channel in [&self.consume_channel, &self.publish_channel] {
            if let Err(e) = channel.close(200, "Worker shutting down").await {
                warn!("Unable to close AMQP channel. Error: {:?}", e);
            }
        }
        if let Err(e) = self.connection.close(200, "Worker shutting down").await {
            warn!("Unable to close AMQP connection. Error: {:?}", e);
        }
        info!("AMQP connection closed");
    }
}
