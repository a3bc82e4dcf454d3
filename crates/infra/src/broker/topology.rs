use lapin::{
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::{AMQPValue, FieldTable},
    Channel, ExchangeKind,
};
use tracing::info;

/// Exchange reminder messages are published to
pub const REMINDERS_EXCHANGE: &str = "reminders_exchange";
/// Queue the worker consumes from
pub const REMINDERS_QUEUE: &str = "reminders_queue";
/// Receives messages rejected from `REMINDERS_QUEUE` without requeue
pub const REMINDERS_DLX: &str = "reminders_dlx";
/// Holds rejected messages for the retry delay before they are routed
/// back to `REMINDERS_EXCHANGE`
pub const REMINDERS_DLQ: &str = "reminders_dlq";

/// The delayed redelivery loop. A message that is not yet due is
/// rejected from the main queue, parks in the dead letter queue until
/// its ttl runs out and is then dead lettered back to the main exchange.
#[derive(Debug, Clone)]
pub struct Topology {
    pub retry_delay_millis: u32,
}

impl Topology {
    pub fn new(retry_delay_millis: u32) -> Self {
        Self { retry_delay_millis }
    }

    pub fn main_queue_args(&self) -> FieldTable {
        let mut args = FieldTable::default();
        args.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString(REMINDERS_DLX.into()),
        );
        args
    }

    pub fn dead_letter_queue_args(&self) -> FieldTable {
        let ttl = i32::try_from(self.retry_delay_millis).unwrap_or(i32::MAX);
        let mut args = FieldTable::default();
        args.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString(REMINDERS_EXCHANGE.into()),
        );
        args.insert("x-message-ttl".into(), AMQPValue::LongInt(ttl));
        args
    }

    /// Declares the exchanges, queues and bindings. Declarations are
    /// idempotent as long as the arguments match what already exists on
    /// the broker.
    pub async fn declare(&self, channel: &Channel) -> Result<(), lapin::Error> {
        for exchange in [REMINDERS_EXCHANGE, REMINDERS_DLX] {
            channel
                .exchange_declare(
                    exchange,
                    ExchangeKind::Direct,
                    ExchangeDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await?;
        }

        for (queue, args) in [
            (REMINDERS_QUEUE, self.main_queue_args()),
            (REMINDERS_DLQ, self.dead_letter_queue_args()),
        ] {
            channel
                .queue_declare(
                    queue,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    args,
                )
                .await?;
        }

        channel
            .queue_bind(
                REMINDERS_QUEUE,
                REMINDERS_EXCHANGE,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        channel
            .queue_bind(
                REMINDERS_DLQ,
                REMINDERS_DLX,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        info!(
            retry_delay_millis = self.retry_delay_millis,
            "Reminder topology declared"
        );
        Ok(())
    }
}
