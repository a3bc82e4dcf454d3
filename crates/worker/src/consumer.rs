use crate::reminder::deliver_reminder::{
    DeliverReminderUseCase, ReminderOutcome, UseCaseError,
};
use crate::shared::usecase::execute;
use care_reminder_domain::ReminderMessage;
use care_reminder_infra::ReminderContext;
use futures::StreamExt;
use lapin::{
    options::{BasicAckOptions, BasicNackOptions},
    Consumer,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What to tell the broker about a processed delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryAction {
    Ack,
    /// `requeue: false` dead letters the message, which brings it back
    /// after the retry delay. `requeue: true` redelivers it right away.
    Nack { requeue: bool },
}

impl DeliveryAction {
    pub fn from_result(res: &Result<ReminderOutcome, UseCaseError>) -> Self {
        match res {
            Ok(_) => Self::Ack,
            Err(UseCaseError::NotYetDue { .. }) => Self::Nack { requeue: false },
            // Waiting will never make the payload parseable
            Err(UseCaseError::MalformedMessage(_)) => Self::Ack,
            Err(UseCaseError::Storage(_)) => Self::Nack { requeue: true },
        }
    }
}

/// Runs a single delivery body through the reminder pipeline
pub async fn handle_delivery(body: &[u8], ctx: &ReminderContext) -> DeliveryAction {
    let res = match ReminderMessage::from_slice(body) {
        Ok(message) => {
            info!(
                schedule_type = %message.schedule_type,
                schedule_id = %message.schedule_id,
                time_slot = ?message.time_slot,
                "Reminder message received"
            );
            execute(DeliverReminderUseCase::from_message(&message), ctx).await
        }
        Err(e) => {
            error!(
                body = %String::from_utf8_lossy(body),
                "Dropping reminder message. Error: {}",
                e
            );
            Err(UseCaseError::MalformedMessage(e))
        }
    };

    match &res {
        Ok(ReminderOutcome::Dispatched(report)) => info!(
            attempted = report.attempted,
            delivered = report.delivered,
            "Reminder dispatched"
        ),
        Ok(ReminderOutcome::Discarded(reason)) => info!(?reason, "Reminder discarded"),
        Err(UseCaseError::NotYetDue { due_at }) => {
            debug!(due_at = %due_at, "Reminder deferred until due")
        }
        Err(UseCaseError::MalformedMessage(_)) => {}
        Err(e) => error!("Reminder delivery failed. Error: {}", e),
    }

    DeliveryAction::from_result(&res)
}

/// Processes deliveries one at a time until the stream ends or `token` is
/// cancelled. Cancellation is only observed between deliveries, so the
/// message in flight is always acknowledged.
pub async fn run_consumer(mut consumer: Consumer, ctx: ReminderContext, token: CancellationToken) {
    loop {
        let delivery = tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!("Consumer stopping");
                break;
            }
            delivery = consumer.next() => delivery,
        };

        let delivery = match delivery {
            Some(Ok(delivery)) => delivery,
            Some(Err(e)) => {
                error!("Reminder consumer failed. Error: {:?}", e);
                break;
            }
            None => {
                warn!("Reminder delivery stream closed");
                break;
            }
        };

        let action = handle_delivery(&delivery.data, &ctx).await;
        let res = match action {
            DeliveryAction::Ack => delivery.acker.ack(BasicAckOptions::default()).await,
            DeliveryAction::Nack { requeue } => {
                delivery
                    .acker
                    .nack(BasicNackOptions {
                        requeue,
                        multiple: false,
                    })
                    .await
            }
        };
        if let Err(e) = res {
            error!(?action, "Unable to settle reminder delivery. Error: {:?}", e);
        }
    }
}
