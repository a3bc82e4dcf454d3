mod consumer;
mod job_schedulers;
mod reminder;
mod shared;

use care_reminder_infra::{AmqpBroker, ReminderContext};
use consumer::run_consumer;
use job_schedulers::start_monitoring_reminders_job;
use anyhow::anyhow;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use consumer::{handle_delivery, DeliveryAction};
pub use reminder::deliver_reminder::{
    DeliverReminderUseCase, DiscardReason, ReminderOutcome, ReminderTrigger,
};
pub use reminder::dispatcher::{dispatch_to_devices, DispatchReport};
pub use reminder::publish_schedule_reminders::{
    PublishReport, PublishScheduleRemindersUseCase, ScheduleOperation,
};
pub use reminder::reschedule::RescheduleUseCase;
pub use reminder::send_monitoring_reminders::{SendMonitoringRemindersUseCase, SweepReport};
pub use shared::usecase::{execute, UseCase};

/// The reminder worker: consumes reminder messages and runs the daily
/// monitoring sweep until shut down
pub struct Application {
    context: ReminderContext,
    broker: AmqpBroker,
    token: CancellationToken,
}

impl Application {
    pub fn new(context: ReminderContext, broker: AmqpBroker) -> Self {
        Self {
            context,
            broker,
            token: CancellationToken::new(),
        }
    }

    /// Runs until `shutdown` resolves or the consumer stops on its own,
    /// then stops the consumer and the sweep and closes the broker
    /// connection.
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let consumer = self.broker.consume().await?;
        let mut consumer_handle = tokio::spawn(run_consumer(
            consumer,
            self.context.clone(),
            self.token.clone(),
        ));
        let sweep_handle = start_monitoring_reminders_job(self.context.clone(), self.token.clone());

        let stop = wait_for_stop(shutdown, &mut consumer_handle).await;
        self.token.cancel();

        if stop == StopReason::Signal {
            let shutdown_timeout = self.context.config.shutdown_timeout;
            match tokio::time::timeout(shutdown_timeout, consumer_handle).await {
                Ok(Ok(())) => info!("Reminder consumer stopped"),
                Ok(Err(e)) => error!("Reminder consumer panicked. Error: {:?}", e),
                Err(_) => warn!(
                    "Reminder consumer did not stop within {:?}, the message in flight will be redelivered",
                    shutdown_timeout
                ),
            }
        }

        if let Err(e) = sweep_handle.await {
            error!("Monitoring reminder job panicked. Error: {:?}", e);
        }

        self.broker.close().await;
        info!("Shutdown complete");
        stop.into_result()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Signal,
    ConsumerStopped,
}

impl StopReason {
    /// A consumer that stopped on its own is a failure, the process exits
    /// with an error so it gets restarted
    fn into_result(self) -> anyhow::Result<()> {
        match self {
            Self::Signal => Ok(()),
            Self::ConsumerStopped => Err(anyhow!("Reminder consumer stopped unexpectedly")),
        }
    }
}

async fn wait_for_stop<F>(shutdown: F, consumer_handle: &mut JoinHandle<()>) -> StopReason
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = shutdown => {
            info!("Shutdown signal received");
            StopReason::Signal
        }
        res = consumer_handle => {
            if let Err(e) = res {
                error!("Reminder consumer panicked. Error: {:?}", e);
            }
            warn!("Reminder consumer stopped, shutting down");
            StopReason::ConsumerStopped
        }
    }
}
