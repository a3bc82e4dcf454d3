use super::deliver_reminder::{DeliverReminderUseCase, ReminderOutcome, ReminderTrigger};
use crate::shared::usecase::{execute, UseCase};
use care_reminder_domain::{due_time::today_in, ReminderSlot, ScheduleType};
use care_reminder_infra::ReminderContext;
use tracing::{error, info};

/// Sends the same day monitoring reminder for every active hemodialysis
/// session taking place today in the server timezone
#[derive(Debug)]
pub struct SendMonitoringRemindersUseCase;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub matched: usize,
    pub dispatched: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub enum UseCaseError {
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for SendMonitoringRemindersUseCase {
    type Response = SweepReport;

    type Error = UseCaseError;

    const NAME: &'static str = "SendMonitoringReminders";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Error> {
        let today = today_in(&ctx.config.server_timezone, ctx.sys.now());
        info!(date = %today, "Monitoring reminder sweep started");

        let schedules = ctx
            .repos
            .hemodialysis_schedules
            .find_for_monitoring(today)
            .await
            .map_err(|e| {
                error!("Unable to find hemodialysis schedules for {}. Err: {:?}", today, e);
                UseCaseError::StorageError
            })?;

        let mut report = SweepReport {
            matched: schedules.len(),
            ..Default::default()
        };
        info!(matched = report.matched, "Hemodialysis schedules awaiting monitoring reminder");

        for schedule in schedules {
            let usecase = DeliverReminderUseCase {
                schedule_type: ScheduleType::Hemodialysis,
                schedule_id: schedule.id,
                slot: Some(ReminderSlot::SameDayMonitoring),
                trigger: ReminderTrigger::DailySweep,
            };
            match execute(usecase, ctx).await {
                Ok(ReminderOutcome::Dispatched(_)) => report.dispatched += 1,
                Ok(ReminderOutcome::Discarded(reason)) => {
                    info!(schedule_id = %schedule.id, ?reason, "Monitoring reminder discarded")
                }
                Err(e) => {
                    report.failed += 1;
                    error!(
                        schedule_id = %schedule.id,
                        "Unable to send monitoring reminder. Error: {}",
                        e
                    );
                }
            }
        }

        info!(
            matched = report.matched,
            dispatched = report.dispatched,
            failed = report.failed,
            "Monitoring reminder sweep finished"
        );
        Ok(report)
    }
}
