use super::publish_schedule_reminders::{PublishScheduleRemindersUseCase, ScheduleOperation};
use crate::shared::usecase::{execute, UseCase};
use care_reminder_domain::{ReminderSchedule, ScheduleType, ID};
use care_reminder_infra::ReminderContext;
use chrono::NaiveDate;
use tracing::error;

/// Applies a date or activation change to a stored schedule and
/// republishes its reminders if it is active. Sent flags are cleared only
/// when the date moves or the schedule is reactivated. Messages still in flight for the
/// old state are discarded by the consumer when they come due.
#[derive(Debug)]
pub struct RescheduleUseCase {
    pub schedule_type: ScheduleType,
    pub schedule_id: ID,
    pub date: NaiveDate,
    pub is_active: bool,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(ScheduleType, ID),
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for RescheduleUseCase {
    type Response = ReminderSchedule;

    type Error = UseCaseError;

    const NAME: &'static str = "Reschedule";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Error> {
        let mut schedule = ctx
            .repos
            .find_schedule(self.schedule_type, &self.schedule_id)
            .await
            .map_err(|e| {
                error!("Unable to find schedule {}. Err: {:?}", self.schedule_id, e);
                UseCaseError::StorageError
            })?
            .ok_or(UseCaseError::NotFound(self.schedule_type, self.schedule_id))?;

        schedule.reschedule(self.date, self.is_active);
        ctx.repos.save_schedule(&schedule).await.map_err(|e| {
            error!("Unable to save schedule {}. Err: {:?}", self.schedule_id, e);
            UseCaseError::StorageError
        })?;

        // Republished on every edit of an active schedule so a reminder
        // whose earlier publish failed gets another chance. Duplicates are
        // discarded by the consumer once the flag is set.
        let usecase = PublishScheduleRemindersUseCase {
            schedule: &schedule,
            operation: ScheduleOperation::Updated,
        };
        // Publishing cannot fail, failures are logged per message
        let _ = execute(usecase, ctx).await;

        Ok(schedule)
    }
}
