use crate::shared::usecase::UseCase;
use care_reminder_domain::{Entity, ReminderMessage, ReminderSchedule};
use care_reminder_infra::ReminderContext;
use std::convert::Infallible;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOperation {
    Created,
    Updated,
}

/// Publishes the reminder messages of a created or changed schedule. The
/// schedule write is never rolled back, publish failures are only logged.
#[derive(Debug)]
pub struct PublishScheduleRemindersUseCase<'a> {
    pub schedule: &'a ReminderSchedule,
    pub operation: ScheduleOperation,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PublishReport {
    pub published: Vec<ReminderMessage>,
    pub failed: usize,
}

#[async_trait::async_trait]
impl<'a> UseCase for PublishScheduleRemindersUseCase<'a> {
    type Response = PublishReport;

    type Error = Infallible;

    const NAME: &'static str = "PublishScheduleReminders";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Error> {
        let mut report = PublishReport::default();
        if !self.schedule.is_active() {
            info!(
                schedule_type = %self.schedule.schedule_type(),
                schedule_id = %self.schedule.id(),
                operation = ?self.operation,
                "Schedule is inactive, no reminders published"
            );
            return Ok(report);
        }

        for message in self.schedule.reminder_messages() {
            match ctx.publisher.publish(&message).await {
                Ok(()) => report.published.push(message),
                Err(e) => {
                    report.failed += 1;
                    error!(
                        schedule_type = %message.schedule_type,
                        schedule_id = %message.schedule_id,
                        time_slot = ?message.time_slot,
                        "Unable to publish reminder message. Error: {}",
                        e
                    );
                }
            }
        }

        info!(
            schedule_type = %self.schedule.schedule_type(),
            schedule_id = %self.schedule.id(),
            operation = ?self.operation,
            published = report.published.len(),
            failed = report.failed,
            "Schedule reminders published"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::usecase::execute;
    use care_reminder_domain::{
        ControlSchedule, DrugSchedule, ScheduleType, ID,
    };
    use care_reminder_infra::{BrokerError, IReminderPublisher, InMemoryReminderPublisher};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn setup() -> (ReminderContext, Arc<InMemoryReminderPublisher>) {
        let mut ctx = ReminderContext::create_inmemory();
        let publisher = Arc::new(InMemoryReminderPublisher::new());
        ctx.publisher = publisher.clone();
        (ctx, publisher)
    }

    #[tokio::test]
    async fn drug_schedules_publish_one_message_per_enabled_slot() {
        let (ctx, publisher) = setup();
        let mut drug = DrugSchedule::new(ID::new(7), ID::new(1), "Amlodipine", "5mg", date());
        drug.set_slots(true, false, true);
        let schedule = ReminderSchedule::from(drug);

        let usecase = PublishScheduleRemindersUseCase {
            schedule: &schedule,
            operation: ScheduleOperation::Created,
        };
        let report = execute(usecase, &ctx).await.unwrap();

        let published = publisher.published();
        assert_eq!(published, report.published);
        assert_eq!(published.len(), 2);
        assert!(published
            .iter()
            .all(|m| m.schedule_type == ScheduleType::Drug && m.schedule_id == ID::new(7)));
        let slots = published.iter().map(|m| m.time_slot).collect::<Vec<_>>();
        assert_eq!(slots, vec![Some(6), Some(18)]);
    }

    #[tokio::test]
    async fn other_schedules_publish_a_single_message() {
        let (ctx, publisher) = setup();
        let schedule: ReminderSchedule = ControlSchedule::new(ID::new(3), ID::new(1), date()).into();

        let usecase = PublishScheduleRemindersUseCase {
            schedule: &schedule,
            operation: ScheduleOperation::Updated,
        };
        execute(usecase, &ctx).await.unwrap();
        assert_eq!(
            publisher.published(),
            vec![ReminderMessage::new(ScheduleType::Control, ID::new(3))]
        );
    }

    #[tokio::test]
    async fn inactive_schedules_publish_nothing() {
        let (ctx, publisher) = setup();
        let mut control = ControlSchedule::new(ID::new(3), ID::new(1), date());
        control.is_active = false;
        let schedule = ReminderSchedule::from(control);

        let usecase = PublishScheduleRemindersUseCase {
            schedule: &schedule,
            operation: ScheduleOperation::Updated,
        };
        let report = execute(usecase, &ctx).await.unwrap();
        assert!(report.published.is_empty());
        assert!(publisher.published().is_empty());
    }

    struct UnreachablePublisher;

    #[async_trait::async_trait]
    impl IReminderPublisher for UnreachablePublisher {
        async fn publish(&self, _message: &ReminderMessage) -> Result<(), BrokerError> {
            Err(BrokerError::PublishTimeout)
        }
    }

    #[tokio::test]
    async fn publish_failures_are_not_escalated() {
        let mut ctx = ReminderContext::create_inmemory();
        ctx.publisher = Arc::new(UnreachablePublisher);
        let mut drug = DrugSchedule::new(ID::new(7), ID::new(1), "Amlodipine", "5mg", date());
        drug.set_slots(true, true, true);
        let schedule = ReminderSchedule::from(drug);

        let usecase = PublishScheduleRemindersUseCase {
            schedule: &schedule,
            operation: ScheduleOperation::Created,
        };
        let report = execute(usecase, &ctx).await.unwrap();
        assert_eq!(report.failed, 3);
        assert!(report.published.is_empty());
    }
}
