use super::dispatcher::{dispatch_to_devices, DispatchReport};
use crate::shared::usecase::UseCase;
use care_reminder_domain::{
    due_time::{due_instant, is_stale, parse_timezone},
    MalformedMessage, ReminderMessage, ReminderSlot, ScheduleType, ID,
};
use care_reminder_infra::ReminderContext;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{info, warn};

/// Resolves, checks and dispatches one reminder of one schedule and marks
/// it as sent. Both the broker consumer and the daily sweep go through
/// this use case.
#[derive(Debug)]
pub struct DeliverReminderUseCase {
    pub schedule_type: ScheduleType,
    pub schedule_id: ID,
    /// `None` if the message named a slot that does not exist
    pub slot: Option<ReminderSlot>,
    pub trigger: ReminderTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderTrigger {
    /// A reminder message was delivered by the broker. The due instant
    /// and the schedule date are checked before dispatching.
    Queue,
    /// The daily sweep selected the schedule. It only selects schedules
    /// dated today, so there is nothing to wait for.
    DailySweep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    UnknownSlot,
    ScheduleNotFound,
    UserNotFound,
    Inactive,
    /// The slot was disabled or never belonged to the schedule
    SlotNotCarried,
    AlreadySent,
    PastDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderOutcome {
    Dispatched(DispatchReport),
    Discarded(DiscardReason),
}

#[derive(Error, Debug)]
pub enum UseCaseError {
    /// The reminder is valid but must not be sent yet
    #[error("Reminder is not due before {due_at}")]
    NotYetDue { due_at: DateTime<Utc> },
    #[error(transparent)]
    MalformedMessage(#[from] MalformedMessage),
    #[error("Storage error: {0}")]
    Storage(anyhow::Error),
}

impl DeliverReminderUseCase {
    pub fn from_message(message: &ReminderMessage) -> Self {
        Self {
            schedule_type: message.schedule_type,
            schedule_id: message.schedule_id,
            slot: message.reminder_slot(),
            trigger: ReminderTrigger::Queue,
        }
    }
}

/// Parses the timezone of a user, unknown names are treated as UTC
fn user_timezone(user_id: &ID, timezone: &str) -> Tz {
    match parse_timezone(timezone) {
        Ok(tz) => tz,
        Err(e) => {
            warn!(user_id = %user_id, "{} Falling back to UTC.", e);
            chrono_tz::UTC
        }
    }
}

#[async_trait::async_trait]
impl UseCase for DeliverReminderUseCase {
    type Response = ReminderOutcome;

    type Error = UseCaseError;

    const NAME: &'static str = "DeliverReminder";

    async fn execute(&mut self, ctx: &ReminderContext) -> Result<Self::Response, Self::Error> {
        let slot = match self.slot {
            Some(slot) => slot,
            None => return Ok(ReminderOutcome::Discarded(DiscardReason::UnknownSlot)),
        };

        let mut schedule = match ctx
            .repos
            .find_schedule(self.schedule_type, &self.schedule_id)
            .await
            .map_err(UseCaseError::Storage)?
        {
            Some(schedule) => schedule,
            None => return Ok(ReminderOutcome::Discarded(DiscardReason::ScheduleNotFound)),
        };

        let user = match ctx
            .repos
            .users
            .find(schedule.owner_id())
            .await
            .map_err(UseCaseError::Storage)?
        {
            Some(user) => user,
            None => return Ok(ReminderOutcome::Discarded(DiscardReason::UserNotFound)),
        };

        if !schedule.is_active() {
            return Ok(ReminderOutcome::Discarded(DiscardReason::Inactive));
        }
        if !schedule.carries_slot(slot) {
            return Ok(ReminderOutcome::Discarded(DiscardReason::SlotNotCarried));
        }
        if schedule.is_slot_sent(slot) {
            return Ok(ReminderOutcome::Discarded(DiscardReason::AlreadySent));
        }

        if self.trigger == ReminderTrigger::Queue {
            let tz = user_timezone(&user.id, &user.timezone);
            let now = ctx.sys.now();
            if is_stale(schedule.schedule_type(), schedule.due_date(), &tz, now) {
                return Ok(ReminderOutcome::Discarded(DiscardReason::PastDate));
            }
            let due_at = due_instant(schedule.due_date(), slot, &tz);
            if now < due_at {
                return Err(UseCaseError::NotYetDue { due_at });
            }
        }

        let notification = match schedule.notification(slot) {
            Some(notification) => notification,
            None => return Ok(ReminderOutcome::Discarded(DiscardReason::SlotNotCarried)),
        };
        if let Err(e) = schedule.mark_slot_sent(slot) {
            warn!("{}", e);
            return Ok(ReminderOutcome::Discarded(DiscardReason::SlotNotCarried));
        }

        let devices = ctx
            .repos
            .devices
            .find_by_user(&user.id)
            .await
            .map_err(UseCaseError::Storage)?;
        if devices.is_empty() {
            info!(user_id = %user.id, "User has no registered devices");
        }
        let report = dispatch_to_devices(&devices, &notification, ctx.push.as_ref()).await;

        // Failing here redelivers the message, which may notify the user
        // twice but never loses the sent flag
        ctx.repos
            .save_schedule(&schedule)
            .await
            .map_err(UseCaseError::Storage)?;

        Ok(ReminderOutcome::Dispatched(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::usecase::execute;
    use care_reminder_domain::{
        due_time::redeliveries_until_due, ControlSchedule, Device, DrugSchedule,
        HemodialysisSchedule, MedicationRefillSchedule, ReminderSchedule, TimeSlot, User,
    };
    use care_reminder_infra::{IDeviceRepo, InMemoryPushNotifier, StaticTimeSys};
    use chrono::{Duration, NaiveDate, TimeZone};
    use std::sync::Arc;

    struct TestContext {
        ctx: ReminderContext,
        push: Arc<InMemoryPushNotifier>,
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    async fn setup(now: DateTime<Utc>, timezone: &str, device_tokens: &[&str]) -> TestContext {
        let mut ctx = ReminderContext::create_inmemory();
        ctx.sys = Arc::new(StaticTimeSys(now));
        let push = Arc::new(InMemoryPushNotifier::new());
        ctx.push = push.clone();

        let user = User::new(ID::new(1), timezone);
        ctx.repos.users.insert(&user).await.unwrap();
        for (i, token) in device_tokens.iter().enumerate() {
            let device = Device::new(ID::new(i as i64 + 1), user.id, *token);
            ctx.repos.devices.insert(&device).await.unwrap();
        }

        TestContext { ctx, push }
    }

    fn at(ctx: &ReminderContext, now: DateTime<Utc>) -> ReminderContext {
        let mut ctx = ctx.clone();
        ctx.sys = Arc::new(StaticTimeSys(now));
        ctx
    }

    fn drug_schedule(schedule_date: NaiveDate) -> DrugSchedule {
        let mut schedule = DrugSchedule::new(ID::new(1), ID::new(1), "Amlodipine", "5mg", schedule_date);
        schedule.set_slots(true, false, true);
        schedule
    }

    fn dose_usecase(slot: TimeSlot) -> DeliverReminderUseCase {
        DeliverReminderUseCase::from_message(&ReminderMessage::for_time_slot(ID::new(1), slot))
    }

    fn day_before_usecase(schedule_type: ScheduleType) -> DeliverReminderUseCase {
        DeliverReminderUseCase::from_message(&ReminderMessage::new(schedule_type, ID::new(1)))
    }

    async fn stored(ctx: &ReminderContext, schedule_type: ScheduleType) -> ReminderSchedule {
        ctx.repos
            .find_schedule(schedule_type, &ID::new(1))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn it_dispatches_a_due_dose_and_marks_the_slot_sent() {
        // 05:30 in Makassar, the 06:00 dose is due from 05:00
        let t = setup(utc(2025, 3, 9, 21, 30), "Asia/Makassar", &["token-1"]).await;
        t.ctx
            .repos
            .drug_schedules
            .insert(&drug_schedule(date(2025, 3, 10)))
            .await
            .unwrap();

        let res = execute(dose_usecase(TimeSlot::Morning), &t.ctx).await.unwrap();
        assert!(matches!(res, ReminderOutcome::Dispatched(report) if report.delivered == 1));

        let sent = t.push.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].device_token, "token-1");
        assert!(sent[0].notification.body.contains("Amlodipine"));

        let schedule = stored(&t.ctx, ScheduleType::Drug).await;
        assert!(schedule.is_slot_sent(ReminderSlot::Dose(TimeSlot::Morning)));
        assert!(!schedule.is_slot_sent(ReminderSlot::Dose(TimeSlot::Evening)));
    }

    #[tokio::test]
    async fn it_defers_a_reminder_that_is_not_due() {
        let t = setup(utc(2025, 3, 9, 20, 59), "Asia/Makassar", &["token-1"]).await;
        t.ctx
            .repos
            .drug_schedules
            .insert(&drug_schedule(date(2025, 3, 10)))
            .await
            .unwrap();

        let res = execute(dose_usecase(TimeSlot::Morning), &t.ctx).await;
        match res {
            Err(UseCaseError::NotYetDue { due_at }) => assert_eq!(due_at, utc(2025, 3, 9, 21, 0)),
            other => panic!("Expected the reminder to be deferred, got {:?}", other),
        }
        assert!(t.push.sent().is_empty());
        let schedule = stored(&t.ctx, ScheduleType::Drug).await;
        assert!(!schedule.is_slot_sent(ReminderSlot::Dose(TimeSlot::Morning)));
    }

    #[tokio::test]
    async fn redelivering_a_sent_reminder_dispatches_nothing() {
        let t = setup(utc(2025, 3, 9, 21, 30), "Asia/Makassar", &["token-1", "token-2"]).await;
        t.ctx
            .repos
            .drug_schedules
            .insert(&drug_schedule(date(2025, 3, 10)))
            .await
            .unwrap();

        execute(dose_usecase(TimeSlot::Evening), &at(&t.ctx, utc(2025, 3, 10, 9, 30)))
            .await
            .unwrap();
        assert_eq!(t.push.sent().len(), 2);

        for _ in 0..5 {
            let res = execute(dose_usecase(TimeSlot::Evening), &at(&t.ctx, utc(2025, 3, 10, 9, 31)))
                .await
                .unwrap();
            assert_eq!(res, ReminderOutcome::Discarded(DiscardReason::AlreadySent));
        }
        assert_eq!(t.push.sent().len(), 2);
    }

    #[tokio::test]
    async fn toggling_a_sent_slot_does_not_send_it_again() {
        let t = setup(utc(2025, 3, 9, 21, 30), "Asia/Makassar", &["token-1"]).await;
        t.ctx
            .repos
            .drug_schedules
            .insert(&drug_schedule(date(2025, 3, 10)))
            .await
            .unwrap();

        execute(dose_usecase(TimeSlot::Morning), &t.ctx).await.unwrap();
        assert_eq!(t.push.sent().len(), 1);

        let mut schedule = match stored(&t.ctx, ScheduleType::Drug).await {
            ReminderSchedule::Drug(s) => s,
            other => panic!("Expected a drug schedule, got {:?}", other),
        };
        schedule.set_slots(false, false, true);
        schedule.set_slots(true, false, true);
        t.ctx.repos.drug_schedules.save(&schedule).await.unwrap();

        let res = execute(dose_usecase(TimeSlot::Morning), &t.ctx).await.unwrap();
        assert_eq!(res, ReminderOutcome::Discarded(DiscardReason::AlreadySent));
        assert_eq!(t.push.sent().len(), 1);
    }

    #[tokio::test]
    async fn redeliveries_converge_on_the_due_instant() {
        let start = utc(2025, 3, 8, 22, 17);
        let delay = Duration::milliseconds(60_000);
        let t = setup(start, "Asia/Makassar", &["token-1"]).await;
        let control = ControlSchedule::new(ID::new(1), ID::new(1), date(2025, 3, 10));
        t.ctx.repos.control_schedules.insert(&control).await.unwrap();

        // Due 2025-03-09 07:00 in Makassar
        let due = utc(2025, 3, 8, 23, 0);
        let expected = redeliveries_until_due(start, due, delay);
        assert_eq!(expected, 43);

        let mut now = start;
        let mut redeliveries = 0;
        loop {
            let res = execute(day_before_usecase(ScheduleType::Control), &at(&t.ctx, now)).await;
            match res {
                Err(UseCaseError::NotYetDue { due_at }) => {
                    assert_eq!(due_at, due);
                    assert!(t.push.sent().is_empty());
                    now += delay;
                    redeliveries += 1;
                }
                Ok(ReminderOutcome::Dispatched(_)) => break,
                other => panic!("Unexpected outcome {:?}", other),
            }
        }
        assert_eq!(redeliveries, expected);
        assert_eq!(t.push.sent().len(), 1);
    }

    #[tokio::test]
    async fn invalid_timezone_resolves_as_utc() {
        let t = setup(utc(2025, 3, 10, 4, 59), "Mars/Olympus", &["token-1"]).await;
        t.ctx
            .repos
            .drug_schedules
            .insert(&drug_schedule(date(2025, 3, 10)))
            .await
            .unwrap();

        match execute(dose_usecase(TimeSlot::Morning), &t.ctx).await {
            Err(UseCaseError::NotYetDue { due_at }) => assert_eq!(due_at, utc(2025, 3, 10, 5, 0)),
            other => panic!("Expected the reminder to be deferred, got {:?}", other),
        }

        let res = execute(dose_usecase(TimeSlot::Morning), &at(&t.ctx, utc(2025, 3, 10, 5, 0)))
            .await
            .unwrap();
        assert!(matches!(res, ReminderOutcome::Dispatched(_)));
    }

    #[tokio::test]
    async fn past_dates_are_discarded_except_for_drugs() {
        // 2025-03-11 08:00 in Makassar
        let now = utc(2025, 3, 11, 0, 0);
        let yesterday = date(2025, 3, 10);
        let t = setup(now, "Asia/Makassar", &["token-1"]).await;
        let control = ControlSchedule::new(ID::new(1), ID::new(1), yesterday);
        t.ctx.repos.control_schedules.insert(&control).await.unwrap();
        t.ctx
            .repos
            .drug_schedules
            .insert(&drug_schedule(yesterday))
            .await
            .unwrap();

        let res = execute(day_before_usecase(ScheduleType::Control), &t.ctx)
            .await
            .unwrap();
        assert_eq!(res, ReminderOutcome::Discarded(DiscardReason::PastDate));
        assert!(t.push.sent().is_empty());
        assert!(!stored(&t.ctx, ScheduleType::Control).await.is_slot_sent(ReminderSlot::DayBefore));

        let res = execute(dose_usecase(TimeSlot::Evening), &t.ctx).await.unwrap();
        assert!(matches!(res, ReminderOutcome::Dispatched(_)));
        assert_eq!(t.push.sent().len(), 1);
    }

    #[tokio::test]
    async fn one_failing_device_does_not_stop_the_fan_out() {
        let t = setup(utc(2025, 3, 9, 23, 0), "Asia/Makassar", &["token-1", "token-2", "token-3"]).await;
        t.push.fail_for("token-2");
        let refill = MedicationRefillSchedule::new(ID::new(1), ID::new(1), date(2025, 3, 11));
        t.ctx.repos.medication_refills.insert(&refill).await.unwrap();

        let res = execute(day_before_usecase(ScheduleType::MedicationRefill), &t.ctx)
            .await
            .unwrap();
        assert_eq!(
            res,
            ReminderOutcome::Dispatched(DispatchReport {
                attempted: 3,
                delivered: 2
            })
        );
        assert_eq!(t.push.sent().len(), 2);
        assert!(stored(&t.ctx, ScheduleType::MedicationRefill)
            .await
            .is_slot_sent(ReminderSlot::DayBefore));
    }

    #[tokio::test]
    async fn a_user_without_devices_still_gets_the_flag_set() {
        let t = setup(utc(2025, 3, 9, 23, 0), "Asia/Makassar", &[]).await;
        let session = HemodialysisSchedule::new(ID::new(1), ID::new(1), date(2025, 3, 11));
        t.ctx.repos.hemodialysis_schedules.insert(&session).await.unwrap();

        let res = execute(day_before_usecase(ScheduleType::Hemodialysis), &t.ctx)
            .await
            .unwrap();
        assert!(matches!(res, ReminderOutcome::Dispatched(report) if report.attempted == 0));
        let schedule = stored(&t.ctx, ScheduleType::Hemodialysis).await;
        assert!(schedule.is_slot_sent(ReminderSlot::DayBefore));
        assert!(!schedule.is_slot_sent(ReminderSlot::SameDayMonitoring));
    }

    #[tokio::test]
    async fn stale_lookups_are_discarded() {
        let t = setup(utc(2025, 3, 9, 23, 0), "Asia/Makassar", &["token-1"]).await;

        let res = execute(day_before_usecase(ScheduleType::Control), &t.ctx)
            .await
            .unwrap();
        assert_eq!(res, ReminderOutcome::Discarded(DiscardReason::ScheduleNotFound));

        let orphan = ControlSchedule::new(ID::new(1), ID::new(42), date(2025, 3, 11));
        t.ctx.repos.control_schedules.insert(&orphan).await.unwrap();
        let res = execute(day_before_usecase(ScheduleType::Control), &t.ctx)
            .await
            .unwrap();
        assert_eq!(res, ReminderOutcome::Discarded(DiscardReason::UserNotFound));

        let mut inactive = HemodialysisSchedule::new(ID::new(1), ID::new(1), date(2025, 3, 11));
        inactive.is_active = false;
        t.ctx.repos.hemodialysis_schedules.insert(&inactive).await.unwrap();
        let res = execute(day_before_usecase(ScheduleType::Hemodialysis), &t.ctx)
            .await
            .unwrap();
        assert_eq!(res, ReminderOutcome::Discarded(DiscardReason::Inactive));

        assert!(t.push.sent().is_empty());
    }

    #[tokio::test]
    async fn unknown_and_disabled_slots_are_discarded() {
        let t = setup(utc(2025, 3, 10, 10, 0), "Asia/Makassar", &["token-1"]).await;
        t.ctx
            .repos
            .drug_schedules
            .insert(&drug_schedule(date(2025, 3, 10)))
            .await
            .unwrap();

        let mut usecase = dose_usecase(TimeSlot::Morning);
        usecase.slot = None;
        let res = execute(usecase, &t.ctx).await.unwrap();
        assert_eq!(res, ReminderOutcome::Discarded(DiscardReason::UnknownSlot));

        // Noon is not enabled for the schedule
        let res = execute(dose_usecase(TimeSlot::Noon), &t.ctx).await.unwrap();
        assert_eq!(res, ReminderOutcome::Discarded(DiscardReason::SlotNotCarried));

        // A control schedule has no dose reminders
        let control = ControlSchedule::new(ID::new(1), ID::new(1), date(2025, 3, 11));
        t.ctx.repos.control_schedules.insert(&control).await.unwrap();
        let mut usecase = day_before_usecase(ScheduleType::Control);
        usecase.slot = Some(ReminderSlot::Dose(TimeSlot::Noon));
        let res = execute(usecase, &t.ctx).await.unwrap();
        assert_eq!(res, ReminderOutcome::Discarded(DiscardReason::SlotNotCarried));
        assert!(t.push.sent().is_empty());
    }

    struct FailingDeviceRepo;

    #[async_trait::async_trait]
    impl IDeviceRepo for FailingDeviceRepo {
        async fn insert(&self, _device: &Device) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("database is down"))
        }

        async fn find_by_user(&self, _user_id: &ID) -> anyhow::Result<Vec<Device>> {
            Err(anyhow::anyhow!("database is down"))
        }
    }

    #[tokio::test]
    async fn storage_failures_are_surfaced() {
        let mut t = setup(utc(2025, 3, 9, 23, 0), "Asia/Makassar", &[]).await;
        t.ctx.repos.devices = Arc::new(FailingDeviceRepo);
        let control = ControlSchedule::new(ID::new(1), ID::new(1), date(2025, 3, 11));
        t.ctx.repos.control_schedules.insert(&control).await.unwrap();

        let res = execute(day_before_usecase(ScheduleType::Control), &t.ctx).await;
        assert!(matches!(res, Err(UseCaseError::Storage(_))));
        assert!(!stored(&t.ctx, ScheduleType::Control).await.is_slot_sent(ReminderSlot::DayBefore));
    }
}
