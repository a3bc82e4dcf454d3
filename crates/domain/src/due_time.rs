use crate::schedule::{ReminderSlot, ScheduleType};
use chrono::{prelude::*, Duration, LocalResult};
use chrono_tz::Tz;
use thiserror::Error;

/// Hour of the day before the scheduled date at which day-before
/// reminders become deliverable
pub const DAY_BEFORE_REMINDER_HOUR: i64 = 7;

/// How long before a dosing slot the dose reminder becomes deliverable
pub const DOSE_REMINDER_LEAD_HOURS: i64 = 1;

#[derive(Error, Debug, PartialEq)]
#[error("Invalid timezone: {0}. It should be a valid IANA TimeZone.")]
pub struct InvalidTimezone(pub String);

pub fn parse_timezone(name: &str) -> Result<Tz, InvalidTimezone> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| InvalidTimezone(name.to_string()))
}

/// Converts a wall clock time in `tz` to an absolute instant. Ambiguous
/// times (clocks turned back) resolve to the earliest instant, times that
/// do not exist (clocks turned forward) are moved forward by an hour.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => match tz.from_local_datetime(&(naive + Duration::hours(1))) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
            LocalResult::None => tz.from_utc_datetime(&naive),
        },
    };
    local.with_timezone(&Utc)
}

fn at_hour(date: NaiveDate, hour: i64) -> NaiveDateTime {
    NaiveDateTime::new(date, NaiveTime::default()) + Duration::hours(hour)
}

/// The instant before which the reminder of `slot` for a schedule dated
/// `date` must not be dispatched.
///
/// - dose reminders: one hour before the dosing hour on `date`
/// - day-before reminders: 07:00 on the day before `date`
/// - same day monitoring reminders: midnight starting `date`
pub fn due_instant(date: NaiveDate, slot: ReminderSlot, tz: &Tz) -> DateTime<Utc> {
    match slot {
        ReminderSlot::Dose(time_slot) => {
            let slot_start = localize(tz, at_hour(date, time_slot.hour() as i64));
            slot_start - Duration::hours(DOSE_REMINDER_LEAD_HOURS)
        }
        ReminderSlot::DayBefore => localize(
            tz,
            at_hour(date - Duration::days(1), DAY_BEFORE_REMINDER_HOUR),
        ),
        ReminderSlot::SameDayMonitoring => localize(tz, at_hour(date, 0)),
    }
}

/// The calendar date of `now` as seen in `tz`
pub fn today_in(tz: &Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(tz).date_naive()
}

/// Whether a reminder for a schedule of `schedule_type` dated `date` is
/// stale and should be discarded. Only dates strictly before today in the
/// recipient's timezone are stale, and never for drug schedules.
pub fn is_stale(schedule_type: ScheduleType, date: NaiveDate, tz: &Tz, now: DateTime<Utc>) -> bool {
    schedule_type.discards_past_dates() && date < today_in(tz, now)
}

/// Number of redeliveries with a fixed `delay` needed before a reminder
/// due at `due` starting from `now` is deliverable.
pub fn redeliveries_until_due(now: DateTime<Utc>, due: DateTime<Utc>, delay: Duration) -> i64 {
    let remaining = (due - now).num_milliseconds();
    let step = delay.num_milliseconds();
    if remaining <= 0 || step <= 0 {
        return 0;
    }
    (remaining + step - 1) / step
}

/// The next instant strictly after `now` at which the wall clock in `tz`
/// shows `time`.
pub fn next_daily_run(now: DateTime<Utc>, tz: &Tz, time: NaiveTime) -> DateTime<Utc> {
    let today = today_in(tz, now);
    let candidate = localize(tz, NaiveDateTime::new(today, time));
    if candidate > now {
        candidate
    } else {
        localize(tz, NaiveDateTime::new(today + Duration::days(1), time))
    }
}
