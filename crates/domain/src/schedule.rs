use crate::{
    reminder::{Notification, ReminderMessage},
    shared::entity::{Entity, ID},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// The kinds of schedules that produce reminders. The serialized names
/// are part of the broker payload and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleType {
    #[serde(rename = "DRUG")]
    Drug,
    #[serde(rename = "KONTROL")]
    Control,
    #[serde(rename = "HEMODIALISA")]
    Hemodialysis,
    #[serde(rename = "OBAT_HABIS")]
    MedicationRefill,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drug => "DRUG",
            Self::Control => "KONTROL",
            Self::Hemodialysis => "HEMODIALISA",
            Self::MedicationRefill => "OBAT_HABIS",
        }
    }

    /// Whether a reminder for a schedule dated before "today" should be
    /// dropped. Drug reminders are still evaluated because a late dose
    /// reminder on the same day is still useful.
    pub fn discards_past_dates(&self) -> bool {
        !matches!(self, Self::Drug)
    }
}

impl Display for ScheduleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Unknown schedule type: {0}")]
pub struct InvalidScheduleType(pub String);

impl FromStr for ScheduleType {
    type Err = InvalidScheduleType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRUG" => Ok(Self::Drug),
            "KONTROL" => Ok(Self::Control),
            "HEMODIALISA" => Ok(Self::Hemodialysis),
            "OBAT_HABIS" => Ok(Self::MedicationRefill),
            _ => Err(InvalidScheduleType(s.to_string())),
        }
    }
}

/// Dosing slots of a `DrugSchedule`, identified on the wire by their hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeSlot {
    Morning,
    Noon,
    Evening,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid time slot: {0}. Valid slots are 6, 12 and 18")]
pub struct InvalidTimeSlot(pub i64);

impl TimeSlot {
    pub const ALL: [TimeSlot; 3] = [TimeSlot::Morning, TimeSlot::Noon, TimeSlot::Evening];

    pub fn hour(&self) -> u32 {
        match self {
            Self::Morning => 6,
            Self::Noon => 12,
            Self::Evening => 18,
        }
    }

    pub fn from_hour(hour: i64) -> Result<Self, InvalidTimeSlot> {
        match hour {
            6 => Ok(Self::Morning),
            12 => Ok(Self::Noon),
            18 => Ok(Self::Evening),
            _ => Err(InvalidTimeSlot(hour)),
        }
    }
}

/// A single deliverable reminder of a schedule. Every slot has its own
/// persisted sent flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderSlot {
    /// One hour before a drug dose
    Dose(TimeSlot),
    /// The morning before a control visit, hemodialysis session or refill date
    DayBefore,
    /// Same day prompt to fill in hemodialysis monitoring data
    SameDayMonitoring,
}

impl Display for ReminderSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dose(slot) => write!(f, "dose@{:02}", slot.hour()),
            Self::DayBefore => write!(f, "day-before"),
            Self::SameDayMonitoring => write!(f, "same-day-monitoring"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrugSchedule {
    pub id: ID,
    pub user_id: ID,
    pub drug_name: String,
    pub dose: String,
    pub schedule_date: NaiveDate,
    pub is_active: bool,
    pub at06: bool,
    pub at12: bool,
    pub at18: bool,
    pub at06_sent: bool,
    pub at12_sent: bool,
    pub at18_sent: bool,
}

impl DrugSchedule {
    pub fn new(id: ID, user_id: ID, drug_name: &str, dose: &str, schedule_date: NaiveDate) -> Self {
        Self {
            id,
            user_id,
            drug_name: drug_name.to_string(),
            dose: dose.to_string(),
            schedule_date,
            is_active: true,
            at06: false,
            at12: false,
            at18: false,
            at06_sent: false,
            at12_sent: false,
            at18_sent: false,
        }
    }

    pub fn is_slot_enabled(&self, slot: TimeSlot) -> bool {
        match slot {
            TimeSlot::Morning => self.at06,
            TimeSlot::Noon => self.at12,
            TimeSlot::Evening => self.at18,
        }
    }

    pub fn enabled_slots(&self) -> Vec<TimeSlot> {
        TimeSlot::ALL
            .iter()
            .copied()
            .filter(|slot| self.is_slot_enabled(*slot))
            .collect()
    }

    pub fn is_slot_sent(&self, slot: TimeSlot) -> bool {
        match slot {
            TimeSlot::Morning => self.at06_sent,
            TimeSlot::Noon => self.at12_sent,
            TimeSlot::Evening => self.at18_sent,
        }
    }

    pub fn mark_slot_sent(&mut self, slot: TimeSlot) {
        match slot {
            TimeSlot::Morning => self.at06_sent = true,
            TimeSlot::Noon => self.at12_sent = true,
            TimeSlot::Evening => self.at18_sent = true,
        }
    }

    /// Enables or disables the dosing slots. Sent flags are left alone, a
    /// slot turned off and on again on the same date is not sent twice.
    pub fn set_slots(&mut self, at06: bool, at12: bool, at18: bool) {
        self.at06 = at06;
        self.at12 = at12;
        self.at18 = at18;
    }

    fn clear_sent(&mut self) {
        self.at06_sent = false;
        self.at12_sent = false;
        self.at18_sent = false;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlSchedule {
    pub id: ID,
    pub user_id: ID,
    pub control_date: NaiveDate,
    pub notes: String,
    pub is_active: bool,
    pub notification_sent: bool,
}

impl ControlSchedule {
    pub fn new(id: ID, user_id: ID, control_date: NaiveDate) -> Self {
        Self {
            id,
            user_id,
            control_date,
            notes: String::new(),
            is_active: true,
            notification_sent: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HemodialysisSchedule {
    pub id: ID,
    pub user_id: ID,
    pub schedule_date: NaiveDate,
    pub notes: String,
    pub is_active: bool,
    /// Day-before reminder flag
    pub notification_sent: bool,
    /// Same day monitoring reminder flag, set by the daily sweep
    pub monitoring_notification_sent: bool,
}

impl HemodialysisSchedule {
    pub fn new(id: ID, user_id: ID, schedule_date: NaiveDate) -> Self {
        Self {
            id,
            user_id,
            schedule_date,
            notes: String::new(),
            is_active: true,
            notification_sent: false,
            monitoring_notification_sent: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MedicationRefillSchedule {
    pub id: ID,
    pub user_id: ID,
    pub refill_date: NaiveDate,
    pub is_active: bool,
    pub notification_sent: bool,
}

impl MedicationRefillSchedule {
    pub fn new(id: ID, user_id: ID, refill_date: NaiveDate) -> Self {
        Self {
            id,
            user_id,
            refill_date,
            is_active: true,
            notification_sent: false,
        }
    }
}

/// Any schedule that produces reminders. The reminder pipeline is written
/// once against this type instead of once per schedule kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ReminderSchedule {
    Drug(DrugSchedule),
    Control(ControlSchedule),
    Hemodialysis(HemodialysisSchedule),
    MedicationRefill(MedicationRefillSchedule),
}

#[derive(Error, Debug, PartialEq)]
#[error("Schedule of type {schedule_type} has no reminder slot {slot}")]
pub struct SlotMismatch {
    pub schedule_type: ScheduleType,
    pub slot: ReminderSlot,
}

impl ReminderSchedule {
    pub fn schedule_type(&self) -> ScheduleType {
        match self {
            Self::Drug(_) => ScheduleType::Drug,
            Self::Control(_) => ScheduleType::Control,
            Self::Hemodialysis(_) => ScheduleType::Hemodialysis,
            Self::MedicationRefill(_) => ScheduleType::MedicationRefill,
        }
    }

    pub fn owner_id(&self) -> &ID {
        match self {
            Self::Drug(s) => &s.user_id,
            Self::Control(s) => &s.user_id,
            Self::Hemodialysis(s) => &s.user_id,
            Self::MedicationRefill(s) => &s.user_id,
        }
    }

    /// The calendar date the schedule is about. It has no time of day,
    /// the due instant of a reminder is derived from it.
    pub fn due_date(&self) -> NaiveDate {
        match self {
            Self::Drug(s) => s.schedule_date,
            Self::Control(s) => s.control_date,
            Self::Hemodialysis(s) => s.schedule_date,
            Self::MedicationRefill(s) => s.refill_date,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Self::Drug(s) => s.is_active,
            Self::Control(s) => s.is_active,
            Self::Hemodialysis(s) => s.is_active,
            Self::MedicationRefill(s) => s.is_active,
        }
    }

    /// Whether the schedule currently produces the reminder `slot`. Drug
    /// slots can be disabled after their messages were published.
    pub fn carries_slot(&self, slot: ReminderSlot) -> bool {
        match (self, slot) {
            (Self::Drug(s), ReminderSlot::Dose(time_slot)) => s.is_slot_enabled(time_slot),
            (Self::Hemodialysis(_), ReminderSlot::SameDayMonitoring) => true,
            (Self::Drug(_), _) => false,
            (_, ReminderSlot::DayBefore) => true,
            _ => false,
        }
    }

    /// Whether the reminder for `slot` has already been dispatched. A slot
    /// the schedule does not carry counts as sent, there is nothing to
    /// deliver for it.
    pub fn is_slot_sent(&self, slot: ReminderSlot) -> bool {
        match (self, slot) {
            (Self::Drug(s), ReminderSlot::Dose(time_slot)) => s.is_slot_sent(time_slot),
            (Self::Control(s), ReminderSlot::DayBefore) => s.notification_sent,
            (Self::Hemodialysis(s), ReminderSlot::DayBefore) => s.notification_sent,
            (Self::Hemodialysis(s), ReminderSlot::SameDayMonitoring) => {
                s.monitoring_notification_sent
            }
            (Self::MedicationRefill(s), ReminderSlot::DayBefore) => s.notification_sent,
            _ => true,
        }
    }

    pub fn mark_slot_sent(&mut self, slot: ReminderSlot) -> Result<(), SlotMismatch> {
        let schedule_type = self.schedule_type();
        match (self, slot) {
            (Self::Drug(s), ReminderSlot::Dose(time_slot)) => s.mark_slot_sent(time_slot),
            (Self::Control(s), ReminderSlot::DayBefore) => s.notification_sent = true,
            (Self::Hemodialysis(s), ReminderSlot::DayBefore) => s.notification_sent = true,
            (Self::Hemodialysis(s), ReminderSlot::SameDayMonitoring) => {
                s.monitoring_notification_sent = true
            }
            (Self::MedicationRefill(s), ReminderSlot::DayBefore) => s.notification_sent = true,
            _ => {
                return Err(SlotMismatch {
                    schedule_type,
                    slot,
                })
            }
        }
        Ok(())
    }

    /// Applies an edit of the date and active state. The broker driven
    /// sent flags are cleared when the date moves or the schedule gets
    /// reactivated, so the reminders are delivered again for the new
    /// state. Returns `true` if the flags were cleared.
    ///
    /// The same day monitoring flag of a hemodialysis schedule follows
    /// the same rule.
    pub fn reschedule(&mut self, date: NaiveDate, is_active: bool) -> bool {
        let date_changed = self.due_date() != date;
        let reactivated = is_active && !self.is_active();
        let reset = date_changed || reactivated;

        match self {
            Self::Drug(s) => {
                s.schedule_date = date;
                s.is_active = is_active;
                if reset {
                    s.clear_sent();
                }
            }
            Self::Control(s) => {
                s.control_date = date;
                s.is_active = is_active;
                if reset {
                    s.notification_sent = false;
                }
            }
            Self::Hemodialysis(s) => {
                s.schedule_date = date;
                s.is_active = is_active;
                if reset {
                    s.notification_sent = false;
                    s.monitoring_notification_sent = false;
                }
            }
            Self::MedicationRefill(s) => {
                s.refill_date = date;
                s.is_active = is_active;
                if reset {
                    s.notification_sent = false;
                }
            }
        }
        reset
    }

    /// The reminder messages to publish for this schedule: one per enabled
    /// time slot for drug schedules and exactly one for every other kind.
    /// The same day monitoring reminder is not broker driven.
    pub fn reminder_messages(&self) -> Vec<ReminderMessage> {
        match self {
            Self::Drug(s) => s
                .enabled_slots()
                .into_iter()
                .map(|slot| ReminderMessage::for_time_slot(s.id, slot))
                .collect(),
            _ => vec![ReminderMessage::new(self.schedule_type(), *self.id())],
        }
    }

    /// Push copy for the reminder of `slot`, `None` if the schedule has
    /// no such reminder
    pub fn notification(&self, slot: ReminderSlot) -> Option<Notification> {
        let notification = match (self, slot) {
            (Self::Drug(s), ReminderSlot::Dose(time_slot)) => Notification::drug_dose(s, time_slot),
            (Self::Hemodialysis(_), ReminderSlot::SameDayMonitoring) => {
                Notification::hemodialysis_monitoring()
            }
            (Self::Control(s), ReminderSlot::DayBefore) => Notification::control_visit(s),
            (Self::Hemodialysis(s), ReminderSlot::DayBefore) => Notification::hemodialysis_session(s),
            (Self::MedicationRefill(s), ReminderSlot::DayBefore) => {
                Notification::medication_refill(s)
            }
            _ => return None,
        };
        Some(notification)
    }
}

impl Entity for DrugSchedule {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl Entity for ControlSchedule {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl Entity for HemodialysisSchedule {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl Entity for MedicationRefillSchedule {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl Entity for ReminderSchedule {
    fn id(&self) -> &ID {
        match self {
            Self::Drug(s) => &s.id,
            Self::Control(s) => &s.id,
            Self::Hemodialysis(s) => &s.id,
            Self::MedicationRefill(s) => &s.id,
        }
    }
}

impl From<DrugSchedule> for ReminderSchedule {
    fn from(s: DrugSchedule) -> Self {
        Self::Drug(s)
    }
}

impl From<ControlSchedule> for ReminderSchedule {
    fn from(s: ControlSchedule) -> Self {
        Self::Control(s)
    }
}

impl From<HemodialysisSchedule> for ReminderSchedule {
    fn from(s: HemodialysisSchedule) -> Self {
        Self::Hemodialysis(s)
    }
}

impl From<MedicationRefillSchedule> for ReminderSchedule {
    fn from(s: MedicationRefillSchedule) -> Self {
        Self::MedicationRefill(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn it_parses_time_slots() {
        assert_eq!(TimeSlot::from_hour(6), Ok(TimeSlot::Morning));
        assert_eq!(TimeSlot::from_hour(12), Ok(TimeSlot::Noon));
        assert_eq!(TimeSlot::from_hour(18), Ok(TimeSlot::Evening));
        assert_eq!(TimeSlot::from_hour(7), Err(InvalidTimeSlot(7)));
        assert_eq!(TimeSlot::from_hour(0), Err(InvalidTimeSlot(0)));
    }

    #[test]
    fn schedule_type_names_are_stable() {
        for ty in &[
            ScheduleType::Drug,
            ScheduleType::Control,
            ScheduleType::Hemodialysis,
            ScheduleType::MedicationRefill,
        ] {
            assert_eq!(ty.as_str().parse::<ScheduleType>(), Ok(*ty));
            let json = serde_json::to_string(ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
        assert!("CONTROL".parse::<ScheduleType>().is_err());
    }

    #[test]
    fn drug_slots_are_tracked_independently() {
        let mut drug = DrugSchedule::new(ID::new(1), ID::new(2), "Amlodipine", "5mg", date(2025, 3, 10));
        drug.set_slots(true, true, true);
        let mut schedule = ReminderSchedule::from(drug);

        let noon = ReminderSlot::Dose(TimeSlot::Noon);
        assert!(!schedule.is_slot_sent(noon));
        schedule.mark_slot_sent(noon).unwrap();
        assert!(schedule.is_slot_sent(noon));
        assert!(!schedule.is_slot_sent(ReminderSlot::Dose(TimeSlot::Morning)));
        assert!(!schedule.is_slot_sent(ReminderSlot::Dose(TimeSlot::Evening)));
    }

    #[test]
    fn foreign_slots_count_as_sent_and_cannot_be_marked() {
        let mut schedule: ReminderSchedule =
            ControlSchedule::new(ID::new(1), ID::new(2), date(2025, 3, 10)).into();
        let slot = ReminderSlot::Dose(TimeSlot::Noon);
        assert!(schedule.is_slot_sent(slot));
        assert!(schedule.is_slot_sent(ReminderSlot::SameDayMonitoring));
        assert_eq!(
            schedule.mark_slot_sent(slot),
            Err(SlotMismatch {
                schedule_type: ScheduleType::Control,
                slot
            })
        );
    }

    #[test]
    fn disabled_drug_slots_are_not_carried() {
        let mut drug = DrugSchedule::new(ID::new(1), ID::new(2), "Amlodipine", "5mg", date(2025, 3, 10));
        drug.set_slots(true, false, false);
        let schedule = ReminderSchedule::from(drug);
        assert!(schedule.carries_slot(ReminderSlot::Dose(TimeSlot::Morning)));
        assert!(!schedule.carries_slot(ReminderSlot::Dose(TimeSlot::Noon)));
        assert!(!schedule.carries_slot(ReminderSlot::DayBefore));

        let session: ReminderSchedule =
            HemodialysisSchedule::new(ID::new(1), ID::new(2), date(2025, 3, 10)).into();
        assert!(session.carries_slot(ReminderSlot::DayBefore));
        assert!(session.carries_slot(ReminderSlot::SameDayMonitoring));
        let control: ReminderSchedule =
            ControlSchedule::new(ID::new(1), ID::new(2), date(2025, 3, 10)).into();
        assert!(!control.carries_slot(ReminderSlot::SameDayMonitoring));
    }

    #[test]
    fn hemodialysis_flags_are_independent() {
        let mut schedule: ReminderSchedule =
            HemodialysisSchedule::new(ID::new(1), ID::new(2), date(2025, 3, 10)).into();
        schedule.mark_slot_sent(ReminderSlot::DayBefore).unwrap();
        assert!(schedule.is_slot_sent(ReminderSlot::DayBefore));
        assert!(!schedule.is_slot_sent(ReminderSlot::SameDayMonitoring));
        schedule
            .mark_slot_sent(ReminderSlot::SameDayMonitoring)
            .unwrap();
        assert!(schedule.is_slot_sent(ReminderSlot::SameDayMonitoring));
    }

    #[test]
    fn reschedule_clears_flags_on_date_change() {
        let mut schedule: ReminderSchedule =
            ControlSchedule::new(ID::new(1), ID::new(2), date(2025, 3, 10)).into();
        schedule.mark_slot_sent(ReminderSlot::DayBefore).unwrap();

        // Same date and still active keeps the flag
        assert!(!schedule.reschedule(date(2025, 3, 10), true));
        assert!(schedule.is_slot_sent(ReminderSlot::DayBefore));

        assert!(schedule.reschedule(date(2025, 3, 12), true));
        assert!(!schedule.is_slot_sent(ReminderSlot::DayBefore));
        assert_eq!(schedule.due_date(), date(2025, 3, 12));
    }

    #[test]
    fn reschedule_clears_flags_on_reactivation() {
        let mut drug = DrugSchedule::new(ID::new(1), ID::new(2), "Furosemide", "40mg", date(2025, 3, 10));
        drug.set_slots(true, false, true);
        drug.is_active = false;
        drug.at06_sent = true;
        drug.at18_sent = true;
        let mut schedule = ReminderSchedule::from(drug);

        // Deactivating an inactive schedule is not a reset
        assert!(!schedule.reschedule(date(2025, 3, 10), false));
        assert!(schedule.is_slot_sent(ReminderSlot::Dose(TimeSlot::Morning)));

        assert!(schedule.reschedule(date(2025, 3, 10), true));
        assert!(schedule.is_active());
        assert!(!schedule.is_slot_sent(ReminderSlot::Dose(TimeSlot::Morning)));
        assert!(!schedule.is_slot_sent(ReminderSlot::Dose(TimeSlot::Evening)));
    }

    #[test]
    fn toggling_a_slot_keeps_its_sent_flag() {
        let mut drug = DrugSchedule::new(ID::new(1), ID::new(2), "Furosemide", "40mg", date(2025, 3, 10));
        drug.set_slots(true, true, false);
        drug.mark_slot_sent(TimeSlot::Morning);

        drug.set_slots(false, true, false);
        drug.set_slots(true, true, false);
        assert!(drug.is_slot_sent(TimeSlot::Morning));
        assert!(!drug.is_slot_sent(TimeSlot::Noon));
        assert_eq!(drug.enabled_slots(), vec![TimeSlot::Morning, TimeSlot::Noon]);
    }

    #[test]
    fn notification_exists_only_for_carried_reminders() {
        let mut drug = DrugSchedule::new(ID::new(1), ID::new(2), "Furosemide", "40mg", date(2025, 3, 10));
        drug.set_slots(false, false, true);
        let drug = ReminderSchedule::from(drug);
        let n = drug.notification(ReminderSlot::Dose(TimeSlot::Evening)).unwrap();
        assert!(n.body.contains("18:00"));
        assert!(drug.notification(ReminderSlot::DayBefore).is_none());

        let control = ReminderSchedule::from(ControlSchedule::new(ID::new(2), ID::new(2), date(2025, 3, 10)));
        assert!(control.notification(ReminderSlot::DayBefore).is_some());
        assert!(control.notification(ReminderSlot::SameDayMonitoring).is_none());

        let hd = ReminderSchedule::from(HemodialysisSchedule::new(ID::new(3), ID::new(2), date(2025, 3, 10)));
        assert_eq!(
            hd.notification(ReminderSlot::SameDayMonitoring),
            Some(Notification::hemodialysis_monitoring())
        );
    }

    #[test]
    fn drug_schedule_produces_one_message_per_enabled_slot() {
        let mut drug = DrugSchedule::new(ID::new(9), ID::new(2), "Calcitriol", "0.25mcg", date(2025, 3, 10));
        drug.set_slots(true, false, true);
        let messages = ReminderSchedule::from(drug).reminder_messages();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].time_slot, Some(6));
        assert_eq!(messages[1].time_slot, Some(18));
        assert!(messages
            .iter()
            .all(|m| m.schedule_type == ScheduleType::Drug && m.schedule_id == ID::new(9)));
    }

    #[test]
    fn other_schedules_produce_a_single_message() {
        let schedule: ReminderSchedule =
            MedicationRefillSchedule::new(ID::new(3), ID::new(2), date(2025, 3, 10)).into();
        let messages = schedule.reminder_messages();
        assert_eq!(
            messages,
            vec![ReminderMessage::new(ScheduleType::MedicationRefill, ID::new(3))]
        );
    }
}
