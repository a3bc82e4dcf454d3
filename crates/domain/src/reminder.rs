use crate::{
    schedule::{
        ControlSchedule, DrugSchedule, HemodialysisSchedule, MedicationRefillSchedule,
        ReminderSlot, ScheduleType, TimeSlot,
    },
    shared::entity::ID,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broker payload asking the worker to deliver one reminder of a schedule.
///
/// It carries no timestamp. The due instant is always recomputed from the
/// stored schedule, so a message outliving an edit of its schedule is
/// harmless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderMessage {
    pub schedule_type: ScheduleType,
    pub schedule_id: ID,
    /// Hour of the dosing slot, only meaningful for `ScheduleType::Drug`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<i64>,
}

#[derive(Error, Debug)]
#[error("Malformed reminder message: {0}")]
pub struct MalformedMessage(#[from] serde_json::Error);

impl ReminderMessage {
    pub fn new(schedule_type: ScheduleType, schedule_id: ID) -> Self {
        Self {
            schedule_type,
            schedule_id,
            time_slot: None,
        }
    }

    pub fn for_time_slot(schedule_id: ID, slot: TimeSlot) -> Self {
        Self {
            schedule_type: ScheduleType::Drug,
            schedule_id,
            time_slot: Some(slot.hour() as i64),
        }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, MalformedMessage> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, MalformedMessage> {
        Ok(serde_json::to_vec(self)?)
    }

    /// The slot this message asks to deliver. `None` for a drug message
    /// with a missing or unknown time slot, such a message can never be
    /// delivered.
    pub fn reminder_slot(&self) -> Option<ReminderSlot> {
        match self.schedule_type {
            ScheduleType::Drug => self
                .time_slot
                .and_then(|hour| TimeSlot::from_hour(hour).ok())
                .map(ReminderSlot::Dose),
            _ => Some(ReminderSlot::DayBefore),
        }
    }
}

/// Title and body of a push notification
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

const DATE_FORMAT: &str = "%d %b %Y";

fn with_notes(body: String, notes: &str) -> String {
    if notes.trim().is_empty() {
        body
    } else {
        format!("{} Notes: {}", body, notes.trim())
    }
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn drug_dose(schedule: &DrugSchedule, slot: TimeSlot) -> Self {
        Self::new(
            "💊 Medication reminder",
            format!(
                "Time to take {} (dose: {}) at {:02}:00.",
                schedule.drug_name,
                schedule.dose,
                slot.hour()
            ),
        )
    }

    pub fn control_visit(schedule: &ControlSchedule) -> Self {
        let body = format!(
            "Don't forget, you have a control visit tomorrow ({}).",
            schedule.control_date.format(DATE_FORMAT)
        );
        Self::new("🗓️ Control visit reminder", with_notes(body, &schedule.notes))
    }

    pub fn hemodialysis_session(schedule: &HemodialysisSchedule) -> Self {
        let body = format!(
            "Don't forget, you have a hemodialysis session tomorrow ({}).",
            schedule.schedule_date.format(DATE_FORMAT)
        );
        Self::new("🩸 Hemodialysis reminder", with_notes(body, &schedule.notes))
    }

    pub fn hemodialysis_monitoring() -> Self {
        Self::new(
            "🩸 Hemodialysis monitoring reminder",
            "Don't forget to fill in today's hemodialysis monitoring data.",
        )
    }

    pub fn medication_refill(schedule: &MedicationRefillSchedule) -> Self {
        Self::new(
            "💊 Medication refill reminder",
            format!(
                "Your medication runs out soon. Remember to collect your refill tomorrow ({}).",
                schedule.refill_date.format(DATE_FORMAT)
            ),
        )
    }
}
