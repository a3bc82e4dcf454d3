mod device;
pub mod due_time;
mod reminder;
mod schedule;
mod shared;
mod user;

pub use device::Device;
pub use reminder::{MalformedMessage, Notification, ReminderMessage};
pub use schedule::{
    ControlSchedule, DrugSchedule, HemodialysisSchedule, InvalidScheduleType, InvalidTimeSlot,
    MedicationRefillSchedule, ReminderSchedule, ReminderSlot, ScheduleType, SlotMismatch, TimeSlot,
};
pub use shared::entity::{Entity, ID};
pub use user::{User, DEFAULT_USER_TIMEZONE};
