pub mod deliver_reminder;
pub mod dispatcher;
pub mod publish_schedule_reminders;
pub mod reschedule;
pub mod send_monitoring_reminders;
