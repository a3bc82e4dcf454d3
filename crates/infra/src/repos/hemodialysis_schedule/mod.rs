mod inmemory;
mod postgres;

use care_reminder_domain::{HemodialysisSchedule, ID};
use chrono::NaiveDate;
pub use inmemory::InMemoryHemodialysisScheduleRepo;
pub use postgres::PostgresHemodialysisScheduleRepo;

#[async_trait::async_trait]
pub trait IHemodialysisScheduleRepo: Send + Sync {
    async fn insert(&self, schedule: &HemodialysisSchedule) -> anyhow::Result<()>;
    async fn save(&self, schedule: &HemodialysisSchedule) -> anyhow::Result<()>;
    async fn find(&self, schedule_id: &ID) -> anyhow::Result<Option<HemodialysisSchedule>>;
    /// Active schedules on `date` whose same day monitoring reminder has
    /// not been sent yet
    async fn find_for_monitoring(&self, date: NaiveDate) -> anyhow::Result<Vec<HemodialysisSchedule>>;
}
