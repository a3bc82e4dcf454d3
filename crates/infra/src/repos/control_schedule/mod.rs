mod inmemory;
mod postgres;

use care_reminder_domain::{ControlSchedule, ID};
pub use inmemory::InMemoryControlScheduleRepo;
pub use postgres::PostgresControlScheduleRepo;

#[async_trait::async_trait]
pub trait IControlScheduleRepo: Send + Sync {
    async fn insert(&self, schedule: &ControlSchedule) -> anyhow::Result<()>;
    async fn save(&self, schedule: &ControlSchedule) -> anyhow::Result<()>;
    async fn find(&self, schedule_id: &ID) -> anyhow::Result<Option<ControlSchedule>>;
}
