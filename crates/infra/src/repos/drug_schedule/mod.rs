mod inmemory;
mod postgres;

use care_reminder_domain::{DrugSchedule, ID};
pub use inmemory::InMemoryDrugScheduleRepo;
pub use postgres::PostgresDrugScheduleRepo;

#[async_trait::async_trait]
pub trait IDrugScheduleRepo: Send + Sync {
    async fn insert(&self, schedule: &DrugSchedule) -> anyhow::Result<()>;
    /// Fails if the schedule does not exist
    async fn save(&self, schedule: &DrugSchedule) -> anyhow::Result<()>;
    async fn find(&self, schedule_id: &ID) -> anyhow::Result<Option<DrugSchedule>>;
}
