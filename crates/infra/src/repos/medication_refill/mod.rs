mod inmemory;
mod postgres;

use care_reminder_domain::{MedicationRefillSchedule, ID};
pub use inmemory::InMemoryMedicationRefillRepo;
pub use postgres::PostgresMedicationRefillRepo;

#[async_trait::async_trait]
pub trait IMedicationRefillRepo: Send + Sync {
    async fn insert(&self, schedule: &MedicationRefillSchedule) -> anyhow::Result<()>;
    async fn save(&self, schedule: &MedicationRefillSchedule) -> anyhow::Result<()>;
    async fn find(&self, schedule_id: &ID) -> anyhow::Result<Option<MedicationRefillSchedule>>;
}
