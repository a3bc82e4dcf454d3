mod inmemory;
mod postgres;

use care_reminder_domain::{Device, ID};
pub use inmemory::InMemoryDeviceRepo;
pub use postgres::PostgresDeviceRepo;

#[async_trait::async_trait]
pub trait IDeviceRepo: Send + Sync {
    async fn insert(&self, device: &Device) -> anyhow::Result<()>;
    /// All devices registered by the user. Empty if there are none.
    async fn find_by_user(&self, user_id: &ID) -> anyhow::Result<Vec<Device>>;
}
