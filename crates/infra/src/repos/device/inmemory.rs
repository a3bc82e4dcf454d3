use super::IDeviceRepo;
use crate::repos::shared::inmemory_repo::*;
use care_reminder_domain::{Device, ID};

pub struct InMemoryDeviceRepo {
    devices: std::sync::Mutex<Vec<Device>>,
}

impl InMemoryDeviceRepo {
    pub fn new() -> Self {
        Self {
            devices: std::sync::Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl IDeviceRepo for InMemoryDeviceRepo {
    async fn insert(&self, device: &Device) -> anyhow::Result<()> {
        if !find_by(&self.devices, |d| d.token == device.token).is_empty() {
            return Err(anyhow::anyhow!(
                "A device with token {} is already registered",
                device.token
            ));
        }
        insert(device, &self.devices);
        Ok(())
    }

    async fn find_by_user(&self, user_id: &ID) -> anyhow::Result<Vec<Device>> {
        Ok(find_by(&self.devices, |d| d.user_id == *user_id))
    }
}
