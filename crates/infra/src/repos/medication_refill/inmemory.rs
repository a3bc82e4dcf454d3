use super::IMedicationRefillRepo;
use crate::repos::shared::inmemory_repo::*;
use care_reminder_domain::{MedicationRefillSchedule, ID};

pub struct InMemoryMedicationRefillRepo {
    schedules: std::sync::Mutex<Vec<MedicationRefillSchedule>>,
}

impl InMemoryMedicationRefillRepo {
    pub fn new() -> Self {
        Self {
            schedules: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IMedicationRefillRepo for InMemoryMedicationRefillRepo {
    async fn insert(&self, schedule: &MedicationRefillSchedule) -> anyhow::Result<()> {
        insert(schedule, &self.schedules);
        Ok(())
    }

    async fn save(&self, schedule: &MedicationRefillSchedule) -> anyhow::Result<()> {
        if save(schedule, &self.schedules) {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "Medication refill schedule {} does not exist",
                schedule.id
            ))
        }
    }

    async fn find(&self, schedule_id: &ID) -> anyhow::Result<Option<MedicationRefillSchedule>> {
        Ok(find(schedule_id, &self.schedules))
    }
}
