use super::IDrugScheduleRepo;
use crate::repos::shared::inmemory_repo::*;
use care_reminder_domain::{DrugSchedule, ID};

pub struct InMemoryDrugScheduleRepo {
    schedules: std::sync::Mutex<Vec<DrugSchedule>>,
}

impl InMemoryDrugScheduleRepo {
    pub fn new() -> Self {
        Self {
            schedules: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IDrugScheduleRepo for InMemoryDrugScheduleRepo {
    async fn insert(&self, schedule: &DrugSchedule) -> anyhow::Result<()> {
        insert(schedule, &self.schedules);
        Ok(())
    }

    async fn save(&self, schedule: &DrugSchedule) -> anyhow::Result<()> {
        if save(schedule, &self.schedules) {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Drug schedule {} does not exist", schedule.id))
        }
    }

    async fn find(&self, schedule_id: &ID) -> anyhow::Result<Option<DrugSchedule>> {
        Ok(find(schedule_id, &self.schedules))
    }
}
