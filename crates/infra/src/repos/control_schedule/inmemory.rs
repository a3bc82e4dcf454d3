use super::IControlScheduleRepo;
use crate::repos::shared::inmemory_repo::*;
use care_reminder_domain::{ControlSchedule, ID};

pub struct InMemoryControlScheduleRepo {
    schedules: std::sync::Mutex<Vec<ControlSchedule>>,
}

impl InMemoryControlScheduleRepo {
    pub fn new() -> Self {
        Self {
            schedules: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IControlScheduleRepo for InMemoryControlScheduleRepo {
    async fn insert(&self, schedule: &ControlSchedule) -> anyhow::Result<()> {
        insert(schedule, &self.schedules);
        Ok(())
    }

    async fn save(&self, schedule: &ControlSchedule) -> anyhow::Result<()> {
        if save(schedule, &self.schedules) {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Control schedule {} does not exist", schedule.id))
        }
    }

    async fn find(&self, schedule_id: &ID) -> anyhow::Result<Option<ControlSchedule>> {
        Ok(find(schedule_id, &self.schedules))
    }
}
