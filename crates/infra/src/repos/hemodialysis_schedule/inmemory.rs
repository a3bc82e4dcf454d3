use super::IHemodialysisScheduleRepo;
use crate::repos::shared::inmemory_repo::*;
use care_reminder_domain::{HemodialysisSchedule, ID};
use chrono::NaiveDate;

pub struct InMemoryHemodialysisScheduleRepo {
    schedules: std::sync::Mutex<Vec<HemodialysisSchedule>>,
}

impl InMemoryHemodialysisScheduleRepo {
    pub fn new() -> Self {
        Self {
            schedules: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IHemodialysisScheduleRepo for InMemoryHemodialysisScheduleRepo {
    async fn insert(&self, schedule: &HemodialysisSchedule) -> anyhow::Result<()> {
        insert(schedule, &self.schedules);
        Ok(())
    }

    async fn save(&self, schedule: &HemodialysisSchedule) -> anyhow::Result<()> {
        if save(schedule, &self.schedules) {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "Hemodialysis schedule {} does not exist",
                schedule.id
            ))
        }
    }

    async fn find(&self, schedule_id: &ID) -> anyhow::Result<Option<HemodialysisSchedule>> {
        Ok(find(schedule_id, &self.schedules))
    }

    async fn find_for_monitoring(&self, date: NaiveDate) -> anyhow::Result<Vec<HemodialysisSchedule>> {
        let mut schedules = find_by(&self.schedules, |s: &HemodialysisSchedule| {
            s.is_active && s.schedule_date == date && !s.monitoring_notification_sent
        });
        schedules.sort_by_key(|s| s.id);
        Ok(schedules)
    }
}
