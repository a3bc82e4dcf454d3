mod control_schedule;
mod device;
mod drug_schedule;
mod hemodialysis_schedule;
mod medication_refill;
mod shared;
mod user;

use care_reminder_domain::{ReminderSchedule, ScheduleType, ID};
pub use control_schedule::IControlScheduleRepo;
use control_schedule::{InMemoryControlScheduleRepo, PostgresControlScheduleRepo};
pub use device::IDeviceRepo;
use device::{InMemoryDeviceRepo, PostgresDeviceRepo};
pub use drug_schedule::IDrugScheduleRepo;
use drug_schedule::{InMemoryDrugScheduleRepo, PostgresDrugScheduleRepo};
pub use hemodialysis_schedule::IHemodialysisScheduleRepo;
use hemodialysis_schedule::{InMemoryHemodialysisScheduleRepo, PostgresHemodialysisScheduleRepo};
pub use medication_refill::IMedicationRefillRepo;
use medication_refill::{InMemoryMedicationRefillRepo, PostgresMedicationRefillRepo};
use sqlx::PgPool;
use std::sync::Arc;
pub use user::IUserRepo;
use user::{InMemoryUserRepo, PostgresUserRepo};

#[derive(Clone)]
pub struct Repos {
    pub users: Arc<dyn IUserRepo>,
    pub devices: Arc<dyn IDeviceRepo>,
    pub drug_schedules: Arc<dyn IDrugScheduleRepo>,
    pub control_schedules: Arc<dyn IControlScheduleRepo>,
    pub hemodialysis_schedules: Arc<dyn IHemodialysisScheduleRepo>,
    pub medication_refills: Arc<dyn IMedicationRefillRepo>,
}

impl Repos {
    pub fn create_postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepo::new(pool.clone())),
            devices: Arc::new(PostgresDeviceRepo::new(pool.clone())),
            drug_schedules: Arc::new(PostgresDrugScheduleRepo::new(pool.clone())),
            control_schedules: Arc::new(PostgresControlScheduleRepo::new(pool.clone())),
            hemodialysis_schedules: Arc::new(PostgresHemodialysisScheduleRepo::new(pool.clone())),
            medication_refills: Arc::new(PostgresMedicationRefillRepo::new(pool)),
        }
    }

    pub fn create_inmemory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepo::new()),
            devices: Arc::new(InMemoryDeviceRepo::new()),
            drug_schedules: Arc::new(InMemoryDrugScheduleRepo::new()),
            control_schedules: Arc::new(InMemoryControlScheduleRepo::new()),
            hemodialysis_schedules: Arc::new(InMemoryHemodialysisScheduleRepo::new()),
            medication_refills: Arc::new(InMemoryMedicationRefillRepo::new()),
        }
    }

    /// Loads the schedule a reminder message points at
    pub async fn find_schedule(
        &self,
        schedule_type: ScheduleType,
        schedule_id: &ID,
    ) -> anyhow::Result<Option<ReminderSchedule>> {
        let schedule = match schedule_type {
            ScheduleType::Drug => self.drug_schedules.find(schedule_id).await?.map(Into::into),
            ScheduleType::Control => self
                .control_schedules
                .find(schedule_id)
                .await?
                .map(Into::into),
            ScheduleType::Hemodialysis => self
                .hemodialysis_schedules
                .find(schedule_id)
                .await?
                .map(Into::into),
            ScheduleType::MedicationRefill => self
                .medication_refills
                .find(schedule_id)
                .await?
                .map(Into::into),
        };
        Ok(schedule)
    }

    pub async fn insert_schedule(&self, schedule: &ReminderSchedule) -> anyhow::Result<()> {
        match schedule {
            ReminderSchedule::Drug(s) => self.drug_schedules.insert(s).await,
            ReminderSchedule::Control(s) => self.control_schedules.insert(s).await,
            ReminderSchedule::Hemodialysis(s) => self.hemodialysis_schedules.insert(s).await,
            ReminderSchedule::MedicationRefill(s) => self.medication_refills.insert(s).await,
        }
    }

    pub async fn save_schedule(&self, schedule: &ReminderSchedule) -> anyhow::Result<()> {
        match schedule {
            ReminderSchedule::Drug(s) => self.drug_schedules.save(s).await,
            ReminderSchedule::Control(s) => self.control_schedules.save(s).await,
            ReminderSchedule::Hemodialysis(s) => self.hemodialysis_schedules.save(s).await,
            ReminderSchedule::MedicationRefill(s) => self.medication_refills.save(s).await,
        }
    }
}
