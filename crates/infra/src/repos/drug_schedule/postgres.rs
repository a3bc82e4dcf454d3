use super::IDrugScheduleRepo;
use care_reminder_domain::{DrugSchedule, ID};
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

pub struct PostgresDrugScheduleRepo {
    pool: PgPool,
}

impl PostgresDrugScheduleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct DrugScheduleRaw {
    id: i64,
    user_id: i64,
    drug_name: String,
    dose: String,
    schedule_date: NaiveDate,
    is_active: bool,
    at06: bool,
    at12: bool,
    at18: bool,
    at06_sent: bool,
    at12_sent: bool,
    at18_sent: bool,
}

impl From<DrugScheduleRaw> for DrugSchedule {
    fn from(raw: DrugScheduleRaw) -> Self {
        DrugSchedule {
            id: raw.id.into(),
            user_id: raw.user_id.into(),
            drug_name: raw.drug_name,
            dose: raw.dose,
            schedule_date: raw.schedule_date,
            is_active: raw.is_active,
            at06: raw.at06,
            at12: raw.at12,
            at18: raw.at18,
            at06_sent: raw.at06_sent,
            at12_sent: raw.at12_sent,
            at18_sent: raw.at18_sent,
        }
    }
}

#[async_trait::async_trait]
impl IDrugScheduleRepo for PostgresDrugScheduleRepo {
    async fn insert(&self, schedule: &DrugSchedule) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO drug_schedules
            (id, user_id, drug_name, dose, schedule_date, is_active,
             at06, at12, at18, at06_sent, at12_sent, at18_sent)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(schedule.id.inner())
        .bind(schedule.user_id.inner())
        .bind(&schedule.drug_name)
        .bind(&schedule.dose)
        .bind(schedule.schedule_date)
        .bind(schedule.is_active)
        .bind(schedule.at06)
        .bind(schedule.at12)
        .bind(schedule.at18)
        .bind(schedule.at06_sent)
        .bind(schedule.at12_sent)
        .bind(schedule.at18_sent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, schedule: &DrugSchedule) -> anyhow::Result<()> {
        let rows = sqlx::query(
            r#"
            UPDATE drug_schedules
            SET drug_name = $2,
            dose = $3,
            schedule_date = $4,
            is_active = $5,
            at06 = $6,
            at12 = $7,
            at18 = $8,
            at06_sent = $9,
            at12_sent = $10,
            at18_sent = $11,
            updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(schedule.id.inner())
        .bind(&schedule.drug_name)
        .bind(&schedule.dose)
        .bind(schedule.schedule_date)
        .bind(schedule.is_active)
        .bind(schedule.at06)
        .bind(schedule.at12)
        .bind(schedule.at18)
        .bind(schedule.at06_sent)
        .bind(schedule.at12_sent)
        .bind(schedule.at18_sent)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(anyhow::anyhow!("Drug schedule {} does not exist", schedule.id));
        }
        Ok(())
    }

    async fn find(&self, schedule_id: &ID) -> anyhow::Result<Option<DrugSchedule>> {
        let schedule: Option<DrugScheduleRaw> = sqlx::query_as(
            r#"
            SELECT s.id, s.user_id, s.drug_name, s.dose, s.schedule_date, s.is_active,
                s.at06, s.at12, s.at18, s.at06_sent, s.at12_sent, s.at18_sent
            FROM drug_schedules AS s
            WHERE s.id = $1
            "#,
        )
        .bind(schedule_id.inner())
        .fetch_optional(&self.pool)
        .await?;

        Ok(schedule.map(|s| s.into()))
    }
}
