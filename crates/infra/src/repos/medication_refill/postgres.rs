use super::IMedicationRefillRepo;
use care_reminder_domain::{MedicationRefillSchedule, ID};
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

pub struct PostgresMedicationRefillRepo {
    pool: PgPool,
}

impl PostgresMedicationRefillRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct MedicationRefillRaw {
    id: i64,
    user_id: i64,
    refill_date: NaiveDate,
    is_active: bool,
    notification_sent: bool,
}

impl From<MedicationRefillRaw> for MedicationRefillSchedule {
    fn from(raw: MedicationRefillRaw) -> Self {
        MedicationRefillSchedule {
            id: raw.id.into(),
            user_id: raw.user_id.into(),
            refill_date: raw.refill_date,
            is_active: raw.is_active,
            notification_sent: raw.notification_sent,
        }
    }
}

#[async_trait::async_trait]
impl IMedicationRefillRepo for PostgresMedicationRefillRepo {
    async fn insert(&self, schedule: &MedicationRefillSchedule) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO medication_refill_schedules
            (id, user_id, refill_date, is_active, notification_sent)
            VALUES($1, $2, $3, $4, $5)
            "#,
        )
        .bind(schedule.id.inner())
        .bind(schedule.user_id.inner())
        .bind(schedule.refill_date)
        .bind(schedule.is_active)
        .bind(schedule.notification_sent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, schedule: &MedicationRefillSchedule) -> anyhow::Result<()> {
        let rows = sqlx::query(
            r#"
            UPDATE medication_refill_schedules
            SET refill_date = $2,
            is_active = $3,
            notification_sent = $4,
            updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(schedule.id.inner())
        .bind(schedule.refill_date)
        .bind(schedule.is_active)
        .bind(schedule.notification_sent)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(anyhow::anyhow!(
                "Medication refill schedule {} does not exist",
                schedule.id
            ));
        }
        Ok(())
    }

    async fn find(&self, schedule_id: &ID) -> anyhow::Result<Option<MedicationRefillSchedule>> {
        let schedule: Option<MedicationRefillRaw> = sqlx::query_as(
            r#"
            SELECT s.id, s.user_id, s.refill_date, s.is_active, s.notification_sent
            FROM medication_refill_schedules AS s
            WHERE s.id = $1
            "#,
        )
        .bind(schedule_id.inner())
        .fetch_optional(&self.pool)
        .await?;

        Ok(schedule.map(|s| s.into()))
    }
}
