use super::IControlScheduleRepo;
use care_reminder_domain::{ControlSchedule, ID};
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

pub struct PostgresControlScheduleRepo {
    pool: PgPool,
}

impl PostgresControlScheduleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ControlScheduleRaw {
    id: i64,
    user_id: i64,
    control_date: NaiveDate,
    notes: Option<String>,
    is_active: bool,
    notification_sent: bool,
}

impl From<ControlScheduleRaw> for ControlSchedule {
    fn from(raw: ControlScheduleRaw) -> Self {
        ControlSchedule {
            id: raw.id.into(),
            user_id: raw.user_id.into(),
            control_date: raw.control_date,
            notes: raw.notes.unwrap_or_default(),
            is_active: raw.is_active,
            notification_sent: raw.notification_sent,
        }
    }
}

#[async_trait::async_trait]
impl IControlScheduleRepo for PostgresControlScheduleRepo {
    async fn insert(&self, schedule: &ControlSchedule) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO control_schedules
            (id, user_id, control_date, notes, is_active, notification_sent)
            VALUES($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(schedule.id.inner())
        .bind(schedule.user_id.inner())
        .bind(schedule.control_date)
        .bind(&schedule.notes)
        .bind(schedule.is_active)
        .bind(schedule.notification_sent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, schedule: &ControlSchedule) -> anyhow::Result<()> {
        let rows = sqlx::query(
            r#"
            UPDATE control_schedules
            SET control_date = $2,
            notes = $3,
            is_active = $4,
            notification_sent = $5,
            updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(schedule.id.inner())
        .bind(schedule.control_date)
        .bind(&schedule.notes)
        .bind(schedule.is_active)
        .bind(schedule.notification_sent)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(anyhow::anyhow!("Control schedule {} does not exist", schedule.id));
        }
        Ok(())
    }

    async fn find(&self, schedule_id: &ID) -> anyhow::Result<Option<ControlSchedule>> {
        let schedule: Option<ControlScheduleRaw> = sqlx::query_as(
            r#"
            SELECT s.id, s.user_id, s.control_date, s.notes, s.is_active, s.notification_sent
            FROM control_schedules AS s
            WHERE s.id = $1
            "#,
        )
        .bind(schedule_id.inner())
        .fetch_optional(&self.pool)
        .await?;

        Ok(schedule.map(|s| s.into()))
    }
}
