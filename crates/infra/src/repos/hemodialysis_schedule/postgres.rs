use super::IHemodialysisScheduleRepo;
use care_reminder_domain::{HemodialysisSchedule, ID};
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

pub struct PostgresHemodialysisScheduleRepo {
    pool: PgPool,
}

impl PostgresHemodialysisScheduleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct HemodialysisScheduleRaw {
    id: i64,
    user_id: i64,
    schedule_date: NaiveDate,
    notes: Option<String>,
    is_active: bool,
    notification_sent: bool,
    monitoring_notification_sent: bool,
}

impl From<HemodialysisScheduleRaw> for HemodialysisSchedule {
    fn from(raw: HemodialysisScheduleRaw) -> Self {
        HemodialysisSchedule {
            id: raw.id.into(),
            user_id: raw.user_id.into(),
            schedule_date: raw.schedule_date,
            notes: raw.notes.unwrap_or_default(),
            is_active: raw.is_active,
            notification_sent: raw.notification_sent,
            monitoring_notification_sent: raw.monitoring_notification_sent,
        }
    }
}

#[async_trait::async_trait]
impl IHemodialysisScheduleRepo for PostgresHemodialysisScheduleRepo {
    async fn insert(&self, schedule: &HemodialysisSchedule) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO hemodialysis_schedules
            (id, user_id, schedule_date, notes, is_active, notification_sent, monitoring_notification_sent)
            VALUES($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(schedule.id.inner())
        .bind(schedule.user_id.inner())
        .bind(schedule.schedule_date)
        .bind(&schedule.notes)
        .bind(schedule.is_active)
        .bind(schedule.notification_sent)
        .bind(schedule.monitoring_notification_sent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, schedule: &HemodialysisSchedule) -> anyhow::Result<()> {
        let rows = sqlx::query(
            r#"
            UPDATE hemodialysis_schedules
            SET schedule_date = $2,
            notes = $3,
            is_active = $4,
            notification_sent = $5,
            monitoring_notification_sent = $6,
            updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(schedule.id.inner())
        .bind(schedule.schedule_date)
        .bind(&schedule.notes)
        .bind(schedule.is_active)
        .bind(schedule.notification_sent)
        .bind(schedule.monitoring_notification_sent)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(anyhow::anyhow!(
                "Hemodialysis schedule {} does not exist",
                schedule.id
            ));
        }
        Ok(())
    }

    async fn find(&self, schedule_id: &ID) -> anyhow::Result<Option<HemodialysisSchedule>> {
        let schedule: Option<HemodialysisScheduleRaw> = sqlx::query_as(
            r#"
            SELECT s.id, s.user_id, s.schedule_date, s.notes, s.is_active,
                s.notification_sent, s.monitoring_notification_sent
            FROM hemodialysis_schedules AS s
            WHERE s.id = $1
            "#,
        )
        .bind(schedule_id.inner())
        .fetch_optional(&self.pool)
        .await?;

        Ok(schedule.map(|s| s.into()))
    }

    async fn find_for_monitoring(&self, date: NaiveDate) -> anyhow::Result<Vec<HemodialysisSchedule>> {
        let schedules: Vec<HemodialysisScheduleRaw> = sqlx::query_as(
            r#"
            SELECT s.id, s.user_id, s.schedule_date, s.notes, s.is_active,
                s.notification_sent, s.monitoring_notification_sent
            FROM hemodialysis_schedules AS s
            WHERE s.schedule_date = $1
            AND s.is_active = true
            AND s.monitoring_notification_sent = false
            ORDER BY s.id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(schedules.into_iter().map(|s| s.into()).collect())
    }
}
