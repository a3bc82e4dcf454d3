use super::IDeviceRepo;
use care_reminder_domain::{Device, ID};
use sqlx::{FromRow, PgPool};

pub struct PostgresDeviceRepo {
    pool: PgPool,
}

impl PostgresDeviceRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct DeviceRaw {
    id: i64,
    user_id: i64,
    fcm_token: String,
    device_type: Option<String>,
}

impl From<DeviceRaw> for Device {
    fn from(raw: DeviceRaw) -> Self {
        Device {
            id: raw.id.into(),
            user_id: raw.user_id.into(),
            token: raw.fcm_token,
            device_type: raw.device_type.unwrap_or_default(),
        }
    }
}

#[async_trait::async_trait]
impl IDeviceRepo for PostgresDeviceRepo {
    async fn insert(&self, device: &Device) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO devices(id, user_id, fcm_token, device_type)
            VALUES($1, $2, $3, $4)
            "#,
        )
        .bind(device.id.inner())
        .bind(device.user_id.inner())
        .bind(&device.token)
        .bind(&device.device_type)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_user(&self, user_id: &ID) -> anyhow::Result<Vec<Device>> {
        let devices: Vec<DeviceRaw> = sqlx::query_as(
            r#"
            SELECT d.id, d.user_id, d.fcm_token, d.device_type FROM devices AS d
            WHERE d.user_id = $1
            ORDER BY d.id
            "#,
        )
        .bind(user_id.inner())
        .fetch_all(&self.pool)
        .await?;

        Ok(devices.into_iter().map(|d| d.into()).collect())
    }
}
