use super::IUserRepo;
use care_reminder_domain::{User, ID};
use sqlx::{FromRow, PgPool};

pub struct PostgresUserRepo {
    pool: PgPool,
}

impl PostgresUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRaw {
    id: i64,
    timezone: Option<String>,
}

impl From<UserRaw> for User {
    fn from(raw: UserRaw) -> Self {
        // `User::new` maps a missing timezone to the column default
        User::new(raw.id.into(), raw.timezone.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl IUserRepo for PostgresUserRepo {
    async fn insert(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users(id, timezone)
            VALUES($1, $2)
            "#,
        )
        .bind(user.id.inner())
        .bind(&user.timezone)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, user_id: &ID) -> anyhow::Result<Option<User>> {
        let user: Option<UserRaw> = sqlx::query_as(
            r#"
            SELECT u.id, u.timezone FROM users AS u
            WHERE u.id = $1
            "#,
        )
        .bind(user_id.inner())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user.map(|u| u.into()))
    }
}
