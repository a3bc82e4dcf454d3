mod broker;
mod config;
mod repos;
mod services;
mod system;

pub use broker::*;
pub use config::Config;
pub use repos::{
    IControlScheduleRepo, IDeviceRepo, IDrugScheduleRepo, IHemodialysisScheduleRepo,
    IMedicationRefillRepo, IUserRepo, Repos,
};
pub use services::*;
use sqlx::migrate::MigrateError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
pub use system::{ISys, RealSys, StaticTimeSys};
use tracing::info;

/// Everything a use case needs to talk to the outside world
#[derive(Clone)]
pub struct ReminderContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub push: Arc<dyn IPushNotifier>,
    pub publisher: Arc<dyn IReminderPublisher>,
}

struct ContextParams {
    pub postgres_connection_string: String,
    pub firebase_service_account_path: String,
}

impl ReminderContext {
    async fn create(
        params: ContextParams,
        config: Config,
        broker: &AmqpBroker,
    ) -> anyhow::Result<Self> {
        info!("DB CHECKING CONNECTION ...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&params.postgres_connection_string)
            .await?;
        info!("DB CHECKING CONNECTION ... [done]");

        if config.run_migrations {
            run_migration(&pool).await?;
            info!("Database migrations applied");
        }

        let push = FcmPushNotifier::from_service_account_file(&params.firebase_service_account_path)?;

        Ok(Self {
            repos: Repos::create_postgres(pool),
            config,
            sys: Arc::new(RealSys {}),
            push: Arc::new(push),
            publisher: Arc::new(broker.publisher()),
        })
    }

    /// Context with in-memory repositories, push notifier and publisher
    pub fn create_inmemory() -> Self {
        Self {
            repos: Repos::create_inmemory(),
            config: Config::default(),
            sys: Arc::new(RealSys {}),
            push: Arc::new(InMemoryPushNotifier::new()),
            publisher: Arc::new(InMemoryReminderPublisher::new()),
        }
    }
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context(config: Config, broker: &AmqpBroker) -> anyhow::Result<ReminderContext> {
    let firebase_service_account_path = config
        .firebase_service_account_path
        .clone()
        .ok_or_else(|| anyhow::anyhow!("FIREBASE_SERVICE_ACCOUNT_PATH env var to be present."))?;

    ReminderContext::create(
        ContextParams {
            postgres_connection_string: get_psql_connection_string()?,
            firebase_service_account_path,
        },
        config,
        broker,
    )
    .await
}

fn get_psql_connection_string() -> anyhow::Result<String> {
    const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

    std::env::var(PSQL_CONNECTION_STRING)
        .map_err(|_| anyhow::anyhow!("{} env var to be present.", PSQL_CONNECTION_STRING))
}

pub async fn run_migration(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!().run(pool).await
}
