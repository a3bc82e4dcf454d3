use care_reminder_domain::due_time::parse_timezone;
use chrono::NaiveTime;
use chrono_tz::Tz;
use std::time::Duration;
use tracing::warn;

const DEFAULT_RETRY_DELAY_MILLIS: u32 = 60_000;
const DEFAULT_SERVER_TIMEZONE: &str = "Asia/Makassar";
const DEFAULT_MONITORING_REMINDER_TIME: &str = "07:00";
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    /// AMQP connection string for the message broker
    pub amqp_uri: String,
    /// Time to live in millis of messages parked in the dead letter queue.
    /// This is the delay between two checks of a reminder that is not yet
    /// due. Lower values make dispatch more punctual but cause more
    /// redeliveries.
    pub retry_delay_millis: u32,
    /// Timezone used to decide what "today" is for the daily monitoring
    /// reminder sweep
    pub server_timezone: Tz,
    /// Wall clock time in `server_timezone` at which the daily sweep runs
    pub monitoring_reminder_time: NaiveTime,
    /// Path to the firebase service account credentials
    pub firebase_service_account_path: Option<String>,
    /// Upper bound on how long shutdown waits for the message being
    /// processed to finish
    pub shutdown_timeout: Duration,
    /// Apply the bundled migrations on startup
    pub run_migrations: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from a key value lookup. Invalid values are
    /// logged and replaced by their defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let amqp_uri = match lookup("RABBITMQ_URL") {
            Some(uri) if !uri.trim().is_empty() => uri,
            _ => {
                let user = lookup("RABBITMQ_USER").unwrap_or_else(|| "guest".into());
                let pass = lookup("RABBITMQ_PASS").unwrap_or_else(|| "guest".into());
                let host = lookup("RABBITMQ_HOST").unwrap_or_else(|| "localhost".into());
                let port = lookup("RABBITMQ_PORT").unwrap_or_else(|| "5672".into());
                format!("amqp://{}:{}@{}:{}/%2f", user, pass, host, port)
            }
        };

        let retry_delay_millis = match lookup("REMINDER_RETRY_DELAY_MILLIS") {
            None => DEFAULT_RETRY_DELAY_MILLIS,
            Some(value) => match value.parse::<u32>() {
                Ok(millis) if millis > 0 && millis <= i32::MAX as u32 => millis,
                _ => {
                    warn!(
                        "The given REMINDER_RETRY_DELAY_MILLIS: {} is not valid, falling back to the default: {}.",
                        value, DEFAULT_RETRY_DELAY_MILLIS
                    );
                    DEFAULT_RETRY_DELAY_MILLIS
                }
            },
        };

        let server_timezone = match lookup("SERVER_TIMEZONE") {
            None => {
                warn!(
                    "SERVER_TIMEZONE is not set, falling back to {}.",
                    DEFAULT_SERVER_TIMEZONE
                );
                chrono_tz::Asia::Makassar
            }
            Some(name) => match parse_timezone(&name) {
                Ok(tz) => tz,
                Err(e) => {
                    warn!("{} Falling back to UTC.", e);
                    chrono_tz::UTC
                }
            },
        };

        let default_time = NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default();
        let monitoring_reminder_time = match lookup("MONITORING_REMINDER_TIME") {
            None => default_time,
            Some(value) => match NaiveTime::parse_from_str(value.trim(), "%H:%M") {
                Ok(time) => time,
                Err(_) => {
                    warn!(
                        "The given MONITORING_REMINDER_TIME: {} is not a valid HH:MM time, falling back to {}.",
                        value, DEFAULT_MONITORING_REMINDER_TIME
                    );
                    default_time
                }
            },
        };

        let shutdown_timeout_secs = match lookup("SHUTDOWN_TIMEOUT_SECS") {
            None => DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            Some(value) => value.parse::<u64>().unwrap_or_else(|_| {
                warn!(
                    "The given SHUTDOWN_TIMEOUT_SECS: {} is not valid, falling back to {}.",
                    value, DEFAULT_SHUTDOWN_TIMEOUT_SECS
                );
                DEFAULT_SHUTDOWN_TIMEOUT_SECS
            }),
        };

        let run_migrations = lookup("RUN_MIGRATIONS")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            amqp_uri,
            retry_delay_millis,
            server_timezone,
            monitoring_reminder_time,
            firebase_service_account_path: lookup("FIREBASE_SERVICE_ACCOUNT_PATH")
                .filter(|path| !path.trim().is_empty()),
            shutdown_timeout: Duration::from_secs(shutdown_timeout_secs),
            run_migrations,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
