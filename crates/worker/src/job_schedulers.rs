use crate::{
    reminder::send_monitoring_reminders::SendMonitoringRemindersUseCase,
    shared::usecase::execute,
};
use care_reminder_domain::due_time::next_daily_run;
use care_reminder_infra::ReminderContext;
use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use std::time::Duration;
use tokio::{task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub fn get_start_delay(now: DateTime<Utc>, next_run: DateTime<Utc>) -> Duration {
    (next_run - now).to_std().unwrap_or(Duration::ZERO)
}

/// The next sweep instant. The monotonic sleep may wake up slightly
/// before the wall clock reaches `last_run`, so the next run is computed
/// from whichever is later.
fn next_sweep_at(
    now: DateTime<Utc>,
    last_run: Option<DateTime<Utc>>,
    tz: &Tz,
    time: NaiveTime,
) -> DateTime<Utc> {
    let from = last_run.map_or(now, |last_run| now.max(last_run));
    next_daily_run(from, tz, time)
}

/// Runs the monitoring reminder sweep every day at the configured time in
/// the server timezone. A sweep that has started always runs to the end,
/// `token` is only checked while waiting for the next run.
pub fn start_monitoring_reminders_job(ctx: ReminderContext, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_run = None;
        loop {
            let now = ctx.sys.now();
            let next_run = next_sweep_at(
                now,
                last_run,
                &ctx.config.server_timezone,
                ctx.config.monitoring_reminder_time,
            );
            info!(next_run = %next_run, "Monitoring reminder sweep scheduled");

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = sleep(get_start_delay(now, next_run)) => {}
            }

            let _ = execute(SendMonitoringRemindersUseCase, &ctx).await;
            last_run = Some(next_run);
        }
        info!("Monitoring reminder job stopped");
    })
}
