mod telemetry;

use care_reminder_infra::{setup_context, AmqpBroker, Config, Topology};
use care_reminder_worker::Application;
use telemetry::{get_subscriber, init_subscriber};
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("care_reminder_worker".into(), "info".into());
    init_subscriber(subscriber)?;

    let config = Config::new();
    let topology = Topology::new(config.retry_delay_millis);
    let broker = AmqpBroker::connect(&config.amqp_uri, &topology).await?;
    let context = setup_context(config, &broker).await?;

    Application::new(context, broker)
        .run(shutdown_signal())
        .await
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for SIGINT. Error: {:?}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Unable to listen for SIGTERM. Error: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
