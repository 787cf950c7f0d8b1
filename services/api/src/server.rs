use crate::cli::ServeArgs;
use crate::infra::{build_check, http_client, messaging_notifier};
use crate::routes::router;
use std::sync::Arc;
use tracing::{error, info};
use visa_watch::config::{AppConfig, NotifierConfig};
use visa_watch::error::AppError;
use visa_watch::telemetry;
use visa_watch::workflows::decisions::{run_daily, DailySchedule, SystemClock};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    let notifier_config = NotifierConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let schedule = DailySchedule::from_config(&config.schedule)?;
    let http = http_client(&config.watch)?;
    let notifier = Arc::new(messaging_notifier(&notifier_config, &http));
    let check = Arc::new(build_check(&config.watch, http, notifier)?);

    info!(
        application_number = check.application_number(),
        time = %config.schedule.time,
        timezone = %schedule.timezone(),
        "daily visa decision check enabled"
    );

    tokio::spawn(async move {
        let outcome = run_daily(&schedule, &SystemClock, move |today| {
            let check = check.clone();
            async move {
                check.run(today).await;
            }
        })
        .await;
        if let Err(err) = outcome {
            error!(error = %err, "daily scheduler stopped");
        }
    });

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(?config.environment, %addr, "visa status checker ready");

    axum::serve(listener, router()).await?;
    Ok(())
}
