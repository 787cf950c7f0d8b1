use crate::infra::{build_check, http_client, messaging_notifier, parse_date, DryRunNotifier};
use chrono::NaiveDate;
use clap::Args;
use std::sync::Arc;
use visa_watch::config::{AppConfig, NotifierConfig};
use visa_watch::error::AppError;
use visa_watch::telemetry;
use visa_watch::workflows::decisions::{date_labels, Clock, DailySchedule, SystemClock};

#[derive(Args, Debug, Default)]
pub(crate) struct CheckArgs {
    /// Date to check as YYYY-MM-DD (defaults to today in the schedule timezone)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the message instead of sending it
    #[arg(long)]
    pub(crate) dry_run: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct LabelsArgs {
    /// Date to generate labels for as YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

fn local_today(config: &AppConfig, today: Option<NaiveDate>) -> Result<NaiveDate, AppError> {
    if let Some(today) = today {
        return Ok(today);
    }
    let schedule = DailySchedule::from_config(&config.schedule)?;
    Ok(schedule.local_date(SystemClock.now()))
}

pub(crate) async fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let today = local_today(&config, args.today)?;
    let http = http_client(&config.watch)?;

    let report = if args.dry_run {
        build_check(&config.watch, http, Arc::new(DryRunNotifier))?
            .run(today)
            .await
    } else {
        let notifier_config = NotifierConfig::load()?;
        let notifier = Arc::new(messaging_notifier(&notifier_config, &http));
        build_check(&config.watch, http, notifier)?
            .run(today)
            .await
    };

    if !args.dry_run {
        let status = if report.delivered { "sent" } else { "not delivered" };
        println!("{status}: {}", report.message);
    }
    Ok(())
}

pub(crate) fn run_labels(args: LabelsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let today = local_today(&config, args.today)?;

    for label in date_labels(today, config.watch.lookback_days) {
        println!("{} {}", config.watch.link_prefix, label);
    }
    Ok(())
}
