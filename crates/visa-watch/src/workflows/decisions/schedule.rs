use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tracing::info;

use crate::config::ScheduleConfig;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expression}': {message}")]
    Cron { expression: String, message: String },
    #[error("schedule '{0}' has no upcoming fire time")]
    Exhausted(String),
}

/// Source of the current instant, injectable so schedules can be tested
/// without waiting for real time to pass.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fires once a day at a fixed wall-clock time in a named timezone.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    expression: String,
    schedule: Schedule,
    timezone: Tz,
}

impl DailySchedule {
    pub fn new(time: NaiveTime, timezone: Tz) -> Result<Self, ScheduleError> {
        let expression = format!("0 {} {} * * *", time.minute(), time.hour());
        let schedule = Schedule::from_str(&expression).map_err(|err| ScheduleError::Cron {
            expression: expression.clone(),
            message: err.to_string(),
        })?;

        Ok(Self {
            expression,
            schedule,
            timezone,
        })
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ScheduleError> {
        Self::new(config.time, config.timezone)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First fire time strictly after `instant`.
    pub fn next_after(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&instant.with_timezone(&self.timezone))
            .next()
            .map(|next| next.with_timezone(&Utc))
    }

    /// Calendar date of `instant` in the schedule's timezone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }
}

/// Sleeps until each fire time and awaits `job` with that day's local date.
/// The next fire time is computed only after the job completes, so runs never
/// overlap. Fire times strictly increase even if the clock steps backwards,
/// so a day is never run twice.
pub async fn run_daily<C, F, Fut>(
    schedule: &DailySchedule,
    clock: &C,
    mut job: F,
) -> Result<(), ScheduleError>
where
    C: Clock + ?Sized,
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut after = clock.now();
    loop {
        let next = schedule
            .next_after(after)
            .ok_or_else(|| ScheduleError::Exhausted(schedule.expression.clone()))?;
        let wait = (next - clock.now()).to_std().unwrap_or_default();

        info!(
            next = %next.with_timezone(&schedule.timezone),
            wait_secs = wait.as_secs(),
            "next visa decision check scheduled"
        );
        tokio::time::sleep(wait).await;

        job(schedule.local_date(next)).await;
        after = clock.now().max(next);
    }
}
