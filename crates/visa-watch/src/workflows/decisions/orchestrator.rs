use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use super::domain::{RunOutcome, RunReport, RunStage};
use super::fetcher::{DocumentSource, FetchError, RecordFetcher};
use super::labels::date_labels;
use super::lookup::{Lookup, RecordTable};
use super::notifier::Notifier;
use super::resolver::{LinkResolver, PageSource};

/// One daily check: resolve the link, download, parse, look up, notify.
///
/// Failures at any stage are absorbed into the outcome; [`DecisionCheck::run`]
/// always finishes by sending exactly one message.
pub struct DecisionCheck<P, D, N> {
    resolver: LinkResolver<P>,
    fetcher: RecordFetcher<D>,
    notifier: Arc<N>,
    application_number: u64,
    lookback_days: u32,
}

impl<P, D, N> DecisionCheck<P, D, N>
where
    P: PageSource + 'static,
    D: DocumentSource + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        resolver: LinkResolver<P>,
        fetcher: RecordFetcher<D>,
        notifier: Arc<N>,
        application_number: u64,
        lookback_days: u32,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            notifier,
            application_number,
            lookback_days,
        }
    }

    pub fn application_number(&self) -> u64 {
        self.application_number
    }

    /// Runs every stage before the notification and returns the outcome with
    /// the stages entered so far.
    pub async fn evaluate(&self, today: NaiveDate) -> (RunOutcome, Vec<RunStage>) {
        let mut stages = vec![RunStage::ResolvingLink];

        let labels = date_labels(today, self.lookback_days);
        let Some(url) = self.resolver.resolve(&labels).await else {
            return (RunOutcome::NoLink, stages);
        };

        stages.push(RunStage::Fetching);
        let document = match self.fetcher.fetch(&url).await {
            Ok(document) => document,
            Err(FetchError::Status { status }) => {
                warn!(status, "visa decision file download was refused");
                return (RunOutcome::DownloadFailed { status }, stages);
            }
            Err(err) => {
                error!(error = %err, "visa decision file download failed");
                return (
                    RunOutcome::Failed {
                        stage: RunStage::Fetching,
                        detail: err.to_string(),
                    },
                    stages,
                );
            }
        };

        stages.push(RunStage::Parsing);
        let table = match RecordTable::from_ods(document.as_bytes()) {
            Ok(table) => table,
            Err(err) => {
                error!(error = %err, bytes = document.len(), "visa decision file could not be parsed");
                return (
                    RunOutcome::Failed {
                        stage: RunStage::Parsing,
                        detail: err.to_string(),
                    },
                    stages,
                );
            }
        };
        table.log_summary();

        stages.push(RunStage::LookingUp);
        let outcome = match table.lookup(self.application_number) {
            Lookup::Found(decision) => RunOutcome::Found { decision },
            Lookup::NotFound => RunOutcome::NotFound,
        };

        (outcome, stages)
    }

    pub async fn run(&self, today: NaiveDate) -> RunReport {
        let (outcome, mut stages) = self.evaluate(today).await;
        let message = outcome.message(self.application_number);

        let delivered = match self.notifier.send(&message).await {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "failed to send notification");
                false
            }
        };
        stages.push(RunStage::Notified);

        info!(
            %today,
            failed_stage = ?outcome.failed_stage(),
            delivered,
            message = %message,
            "visa decision check finished"
        );

        RunReport {
            outcome,
            message,
            stages,
            delivered,
        }
    }
}
