//! Daily visa decision check.
//!
//! The pipeline finds the latest published decisions spreadsheet by matching
//! link text against recent dates, downloads it, looks up one application
//! number and reports the result through a messaging API. Every run ends with
//! exactly one notification.

pub mod domain;
pub mod fetcher;
pub mod http;
pub mod labels;
pub mod lookup;
pub mod notifier;
mod orchestrator;
pub mod resolver;
pub mod schedule;
pub mod sheet;

pub use domain::{
    DateLabel, LinkCandidate, RunOutcome, RunReport, RunStage, DOWNLOAD_FAILED_MESSAGE,
    NO_LINK_MESSAGE,
};
pub use fetcher::{DocumentSource, FetchError, RawDocument, RecordFetcher, StagingSlot};
pub use http::HttpClient;
pub use labels::{date_labels, DEFAULT_LOOKBACK_DAYS};
pub use lookup::{DecisionRecord, Lookup, LookupError, RecordTable};
pub use notifier::{MessagingApiNotifier, Notifier, NotifyError};
pub use orchestrator::DecisionCheck;
pub use resolver::{find_link, link_text, LinkResolver, PageError, PageSource};
pub use schedule::{run_daily, Clock, DailySchedule, ScheduleError, SystemClock};
pub use sheet::{Cell, Sheet, SheetError};
