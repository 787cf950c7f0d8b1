use std::fmt;

pub const NO_LINK_MESSAGE: &str = "Could not find the latest Visa Decision file URL.";
pub const DOWNLOAD_FAILED_MESSAGE: &str = "Failed to download the Visa Decision file.";
pub const NOT_FOUND_LABEL: &str = "Not Found";

/// Human-readable date used to match link text, e.g. `9 June 2025`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateLabel(String);

impl DateLabel {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A label paired with the link target found for it on the page, if any.
/// The target is the raw `href` value, possibly relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    pub label: DateLabel,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStage {
    ResolvingLink,
    Fetching,
    Parsing,
    LookingUp,
    Notified,
}

impl RunStage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ResolvingLink => "resolving link",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::LookingUp => "looking up",
            Self::Notified => "notified",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a run ended before the notification went out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Found { decision: String },
    NotFound,
    NoLink,
    DownloadFailed { status: u16 },
    Failed { stage: RunStage, detail: String },
}

impl RunOutcome {
    pub fn message(&self, application_number: u64) -> String {
        match self {
            Self::Found { decision } => format!("Application Number {application_number}: {decision}"),
            Self::NotFound => format!("Application Number {application_number}: {NOT_FOUND_LABEL}"),
            Self::NoLink => NO_LINK_MESSAGE.to_string(),
            Self::DownloadFailed { .. } => DOWNLOAD_FAILED_MESSAGE.to_string(),
            Self::Failed { detail, .. } => format!("An error occurred: {detail}"),
        }
    }

    /// The stage that failed, for outcomes that are not a lookup result.
    pub fn failed_stage(&self) -> Option<RunStage> {
        match self {
            Self::Found { .. } | Self::NotFound => None,
            Self::NoLink => Some(RunStage::ResolvingLink),
            Self::DownloadFailed { .. } => Some(RunStage::Fetching),
            Self::Failed { stage, .. } => Some(*stage),
        }
    }
}

/// Summary of one run, returned to callers and used in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub message: String,
    /// Stages entered in order; always ends with [`RunStage::Notified`].
    pub stages: Vec<RunStage>,
    pub delivered: bool,
}

impl RunReport {
    pub fn terminal_stage(&self) -> Option<RunStage> {
        self.stages.last().copied()
    }

    pub fn reached(&self, stage: RunStage) -> bool {
        self.stages.contains(&stage)
    }
}
