use std::collections::BTreeSet;

use tracing::{debug, info};

use super::domain::NOT_FOUND_LABEL;
use super::sheet::{Cell, Sheet, SheetError};

/// Leading sheet rows skipped before the header row.
pub const PREAMBLE_ROWS: usize = 6;
/// Rows below the header that precede the data region.
pub const FRAME_ROWS_SKIPPED: usize = 4;
/// First sheet row (0-based) that can hold a record.
pub const DATA_START_ROW: usize = PREAMBLE_ROWS + 1 + FRAME_ROWS_SKIPPED;

pub const APPLICATION_NUMBER_COLUMN: usize = 2;
pub const DECISION_COLUMN: usize = 3;
const REQUIRED_COLUMNS: usize = DECISION_COLUMN + 1;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("could not read spreadsheet: {0}")]
    Format(#[from] SheetError),
    #[error("spreadsheet has {found} columns, expected at least 4")]
    MissingColumns { found: usize },
}

/// One cleaned row: `Application Number` and `Decision`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRecord {
    pub application_number: u64,
    pub decision: String,
}

impl DecisionRecord {
    pub fn new(application_number: u64, decision: impl Into<String>) -> Self {
        Self {
            application_number,
            decision: decision.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    NotFound,
}

impl Lookup {
    /// Decision text, or `Not Found`.
    pub fn label(&self) -> &str {
        match self {
            Lookup::Found(decision) => decision,
            Lookup::NotFound => NOT_FOUND_LABEL,
        }
    }
}

/// Rows of the decisions sheet in document order. Application numbers may
/// repeat; lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTable {
    rows: Vec<DecisionRecord>,
}

impl RecordTable {
    pub fn from_rows(rows: Vec<DecisionRecord>) -> Self {
        Self { rows }
    }

    /// Parses an OpenDocument spreadsheet and cleans its first sheet.
    pub fn from_ods(bytes: &[u8]) -> Result<Self, LookupError> {
        let sheet = Sheet::from_ods(bytes)?;
        Self::from_sheet(&sheet)
    }

    /// Cells are addressed by absolute sheet position, so blank leading rows
    /// or columns never shift the data region.
    pub fn from_sheet(sheet: &Sheet) -> Result<Self, LookupError> {
        let width = sheet.width();
        if width < REQUIRED_COLUMNS {
            return Err(LookupError::MissingColumns { found: width });
        }

        let rows = (DATA_START_ROW..sheet.height())
            .filter_map(|row| {
                let number = application_number(sheet.cell(row, APPLICATION_NUMBER_COLUMN))?;
                let decision = decision_text(sheet.cell(row, DECISION_COLUMN))?;
                Some(DecisionRecord::new(number, decision))
            })
            .collect();

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[DecisionRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn lookup(&self, application_number: u64) -> Lookup {
        let found = self
            .rows
            .iter()
            .find(|record| record.application_number == application_number)
            .map(|record| Lookup::Found(record.decision.clone()))
            .unwrap_or(Lookup::NotFound);

        info!(application_number, result = found.label(), "application lookup");
        found
    }

    /// First `limit` distinct application numbers, in document order.
    pub fn sample_numbers(&self, limit: usize) -> Vec<u64> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .map(|record| record.application_number)
            .filter(|number| seen.insert(*number))
            .take(limit)
            .collect()
    }

    pub fn log_summary(&self) {
        debug!(
            rows = self.len(),
            sample = ?self.sample_numbers(10),
            "available application numbers"
        );
    }
}

/// Integral numbers and integer-looking text both compare as `u64`.
fn application_number(cell: &Cell) -> Option<u64> {
    match cell {
        Cell::Number(value) if value.fract() == 0.0 && *value >= 0.0 => Some(*value as u64),
        Cell::Text(value) => value.trim().parse().ok(),
        _ => None,
    }
}

fn decision_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Text(value) => Some(value.clone()),
        Cell::Number(value) if value.fract() == 0.0 => Some(format!("{value:.0}")),
        Cell::Number(value) => Some(value.to_string()),
    }
}
