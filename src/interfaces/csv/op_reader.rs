use crate::domain::plan::Frequency;
use crate::error::{ClubError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One operation of a batch-import script.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum OpType {
    CreatePlan,
    CreateMethod,
    Enroll,
    Pay,
    Verify,
    Reject,
    Payout,
}

/// One row of the operations CSV.
///
/// Every column except `op` is optional at the CSV level; which ones an
/// operation actually needs is checked when the row is applied.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OpRecord {
    pub op: OpType,
    /// Calendar date the operation happens on, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    /// Member email.
    #[serde(default)]
    pub user: Option<String>,
    /// Plan name.
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Payment method name.
    #[serde(default)]
    pub method: Option<String>,
    /// Proof content for `pay` rows.
    #[serde(default)]
    pub proof: Option<String>,
    /// Slot count for `create-plan` rows.
    #[serde(default)]
    pub slots: Option<u32>,
    #[serde(default)]
    pub note: Option<String>,
}

impl OpRecord {
    /// The row's date at midnight UTC, if one was given.
    pub fn timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        match &self.date {
            None => Ok(None),
            Some(raw) => {
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                    ClubError::Validation(format!("invalid date '{raw}': {e}"))
                })?;
                let midnight = date
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| ClubError::Validation(format!("invalid date '{raw}'")))?;
                Ok(Some(midnight.and_utc()))
            }
        }
    }
}

/// Reads batch operations from a CSV source.
///
/// Wraps `csv::Reader` and provides an iterator over `Result<OpRecord>`,
/// trimming whitespace and tolerating rows that omit trailing columns.
pub struct OpReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OpReader<R> {
    /// Creates a new `OpReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes operations.
    pub fn ops(self) -> impl Iterator<Item = Result<OpRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(ClubError::from))
    }
}
