//! Types for draft entries.

use chrono::NaiveDate;
use std::fmt;

/// Disposition of a draft entry at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pending,
    /// Attach to an existing calendar day.
    Merge,
    /// Create a new calendar day.
    Duplicate,
    Skip,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Pending => "pending",
            Decision::Merge => "merge",
            Decision::Duplicate => "duplicate",
            Decision::Skip => "skip",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Decision::Pending),
            "merge" => Some(Decision::Merge),
            "duplicate" => Some(Decision::Duplicate),
            "skip" => Some(Decision::Skip),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A staging bucket keyed by `(date, resort)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftEntry {
    pub id: i64,
    pub session_id: i64,
    pub date: NaiveDate,
    pub resort_id: i64,
    pub decision: Decision,
    pub linked_day_id: Option<i64>,
    pub notes: Option<String>,
}

impl DraftEntry {
    pub fn key(&self) -> (NaiveDate, i64) {
        (self.date, self.resort_id)
    }
}
