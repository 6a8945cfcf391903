//! Error types for the import engine.

use chrono::NaiveDate;

use crate::db::{Decision, SessionStatus};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("not in waiting-status, but: {0}")]
    NotWaiting(SessionStatus),

    #[error("session already {0}")]
    AlreadyFinished(SessionStatus),

    #[error("cannot set decision to {decision}: no existing day to merge into")]
    NoLinkedDay { decision: Decision },

    #[error("day limit reached: {limit} days already recorded on {date}")]
    DayLimit { date: NaiveDate, limit: usize },

    #[error("invalid season start: {month:02}-{day:02}")]
    InvalidSeasonStart { month: u32, day: u32 },

    #[error("date out of range for season offset {0}")]
    SeasonOutOfRange(i32),

    #[error("evidence {0} belongs to another session")]
    ForeignEvidence(i64),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;

/// Result object handed across the library boundary.
///
/// Carries a success flag and an error reason instead of propagating `Err`.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: Option<T>,
    pub error: Option<String>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            value: None,
            error: Some(reason.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> std::result::Result<T, String> {
        match (self.value, self.error) {
            (Some(value), None) => Ok(value),
            (_, Some(error)) => Err(error),
            (None, None) => Err("empty outcome".to_string()),
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::ok(value),
            Err(e) => Outcome::failed(e.to_string()),
        }
    }
}
