//! Types for import sessions.

use std::fmt;

/// Lifecycle status of an import session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Waiting,
    Processing,
    Committed,
    Canceled,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Processing => "processing",
            SessionStatus::Committed => "committed",
            SessionStatus::Canceled => "canceled",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(SessionStatus::Waiting),
            "processing" => Some(SessionStatus::Processing),
            "committed" => Some(SessionStatus::Committed),
            "canceled" => Some(SessionStatus::Canceled),
            "failed" => Some(SessionStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the evidence of a session comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSource {
    Text,
    Photos,
}

impl ImportSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportSource::Text => "text",
            ImportSource::Photos => "photos",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(ImportSource::Text),
            "photos" => Some(ImportSource::Photos),
            _ => None,
        }
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An import session record.
#[derive(Debug, Clone)]
pub struct ImportSession {
    pub id: i64,
    pub owner_id: i64,
    pub source: ImportSource,
    pub status: SessionStatus,
    pub source_text: Option<String>,
    pub created_at: String,
}
