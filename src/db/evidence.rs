//! Types for evidence items (parsed text lines and photos).

use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceKind {
    Line,
    Photo,
}

impl EvidenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceKind::Line => "line",
            EvidenceKind::Photo => "photo",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "line" => Some(EvidenceKind::Line),
            "photo" => Some(EvidenceKind::Photo),
            _ => None,
        }
    }
}

/// Whether enough structured metadata was recovered from a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExifState {
    Missing,
    Extracted,
}

impl ExifState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExifState::Missing => "missing",
            ExifState::Extracted => "extracted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "missing" => Some(ExifState::Missing),
            "extracted" => Some(ExifState::Extracted),
            _ => None,
        }
    }
}

/// One unit of raw input contributing a date/resort signal.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceItem {
    pub id: i64,
    pub session_id: i64,
    pub kind: EvidenceKind,
    /// Line text for `Line`, blob reference for `Photo`.
    pub raw: String,
    pub line_no: Option<i64>,
    pub content_hash: Option<String>,
    pub taken_at: Option<NaiveDateTime>,
    pub date: Option<NaiveDate>,
    pub resort_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// `None` for text lines and for photos not processed yet.
    pub exif_state: Option<ExifState>,
    pub draft_id: Option<i64>,
    pub error: Option<String>,
}

impl EvidenceItem {
    /// The `(date, resort)` key, if both halves are resolved.
    pub fn key(&self) -> Option<(NaiveDate, i64)> {
        Some((self.date?, self.resort_id?))
    }
}

/// Fields for inserting a new evidence item.
#[derive(Debug, Clone, Default)]
pub struct NewEvidence {
    pub raw: String,
    pub line_no: Option<i64>,
    pub content_hash: Option<String>,
    pub date: Option<NaiveDate>,
    pub resort_id: Option<i64>,
    pub error: Option<String>,
}
