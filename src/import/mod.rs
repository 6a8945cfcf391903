//! The import engine's caller-facing surface.
//!
//! [`Importer`] wraps the reconciler, parsers and commit coordinator. Every
//! operation returns an [`Outcome`] instead of an `Err`.

pub mod commit;
pub mod drafts;
pub mod text;

use chrono::NaiveDate;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::ImportConfig;
use crate::days;
use crate::db::{
    CalendarDay, Database, Decision, DraftEntry, EvidenceItem, EvidenceKind, ImportSession,
    ImportSource, NewDay, NewEvidence, NewResort, Resort, SessionStatus, SqliteStore,
};
use crate::error::{ImportError, Outcome, Result};
use crate::gazetteer::ResortMatcher;
use crate::renumber::{owner_calendar, renumber, renumber_in, RenumberSummary};
use crate::scanner::{self, content_hash, ExtractionSummary, ImageStore};
use crate::season::SeasonCalendar;
use crate::tasks::TaskUpdate;

pub use commit::{CommitFailure, CommitOptions, CommitReport};
pub use drafts::KeyUpdate;
pub use text::{LineError, ParsedLine};

/// A line that could not be filed under a draft.
#[derive(Debug, Clone, PartialEq)]
pub struct LineReport {
    pub line_no: usize,
    pub text: String,
    pub error: LineError,
}

/// Result of parsing a text import.
#[derive(Debug, Clone)]
pub struct TextImport {
    pub session_id: i64,
    pub lines: usize,
    pub drafts: Vec<DraftEntry>,
    pub errors: Vec<LineReport>,
}

impl TextImport {
    /// `"N errors"`, or `None` when every line was placed.
    pub fn error_summary(&self) -> Option<String> {
        match self.errors.len() {
            0 => None,
            1 => Some("1 error".to_string()),
            n => Some(format!("{} errors", n)),
        }
    }
}

/// A draft together with the evidence filed under it.
#[derive(Debug, Clone)]
pub struct DraftReport {
    pub draft: DraftEntry,
    pub evidence: Vec<EvidenceItem>,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session: ImportSession,
    pub drafts: Vec<DraftReport>,
    /// Evidence without a full `(date, resort)` key, waiting for review.
    pub unattached: Vec<EvidenceItem>,
}

pub(crate) fn load_session(store: &SqliteStore<'_>, session_id: i64) -> Result<ImportSession> {
    store
        .get_session(session_id)?
        .ok_or(ImportError::NotFound { entity: "session", id: session_id })
}

/// Load a session that may still be edited.
pub(crate) fn require_waiting(store: &SqliteStore<'_>, session_id: i64) -> Result<ImportSession> {
    let session = load_session(store, session_id)?;
    if session.status != SessionStatus::Waiting {
        return Err(ImportError::NotWaiting(session.status));
    }
    Ok(session)
}

fn require_resort(store: &SqliteStore<'_>, owner_id: i64, resort_id: i64) -> Result<Resort> {
    match store.get_resort(resort_id)? {
        Some(resort) if resort.verified || resort.suggested_by == Some(owner_id) => Ok(resort),
        _ => Err(ImportError::NotFound { entity: "resort", id: resort_id }),
    }
}

fn session_of_draft(store: &SqliteStore<'_>, draft_id: i64) -> Result<(ImportSession, DraftEntry)> {
    let draft = drafts::load_draft(store, draft_id)?;
    let session = require_waiting(store, draft.session_id)?;
    Ok((session, draft))
}

pub struct Importer {
    db: Arc<Database>,
    images: Arc<dyn ImageStore>,
    config: ImportConfig,
    clock: Arc<dyn Clock>,
}

impl Importer {
    pub fn new(db: Arc<Database>, images: Arc<dyn ImageStore>, config: ImportConfig) -> Self {
        Self::with_clock(db, images, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        db: Arc<Database>,
        images: Arc<dyn ImageStore>,
        config: ImportConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            images,
            config,
            clock,
        }
    }

    /// Register an owner with the configured default season start.
    pub fn create_owner(&self, name: &str) -> Outcome<i64> {
        let result = SeasonCalendar::parse(&self.config.default_season_start)
            .and_then(|calendar| self.db.write(|store| store.create_owner(name, calendar.start())));
        result.into()
    }

    /// Change an owner's season start. Every day number is cleared and only
    /// the current season is renumbered; older seasons stay unnumbered until
    /// a renumber covers them.
    pub fn set_season_start(&self, owner_id: i64, month: u32, day: u32) -> Outcome<RenumberSummary> {
        let today = self.clock.today();
        let result = SeasonCalendar::new(month, day).and_then(|_| {
            self.db.write(|store| {
                if store.get_owner(owner_id)?.is_none() {
                    return Err(ImportError::NotFound { entity: "owner", id: owner_id });
                }
                store.set_season_start(owner_id, month, day)?;
                let cleared = store.clear_day_numbers(owner_id)?;
                let summary = renumber_in(store, owner_id, &[today])?;
                info!(owner_id, month, day, cleared, renumbered = summary.days, "Season start changed");
                Ok(summary)
            })
        });
        result.into()
    }

    /// Recompute day numbers for every season touched by `dates`.
    pub fn renumber(&self, owner_id: i64, dates: &[NaiveDate]) -> Outcome<RenumberSummary> {
        renumber(&self.db, owner_id, dates).into()
    }

    pub fn start_session(&self, owner_id: i64, source: ImportSource) -> Outcome<ImportSession> {
        let result = self.db.write(|store| {
            if store.get_owner(owner_id)?.is_none() {
                return Err(ImportError::NotFound { entity: "owner", id: owner_id });
            }
            let id = store.insert_session(owner_id, source, None)?;
            info!(session_id = id, owner_id, %source, "Import session started");
            load_session(store, id)
        });
        result.into()
    }

    /// Parse free text into line evidence and file it under drafts.
    ///
    /// Year-less dates are placed in the season `season_offset_hint` away
    /// from the current one. Lines without a date or a confident resort are
    /// kept as unattached evidence and listed in the result.
    pub fn parse_text(&self, session_id: i64, raw_text: &str, season_offset_hint: i32) -> Outcome<TextImport> {
        self.try_parse_text(session_id, raw_text, season_offset_hint).into()
    }

    fn try_parse_text(&self, session_id: i64, raw_text: &str, season_offset_hint: i32) -> Result<TextImport> {
        let today = self.clock.today();
        let (session, season, resorts) = self.db.read(|store| {
            let session = require_waiting(store, session_id)?;
            if session.source != ImportSource::Text {
                return Err(ImportError::Invalid(format!("session {} is not a text import", session_id)));
            }
            let calendar = owner_calendar(store, session.owner_id)?;
            let season = calendar.date_range(season_offset_hint, today)?;
            let resorts = store.visible_resorts(session.owner_id)?;
            Ok((session, season, resorts))
        })?;

        let matcher = ResortMatcher::new(resorts, self.config.match_threshold);
        let parsed = text::parse_lines(raw_text, &season, &matcher);

        self.db.write(|store| {
            // Recheck inside the write lock; the session may have moved on.
            let session = require_waiting(store, session.id)?;
            store.set_session_source_text(session.id, raw_text)?;

            let mut errors = Vec::new();
            for line in &parsed {
                let evidence_id = store.insert_evidence(
                    session.id,
                    EvidenceKind::Line,
                    &NewEvidence {
                        raw: line.text.clone(),
                        line_no: Some(line.line_no as i64),
                        content_hash: None,
                        date: line.date,
                        resort_id: line.resort.as_ref().map(|r| r.id),
                        error: line.error.as_ref().map(|e| e.to_string()),
                    },
                )?;
                if let Some(error) = &line.error {
                    errors.push(LineReport {
                        line_no: line.line_no,
                        text: line.text.clone(),
                        error: error.clone(),
                    });
                    continue;
                }
                let evidence = store
                    .get_evidence(evidence_id)?
                    .ok_or(ImportError::NotFound { entity: "evidence", id: evidence_id })?;
                drafts::attach_evidence(store, &session, &evidence)?;
            }

            let import = TextImport {
                session_id: session.id,
                lines: parsed.len(),
                drafts: store.drafts_for_session(session.id)?,
                errors,
            };
            info!(
                session_id = session.id,
                lines = import.lines,
                drafts = import.drafts.len(),
                errors = import.errors.len(),
                "Text parsed"
            );
            Ok(import)
        })
    }

    /// Queue a photo for extraction. The same bytes enqueued twice in one
    /// session yield the existing evidence item.
    pub fn enqueue_photo(&self, session_id: i64, blob_ref: &str) -> Outcome<EvidenceItem> {
        let result = self.images.bytes(blob_ref).and_then(|bytes| {
            let hash = content_hash(&bytes);
            self.db.write(|store| {
                let session = require_waiting(store, session_id)?;
                if session.source != ImportSource::Photos {
                    return Err(ImportError::Invalid(format!(
                        "session {} is not a photo import",
                        session_id
                    )));
                }
                if let Some(existing) = store.find_evidence_by_hash(session.id, &hash)? {
                    return Ok(existing);
                }
                let id = store.insert_evidence(
                    session.id,
                    EvidenceKind::Photo,
                    &NewEvidence {
                        raw: blob_ref.to_string(),
                        content_hash: Some(hash.clone()),
                        ..Default::default()
                    },
                )?;
                store
                    .get_evidence(id)?
                    .ok_or(ImportError::NotFound { entity: "evidence", id })
            })
        });
        result.into()
    }

    /// Extract metadata for every queued photo of the session.
    pub fn process_photos(
        &self,
        session_id: i64,
        progress_tx: Option<mpsc::Sender<TaskUpdate>>,
        cancel_flag: &AtomicBool,
    ) -> Outcome<ExtractionSummary> {
        let result = self
            .db
            .read(|store| {
                let session = require_waiting(store, session_id)?;
                let resorts = store.visible_resorts(session.owner_id)?;
                Ok((session, resorts))
            })
            .and_then(|(session, resorts)| {
                scanner::process_photos(
                    &self.db,
                    self.images.as_ref(),
                    &session,
                    &resorts,
                    progress_tx,
                    cancel_flag,
                )
            });
        result.into()
    }

    pub fn update_draft_key(&self, draft_id: i64, date: NaiveDate, resort_id: i64) -> Outcome<KeyUpdate> {
        let result = self.db.write(|store| {
            let (session, _) = session_of_draft(store, draft_id)?;
            require_resort(store, session.owner_id, resort_id)?;
            drafts::update_key(store, &session, draft_id, date, resort_id)
        });
        result.into()
    }

    pub fn update_draft_decision(&self, draft_id: i64, decision: Decision) -> Outcome<DraftEntry> {
        let result = self.db.write(|store| {
            let (session, _) = session_of_draft(store, draft_id)?;
            drafts::update_decision(store, &session, draft_id, decision)
        });
        result.into()
    }

    /// Correct one evidence item's date and resort and re-file it.
    pub fn update_evidence(&self, evidence_id: i64, date: NaiveDate, resort_id: i64) -> Outcome<Option<DraftEntry>> {
        let result = self.db.write(|store| {
            let evidence = store
                .get_evidence(evidence_id)?
                .ok_or(ImportError::NotFound { entity: "evidence", id: evidence_id })?;
            let session = require_waiting(store, evidence.session_id)?;
            require_resort(store, session.owner_id, resort_id)?;
            drafts::update_evidence(store, &session, evidence_id, date, resort_id)
        });
        result.into()
    }

    pub fn commit(&self, session_id: i64) -> Outcome<CommitReport> {
        self.commit_with_progress(session_id, None, None)
    }

    pub fn commit_with_progress(
        &self,
        session_id: i64,
        progress: Option<mpsc::Sender<TaskUpdate>>,
        cancel_flag: Option<&AtomicBool>,
    ) -> Outcome<CommitReport> {
        let options = CommitOptions {
            max_days_per_date: self.config.max_days_per_date,
            clock: self.clock.as_ref(),
            progress,
            cancel_flag,
        };
        let report = match commit::commit_session(&self.db, session_id, options) {
            Ok(report) => report,
            Err(e) => return Outcome::failed(e.to_string()),
        };
        if report.success() {
            Outcome::ok(report)
        } else {
            let reason = format!(
                "session {} ended {} with {} failures",
                report.session_id,
                report.status,
                report.failures.len()
            );
            Outcome {
                value: Some(report),
                error: Some(reason),
            }
        }
    }

    /// Mark a session canceled. No calendar days are touched; committed and
    /// failed sessions keep their outcome.
    pub fn cancel(&self, session_id: i64) -> Outcome<ImportSession> {
        let result = self.db.write(|store| {
            let session = load_session(store, session_id)?;
            if matches!(session.status, SessionStatus::Committed | SessionStatus::Failed) {
                return Err(ImportError::AlreadyFinished(session.status));
            }
            store.set_session_status(session.id, SessionStatus::Canceled)?;
            info!(session_id, from = %session.status, "Import session canceled");
            load_session(store, session_id)
        });
        result.into()
    }

    /// Delete a session with its drafts and evidence.
    pub fn delete_session(&self, session_id: i64) -> Outcome<()> {
        let result = self.db.write(|store| {
            load_session(store, session_id)?;
            store.delete_session(session_id)
        });
        result.into()
    }

    pub fn session_report(&self, session_id: i64) -> Outcome<SessionReport> {
        let result = self.db.read(|store| {
            let session = load_session(store, session_id)?;
            let drafts = store
                .drafts_for_session(session_id)?
                .into_iter()
                .map(|draft| {
                    let evidence = store.evidence_for_draft(draft.id)?;
                    Ok(DraftReport { draft, evidence })
                })
                .collect::<Result<Vec<_>>>()?;
            let unattached = store.unattached_evidence(session_id)?;
            Ok(SessionReport {
                session,
                drafts,
                unattached,
            })
        });
        result.into()
    }

    /// Record a day directly in the owner's calendar.
    pub fn create_day(
        &self,
        owner_id: i64,
        date: NaiveDate,
        resort_id: i64,
        notes: Option<&str>,
    ) -> Outcome<CalendarDay> {
        let created_at = self.clock.now();
        let result = self.db.write(|store| {
            if store.get_owner(owner_id)?.is_none() {
                return Err(ImportError::NotFound { entity: "owner", id: owner_id });
            }
            require_resort(store, owner_id, resort_id)?;
            let day = NewDay {
                owner_id,
                date,
                resort_id,
                notes: notes.map(str::to_string),
                created_at,
            };
            days::create_day(store, &day, self.config.max_days_per_date)
        });
        result.into()
    }

    pub fn move_day(&self, day_id: i64, date: NaiveDate, resort_id: i64) -> Outcome<CalendarDay> {
        let result = self.db.write(|store| {
            let day = days::load_day(store, day_id)?;
            require_resort(store, day.owner_id, resort_id)?;
            days::move_day(store, day_id, date, resort_id, self.config.max_days_per_date)
        });
        result.into()
    }

    pub fn delete_day(&self, day_id: i64) -> Outcome<()> {
        self.db.write(|store| days::delete_day(store, day_id)).into()
    }

    /// Record an owner-suggested resort, visible only to that owner until
    /// verified.
    pub fn suggest_resort(
        &self,
        owner_id: i64,
        name: &str,
        country: &str,
        coordinates: Option<(f64, f64)>,
    ) -> Outcome<Resort> {
        let name = name.trim();
        if name.is_empty() {
            return Outcome::failed(ImportError::Invalid("resort name is empty".into()).to_string());
        }
        let result = self.db.write(|store| {
            if store.get_owner(owner_id)?.is_none() {
                return Err(ImportError::NotFound { entity: "owner", id: owner_id });
            }
            let id = store.insert_resort(&NewResort {
                name: name.to_string(),
                country: country.trim().to_string(),
                latitude: coordinates.map(|c| c.0),
                longitude: coordinates.map(|c| c.1),
                verified: false,
                suggested_by: Some(owner_id),
            })?;
            info!(resort_id = id, owner_id, name, "Resort suggested");
            store
                .get_resort(id)?
                .ok_or(ImportError::NotFound { entity: "resort", id })
        });
        result.into()
    }
}
