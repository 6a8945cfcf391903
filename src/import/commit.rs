//! Applying a session's draft decisions to the calendar.
//!
//! Each draft is applied in its own transaction. A failing draft is recorded
//! and the rest still run; the session ends `failed` if anything failed, with
//! the days already created left in place.

use chrono::NaiveDate;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::days::insert_checked;
use crate::db::{
    Database, Decision, DraftEntry, EvidenceKind, ImportSession, NewDay, SessionStatus, SqliteStore,
};
use crate::error::{ImportError, Result};
use crate::renumber::{renumber, RenumberSummary};
use crate::tasks::{is_cancelled, TaskProgress, TaskUpdate};

#[derive(Debug, Clone, PartialEq)]
pub struct CommitFailure {
    /// `None` when the failure was not tied to one draft (renumbering).
    pub draft_id: Option<i64>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitReport {
    pub session_id: i64,
    pub status: SessionStatus,
    /// Days created for `duplicate` drafts.
    pub created: Vec<i64>,
    /// Existing days that `merge` drafts were applied to.
    pub merged: Vec<i64>,
    /// `skip` and `pending` drafts.
    pub ignored: usize,
    pub failures: Vec<CommitFailure>,
    pub renumbered: RenumberSummary,
}

impl CommitReport {
    pub fn success(&self) -> bool {
        self.status == SessionStatus::Committed
    }
}

/// Commit options for one run.
pub struct CommitOptions<'a> {
    pub max_days_per_date: usize,
    pub clock: &'a dyn Clock,
    pub progress: Option<mpsc::Sender<TaskUpdate>>,
    pub cancel_flag: Option<&'a AtomicBool>,
}

/// Move the session from waiting to processing, or fail without touching
/// anything.
fn begin(store: &SqliteStore<'_>, session_id: i64) -> Result<ImportSession> {
    let session = store
        .get_session(session_id)?
        .ok_or(ImportError::NotFound { entity: "session", id: session_id })?;
    if session.status != SessionStatus::Waiting
        || !store.transition_session(session_id, SessionStatus::Waiting, SessionStatus::Processing)?
    {
        return Err(ImportError::NotWaiting(session.status));
    }
    Ok(ImportSession {
        status: SessionStatus::Processing,
        ..session
    })
}

/// Move the session from processing to `status`. A session that left
/// processing meanwhile (canceled mid-commit) keeps its status, which is
/// returned instead.
fn close_session(store: &SqliteStore<'_>, session_id: i64, status: SessionStatus) -> Result<SessionStatus> {
    if store.transition_session(session_id, SessionStatus::Processing, status)? {
        return Ok(status);
    }
    let session = store
        .get_session(session_id)?
        .ok_or(ImportError::NotFound { entity: "session", id: session_id })?;
    Ok(session.status)
}

/// Single-line attribution note for a day created by an import.
fn attribution(session: &ImportSession, draft: &DraftEntry) -> String {
    let origin = format!("Imported from {} import #{}", session.source, session.id);
    let text = draft
        .notes
        .as_deref()
        .map(|notes| {
            notes
                .lines()
                .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default();
    if text.is_empty() {
        origin
    } else {
        format!("{}: {}", origin, text)
    }
}

fn attach_photos(store: &SqliteStore<'_>, draft_id: i64, day_id: i64) -> Result<()> {
    for evidence in store.evidence_for_draft(draft_id)? {
        if evidence.kind == EvidenceKind::Photo {
            store.add_day_photo(day_id, &evidence.raw)?;
        }
    }
    Ok(())
}

fn apply_duplicate(
    store: &SqliteStore<'_>,
    session: &ImportSession,
    draft: &DraftEntry,
    options: &CommitOptions<'_>,
) -> Result<i64> {
    let day = NewDay {
        owner_id: session.owner_id,
        date: draft.date,
        resort_id: draft.resort_id,
        notes: Some(attribution(session, draft)),
        created_at: options.clock.now(),
    };
    let day_id = insert_checked(store, &day, options.max_days_per_date)?;
    store.set_draft_decision(draft.id, Decision::Duplicate, Some(day_id))?;
    attach_photos(store, draft.id, day_id)?;
    Ok(day_id)
}

fn apply_merge(store: &SqliteStore<'_>, draft: &DraftEntry) -> Result<i64> {
    let day = match draft.linked_day_id {
        Some(day_id) => store.get_day(day_id)?,
        None => None,
    };
    let day = day.ok_or(ImportError::NoLinkedDay {
        decision: Decision::Merge,
    })?;
    attach_photos(store, draft.id, day.id)?;
    Ok(day.id)
}

/// Commit a waiting session.
///
/// Returns `Err` only when the session cannot start committing (missing, or
/// not waiting) or when its drafts cannot be read; per-draft failures land in
/// the report.
pub fn commit_session(db: &Database, session_id: i64, options: CommitOptions<'_>) -> Result<CommitReport> {
    let session = db.write(|store| begin(store, session_id))?;
    info!(session_id, owner_id = session.owner_id, "Commit started");

    match apply_drafts(db, &session, &options) {
        Ok(mut report) => {
            let requested = if report.failures.is_empty() {
                SessionStatus::Committed
            } else {
                SessionStatus::Failed
            };
            report.status = db.write(|store| close_session(store, session_id, requested))?;
            if report.status != requested {
                warn!(session_id, status = %report.status, "Session changed during commit");
                report.failures.push(CommitFailure {
                    draft_id: None,
                    reason: format!("session was {} during commit", report.status),
                });
            }
            info!(
                session_id,
                status = %report.status,
                created = report.created.len(),
                merged = report.merged.len(),
                failures = report.failures.len(),
                "Commit finished"
            );
            if let Some(tx) = &options.progress {
                let _ = tx.send(TaskUpdate::Completed {
                    message: format!("session {} {}", session_id, report.status),
                });
            }
            Ok(report)
        }
        Err(e) => {
            warn!(session_id, error = %e, "Commit aborted");
            db.write(|store| close_session(store, session_id, SessionStatus::Failed))?;
            if let Some(tx) = &options.progress {
                let _ = tx.send(TaskUpdate::Failed { error: e.to_string() });
            }
            Err(e)
        }
    }
}

fn apply_drafts(db: &Database, session: &ImportSession, options: &CommitOptions<'_>) -> Result<CommitReport> {
    let drafts = db.read(|store| store.drafts_for_session(session.id))?;
    let mut report = CommitReport {
        session_id: session.id,
        status: SessionStatus::Processing,
        created: Vec::new(),
        merged: Vec::new(),
        ignored: 0,
        failures: Vec::new(),
        renumbered: RenumberSummary::default(),
    };
    let mut dates: Vec<NaiveDate> = Vec::new();

    if let Some(tx) = &options.progress {
        let _ = tx.send(TaskUpdate::Started { total: drafts.len() });
    }

    for (index, draft) in drafts.iter().enumerate() {
        if options.cancel_flag.is_some_and(is_cancelled) {
            report.failures.push(CommitFailure {
                draft_id: Some(draft.id),
                reason: "commit cancelled".to_string(),
            });
            continue;
        }
        if let Some(tx) = &options.progress {
            let progress = TaskProgress::new(index + 1, drafts.len())
                .with_item(format!("{} #{}", draft.date, draft.resort_id));
            let _ = tx.send(TaskUpdate::Progress(progress));
        }

        let applied = match draft.decision {
            Decision::Duplicate => db
                .write(|store| apply_duplicate(store, session, draft, options))
                .map(|day| report.created.push(day)),
            Decision::Merge => db
                .write(|store| apply_merge(store, draft))
                .map(|day| report.merged.push(day)),
            Decision::Skip | Decision::Pending => {
                report.ignored += 1;
                continue;
            }
        };

        match applied {
            Ok(()) => dates.push(draft.date),
            Err(e) => {
                warn!(draft_id = draft.id, decision = %draft.decision, error = %e, "Draft not applied");
                report.failures.push(CommitFailure {
                    draft_id: Some(draft.id),
                    reason: e.to_string(),
                });
            }
        }
    }

    if !dates.is_empty() {
        match renumber(db, session.owner_id, &dates) {
            Ok(summary) => report.renumbered = summary,
            Err(e) => report.failures.push(CommitFailure {
                draft_id: None,
                reason: format!("renumbering failed: {}", e),
            }),
        }
    }

    Ok(report)
}
