//! Draft buckets: grouping evidence by `(date, resort)` and classifying
//! each bucket against the owner's existing calendar.
//!
//! All functions run inside the caller's write transaction. The unique
//! `(session, date, resort)` constraint on drafts backs the one-bucket-per-key
//! rule at rest.

use chrono::NaiveDate;
use tracing::debug;

use crate::db::{Decision, DraftEntry, EvidenceItem, EvidenceKind, ImportSession, SqliteStore};
use crate::error::{ImportError, Result};

/// Result of an explicit key edit on a draft.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyUpdate {
    /// The draft moved to the new key in place.
    Updated(DraftEntry),
    /// Another draft already held the key; evidence moved there and the
    /// edited draft was deleted.
    MergedInto { target: DraftEntry, removed_id: i64 },
}

impl KeyUpdate {
    pub fn draft(&self) -> &DraftEntry {
        match self {
            KeyUpdate::Updated(draft) => draft,
            KeyUpdate::MergedInto { target, .. } => target,
        }
    }
}

pub(crate) fn load_draft(store: &SqliteStore<'_>, draft_id: i64) -> Result<DraftEntry> {
    store
        .get_draft(draft_id)?
        .ok_or(ImportError::NotFound { entity: "draft", id: draft_id })
}

/// Initial decision for a key: merge into an existing day, else duplicate.
fn classify(
    store: &SqliteStore<'_>,
    owner_id: i64,
    date: NaiveDate,
    resort_id: i64,
) -> Result<(Decision, Option<i64>)> {
    Ok(match store.find_day(owner_id, date, resort_id)? {
        Some(day) => (Decision::Merge, Some(day.id)),
        None => (Decision::Duplicate, None),
    })
}

fn append_note(existing: Option<&str>, addition: &str) -> String {
    match existing {
        Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, addition),
        _ => addition.to_string(),
    }
}

/// Rewrite a draft's notes from the text lines still filed under it.
fn rebuild_notes(store: &SqliteStore<'_>, draft_id: i64) -> Result<()> {
    let lines: Vec<String> = store
        .evidence_for_draft(draft_id)?
        .into_iter()
        .filter(|evidence| evidence.kind == EvidenceKind::Line)
        .map(|evidence| evidence.raw.trim().to_string())
        .collect();
    let notes = (!lines.is_empty()).then(|| lines.join("\n"));
    store.set_draft_notes(draft_id, notes.as_deref())
}

/// Detach evidence from its draft, deleting the draft if it is left empty.
fn detach(store: &SqliteStore<'_>, evidence: &EvidenceItem, draft_id: i64) -> Result<()> {
    store.set_evidence_draft(evidence.id, None)?;
    if store.count_evidence_for_draft(draft_id)? == 0 {
        store.delete_draft(draft_id)?;
        debug!(draft_id, "Empty draft removed");
    } else if evidence.kind == EvidenceKind::Line {
        rebuild_notes(store, draft_id)?;
    }
    Ok(())
}

/// File a piece of evidence under the draft for its `(date, resort)` key.
///
/// Evidence without both halves of a key stays unattached and `None` is
/// returned. Evidence already filed under a different key is moved.
pub fn attach_evidence(
    store: &SqliteStore<'_>,
    session: &ImportSession,
    evidence: &EvidenceItem,
) -> Result<Option<DraftEntry>> {
    if evidence.session_id != session.id {
        return Err(ImportError::ForeignEvidence(evidence.id));
    }
    let Some((date, resort_id)) = evidence.key() else {
        if let Some(old) = evidence.draft_id {
            detach(store, evidence, old)?;
        }
        return Ok(None);
    };

    if let Some(old_id) = evidence.draft_id {
        match store.get_draft(old_id)? {
            Some(old) if old.key() == (date, resort_id) => return Ok(Some(old)),
            Some(_) => detach(store, evidence, old_id)?,
            None => store.set_evidence_draft(evidence.id, None)?,
        }
    }

    let draft_id = match store.find_draft(session.id, date, resort_id)? {
        Some(existing) => {
            if existing.decision == Decision::Duplicate && existing.linked_day_id.is_none() {
                let (decision, linked) = classify(store, session.owner_id, date, resort_id)?;
                if decision != existing.decision {
                    store.set_draft_decision(existing.id, decision, linked)?;
                }
            }
            existing.id
        }
        None => {
            let (decision, linked) = classify(store, session.owner_id, date, resort_id)?;
            let id = store.insert_draft(session.id, date, resort_id, decision, linked)?;
            debug!(draft_id = id, %date, resort_id, %decision, "Draft created");
            id
        }
    };

    store.set_evidence_draft(evidence.id, Some(draft_id))?;
    if evidence.kind == EvidenceKind::Line {
        let draft = load_draft(store, draft_id)?;
        let notes = append_note(draft.notes.as_deref(), evidence.raw.trim());
        store.set_draft_notes(draft_id, Some(&notes))?;
    }

    load_draft(store, draft_id).map(Some)
}

/// Move a draft to a new key, merging into the draft already at that key if
/// there is one.
pub fn update_key(
    store: &SqliteStore<'_>,
    session: &ImportSession,
    draft_id: i64,
    date: NaiveDate,
    resort_id: i64,
) -> Result<KeyUpdate> {
    let draft = load_draft(store, draft_id)?;
    if draft.key() == (date, resort_id) {
        return Ok(KeyUpdate::Updated(draft));
    }

    for evidence in store.evidence_for_draft(draft.id)? {
        store.update_evidence_key(evidence.id, date, resort_id)?;
    }

    match store.find_draft(session.id, date, resort_id)? {
        Some(target) => {
            let moved = store.move_draft_evidence(draft.id, target.id)?;
            if let Some(notes) = draft.notes.as_deref().filter(|n| !n.is_empty()) {
                let merged = append_note(target.notes.as_deref(), notes);
                store.set_draft_notes(target.id, Some(&merged))?;
            }
            store.delete_draft(draft.id)?;
            debug!(from = draft.id, into = target.id, moved, "Draft merged into existing bucket");
            Ok(KeyUpdate::MergedInto {
                target: load_draft(store, target.id)?,
                removed_id: draft.id,
            })
        }
        None => {
            store.update_draft_key(draft.id, date, resort_id)?;
            let (decision, linked) = classify(store, session.owner_id, date, resort_id)?;
            store.set_draft_decision(draft.id, decision, linked)?;
            Ok(KeyUpdate::Updated(load_draft(store, draft.id)?))
        }
    }
}

/// Set a draft's decision. `Merge` needs an existing day at the draft's key;
/// every other decision clears the link.
pub fn update_decision(
    store: &SqliteStore<'_>,
    session: &ImportSession,
    draft_id: i64,
    decision: Decision,
) -> Result<DraftEntry> {
    let draft = load_draft(store, draft_id)?;
    let linked = match decision {
        Decision::Merge => {
            let still_there = match draft.linked_day_id {
                Some(day_id) => store.get_day(day_id)?.map(|day| day.id),
                None => None,
            };
            let linked = match still_there {
                Some(id) => Some(id),
                None => store
                    .find_day(session.owner_id, draft.date, draft.resort_id)?
                    .map(|day| day.id),
            };
            Some(linked.ok_or(ImportError::NoLinkedDay { decision })?)
        }
        Decision::Pending | Decision::Duplicate | Decision::Skip => None,
    };
    store.set_draft_decision(draft.id, decision, linked)?;
    load_draft(store, draft.id)
}

/// Correct an evidence item's key and re-file it.
pub fn update_evidence(
    store: &SqliteStore<'_>,
    session: &ImportSession,
    evidence_id: i64,
    date: NaiveDate,
    resort_id: i64,
) -> Result<Option<DraftEntry>> {
    let evidence = store
        .get_evidence(evidence_id)?
        .ok_or(ImportError::NotFound { entity: "evidence", id: evidence_id })?;
    if evidence.session_id != session.id {
        return Err(ImportError::ForeignEvidence(evidence_id));
    }
    store.update_evidence_key(evidence_id, date, resort_id)?;
    let evidence = store
        .get_evidence(evidence_id)?
        .ok_or(ImportError::NotFound { entity: "evidence", id: evidence_id })?;
    attach_evidence(store, session, &evidence)
}
