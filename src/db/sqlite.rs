//! SQLite queries for the journal and import tables.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    CalendarDay, Decision, DraftEntry, EvidenceItem, EvidenceKind, ExifState, ImportSession,
    ImportSource, NewDay, NewEvidence, NewResort, Owner, Resort, SessionStatus,
};
use crate::error::Result;

const RESORT_COLUMNS: &str = "id, name, country, latitude, longitude, verified, suggested_by";
const DAY_COLUMNS: &str = "id, owner_id, date, resort_id, day_number, notes, created_at";
const SESSION_COLUMNS: &str = "id, owner_id, source, status, source_text, created_at";
const DRAFT_COLUMNS: &str = "id, session_id, date, resort_id, decision, linked_day_id, notes";
const EVIDENCE_COLUMNS: &str = r#"
    id, session_id, kind, raw, line_no, content_hash, taken_at, date, resort_id,
    latitude, longitude, exif_state, draft_id, error
"#;

/// Query surface over a borrowed connection or transaction.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ========================================================================
    // Owner operations
    // ========================================================================

    pub fn create_owner(&self, name: &str, season_start: (u32, u32)) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO owners (name, season_start_month, season_start_day) VALUES (?, ?, ?)",
            params![name, season_start.0, season_start.1],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_owner(&self, owner_id: i64) -> Result<Option<Owner>> {
        let owner = self
            .conn
            .query_row(
                "SELECT id, name, season_start_month, season_start_day FROM owners WHERE id = ?",
                [owner_id],
                |row| {
                    Ok(Owner {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        season_start_month: row.get(2)?,
                        season_start_day: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(owner)
    }

    pub fn set_season_start(&self, owner_id: i64, month: u32, day: u32) -> Result<()> {
        self.conn.execute(
            "UPDATE owners SET season_start_month = ?, season_start_day = ? WHERE id = ?",
            params![month, day, owner_id],
        )?;
        Ok(())
    }

    // ========================================================================
    // Resort operations
    // ========================================================================

    pub fn insert_resort(&self, resort: &NewResort) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO resorts (name, country, latitude, longitude, verified, suggested_by)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                resort.name,
                resort.country,
                resort.latitude,
                resort.longitude,
                resort.verified,
                resort.suggested_by,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_resort(&self, resort_id: i64) -> Result<Option<Resort>> {
        let sql = format!("SELECT {RESORT_COLUMNS} FROM resorts WHERE id = ?");
        let resort = self.conn.query_row(&sql, [resort_id], row_to_resort).optional()?;
        Ok(resort)
    }

    pub fn find_verified_resort(&self, name: &str, country: &str) -> Result<Option<Resort>> {
        let sql = format!(
            "SELECT {RESORT_COLUMNS} FROM resorts WHERE verified = 1 AND name = ? AND country = ?"
        );
        let resort = self
            .conn
            .query_row(&sql, params![name, country], row_to_resort)
            .optional()?;
        Ok(resort)
    }

    /// Verified resorts plus the ones this owner suggested, in gazetteer order.
    pub fn visible_resorts(&self, owner_id: i64) -> Result<Vec<Resort>> {
        let sql = format!(
            "SELECT {RESORT_COLUMNS} FROM resorts WHERE verified = 1 OR suggested_by = ? ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let resorts = stmt
            .query_map([owner_id], row_to_resort)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(resorts)
    }

    // ========================================================================
    // Day operations
    // ========================================================================

    pub fn insert_day(&self, day: &NewDay) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO days (owner_id, date, resort_id, notes, created_at) VALUES (?, ?, ?, ?, ?)",
            params![day.owner_id, day.date, day.resort_id, day.notes, day.created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_day(&self, day_id: i64) -> Result<Option<CalendarDay>> {
        let sql = format!("SELECT {DAY_COLUMNS} FROM days WHERE id = ?");
        let day = self.conn.query_row(&sql, [day_id], row_to_day).optional()?;
        Ok(day)
    }

    /// Earliest day recorded by `owner_id` at `(date, resort_id)`.
    pub fn find_day(&self, owner_id: i64, date: NaiveDate, resort_id: i64) -> Result<Option<CalendarDay>> {
        let sql = format!(
            r#"
            SELECT {DAY_COLUMNS} FROM days
            WHERE owner_id = ? AND date = ? AND resort_id = ?
            ORDER BY created_at, id
            LIMIT 1
            "#
        );
        let day = self
            .conn
            .query_row(&sql, params![owner_id, date, resort_id], row_to_day)
            .optional()?;
        Ok(day)
    }

    pub fn count_days_on(&self, owner_id: i64, date: NaiveDate) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM days WHERE owner_id = ? AND date = ?",
            params![owner_id, date],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Days with `start <= date <= end`, ordered by date then creation time.
    pub fn days_in_range(&self, owner_id: i64, start: NaiveDate, end: NaiveDate) -> Result<Vec<CalendarDay>> {
        let sql = format!(
            r#"
            SELECT {DAY_COLUMNS} FROM days
            WHERE owner_id = ? AND date >= ? AND date <= ?
            ORDER BY date ASC, created_at ASC, id ASC
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let days = stmt
            .query_map(params![owner_id, start, end], row_to_day)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(days)
    }

    pub fn days_for_owner(&self, owner_id: i64) -> Result<Vec<CalendarDay>> {
        let sql = format!(
            "SELECT {DAY_COLUMNS} FROM days WHERE owner_id = ? ORDER BY date ASC, created_at ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let days = stmt
            .query_map([owner_id], row_to_day)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(days)
    }

    pub fn set_day_number(&self, day_id: i64, day_number: Option<i64>) -> Result<()> {
        self.conn.execute(
            "UPDATE days SET day_number = ? WHERE id = ?",
            params![day_number, day_id],
        )?;
        Ok(())
    }

    pub fn clear_day_numbers(&self, owner_id: i64) -> Result<usize> {
        let cleared = self.conn.execute(
            "UPDATE days SET day_number = NULL WHERE owner_id = ? AND day_number IS NOT NULL",
            [owner_id],
        )?;
        Ok(cleared)
    }

    pub fn update_day_key(&self, day_id: i64, date: NaiveDate, resort_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE days SET date = ?, resort_id = ? WHERE id = ?",
            params![date, resort_id, day_id],
        )?;
        Ok(())
    }

    pub fn delete_day(&self, day_id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM days WHERE id = ?", [day_id])?;
        Ok(())
    }

    pub fn add_day_photo(&self, day_id: i64, blob_ref: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO day_photos (day_id, blob_ref) VALUES (?, ?)",
            params![day_id, blob_ref],
        )?;
        Ok(())
    }

    pub fn day_photos(&self, day_id: i64) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT blob_ref FROM day_photos WHERE day_id = ? ORDER BY blob_ref")?;
        let refs = stmt
            .query_map([day_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(refs)
    }

    // ========================================================================
    // Session operations
    // ========================================================================

    pub fn insert_session(&self, owner_id: i64, source: ImportSource, source_text: Option<&str>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO import_sessions (owner_id, source, status, source_text) VALUES (?, ?, ?, ?)",
            params![owner_id, source.as_str(), SessionStatus::Waiting.as_str(), source_text],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_session(&self, session_id: i64) -> Result<Option<ImportSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM import_sessions WHERE id = ?");
        let session = self.conn.query_row(&sql, [session_id], row_to_session).optional()?;
        Ok(session)
    }

    pub fn set_session_status(&self, session_id: i64, status: SessionStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE import_sessions SET status = ? WHERE id = ?",
            params![status.as_str(), session_id],
        )?;
        Ok(())
    }

    pub fn set_session_source_text(&self, session_id: i64, source_text: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE import_sessions SET source_text = ? WHERE id = ?",
            params![source_text, session_id],
        )?;
        Ok(())
    }

    /// Move a session from `from` to `to`; false if it was not in `from`.
    pub fn transition_session(&self, session_id: i64, from: SessionStatus, to: SessionStatus) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE import_sessions SET status = ? WHERE id = ? AND status = ?",
            params![to.as_str(), session_id, from.as_str()],
        )?;
        Ok(changed == 1)
    }

    pub fn delete_session(&self, session_id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM import_sessions WHERE id = ?", [session_id])?;
        Ok(())
    }

    // ========================================================================
    // Draft operations
    // ========================================================================

    pub fn insert_draft(
        &self,
        session_id: i64,
        date: NaiveDate,
        resort_id: i64,
        decision: Decision,
        linked_day_id: Option<i64>,
    ) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO drafts (session_id, date, resort_id, decision, linked_day_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![session_id, date, resort_id, decision.as_str(), linked_day_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_draft(&self, draft_id: i64) -> Result<Option<DraftEntry>> {
        let sql = format!("SELECT {DRAFT_COLUMNS} FROM drafts WHERE id = ?");
        let draft = self.conn.query_row(&sql, [draft_id], row_to_draft).optional()?;
        Ok(draft)
    }

    pub fn find_draft(&self, session_id: i64, date: NaiveDate, resort_id: i64) -> Result<Option<DraftEntry>> {
        let sql = format!(
            "SELECT {DRAFT_COLUMNS} FROM drafts WHERE session_id = ? AND date = ? AND resort_id = ?"
        );
        let draft = self
            .conn
            .query_row(&sql, params![session_id, date, resort_id], row_to_draft)
            .optional()?;
        Ok(draft)
    }

    pub fn drafts_for_session(&self, session_id: i64) -> Result<Vec<DraftEntry>> {
        let sql = format!(
            "SELECT {DRAFT_COLUMNS} FROM drafts WHERE session_id = ? ORDER BY date ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let drafts = stmt
            .query_map([session_id], row_to_draft)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(drafts)
    }

    pub fn update_draft_key(&self, draft_id: i64, date: NaiveDate, resort_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE drafts SET date = ?, resort_id = ? WHERE id = ?",
            params![date, resort_id, draft_id],
        )?;
        Ok(())
    }

    pub fn set_draft_decision(&self, draft_id: i64, decision: Decision, linked_day_id: Option<i64>) -> Result<()> {
        self.conn.execute(
            "UPDATE drafts SET decision = ?, linked_day_id = ? WHERE id = ?",
            params![decision.as_str(), linked_day_id, draft_id],
        )?;
        Ok(())
    }

    pub fn set_draft_notes(&self, draft_id: i64, notes: Option<&str>) -> Result<()> {
        self.conn.execute(
            "UPDATE drafts SET notes = ? WHERE id = ?",
            params![notes, draft_id],
        )?;
        Ok(())
    }

    pub fn delete_draft(&self, draft_id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM drafts WHERE id = ?", [draft_id])?;
        Ok(())
    }

    // ========================================================================
    // Evidence operations
    // ========================================================================

    pub fn insert_evidence(&self, session_id: i64, kind: EvidenceKind, evidence: &NewEvidence) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO evidence (session_id, kind, raw, line_no, content_hash, date, resort_id, error)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                session_id,
                kind.as_str(),
                evidence.raw,
                evidence.line_no,
                evidence.content_hash,
                evidence.date,
                evidence.resort_id,
                evidence.error,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_evidence(&self, evidence_id: i64) -> Result<Option<EvidenceItem>> {
        let sql = format!("SELECT {EVIDENCE_COLUMNS} FROM evidence WHERE id = ?");
        let item = self.conn.query_row(&sql, [evidence_id], row_to_evidence).optional()?;
        Ok(item)
    }

    pub fn evidence_for_session(&self, session_id: i64) -> Result<Vec<EvidenceItem>> {
        self.query_evidence("WHERE session_id = ?", session_id)
    }

    pub fn evidence_for_draft(&self, draft_id: i64) -> Result<Vec<EvidenceItem>> {
        self.query_evidence("WHERE draft_id = ?", draft_id)
    }

    /// Evidence not attached to any draft ("needs review").
    pub fn unattached_evidence(&self, session_id: i64) -> Result<Vec<EvidenceItem>> {
        self.query_evidence("WHERE session_id = ? AND draft_id IS NULL", session_id)
    }

    /// Photos whose metadata has not been extracted yet.
    pub fn unprocessed_photos(&self, session_id: i64) -> Result<Vec<EvidenceItem>> {
        self.query_evidence(
            "WHERE session_id = ? AND kind = 'photo' AND exif_state IS NULL",
            session_id,
        )
    }

    fn query_evidence(&self, filter: &str, id: i64) -> Result<Vec<EvidenceItem>> {
        let sql = format!(
            "SELECT {EVIDENCE_COLUMNS} FROM evidence {filter} ORDER BY line_no ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map([id], row_to_evidence)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn find_evidence_by_hash(&self, session_id: i64, content_hash: &str) -> Result<Option<EvidenceItem>> {
        let sql = format!(
            "SELECT {EVIDENCE_COLUMNS} FROM evidence WHERE session_id = ? AND content_hash = ? LIMIT 1"
        );
        let item = self
            .conn
            .query_row(&sql, params![session_id, content_hash], row_to_evidence)
            .optional()?;
        Ok(item)
    }

    pub fn count_evidence_for_draft(&self, draft_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM evidence WHERE draft_id = ?",
            [draft_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_extraction(
        &self,
        evidence_id: i64,
        taken_at: Option<NaiveDateTime>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        exif_state: ExifState,
        date: Option<NaiveDate>,
        resort_id: Option<i64>,
        error: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE evidence SET
                taken_at = ?, latitude = ?, longitude = ?, exif_state = ?,
                date = ?, resort_id = ?, error = ?
            WHERE id = ?
            "#,
            params![
                taken_at,
                latitude,
                longitude,
                exif_state.as_str(),
                date,
                resort_id,
                error,
                evidence_id,
            ],
        )?;
        Ok(())
    }

    pub fn update_evidence_key(&self, evidence_id: i64, date: NaiveDate, resort_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE evidence SET date = ?, resort_id = ?, error = NULL WHERE id = ?",
            params![date, resort_id, evidence_id],
        )?;
        Ok(())
    }

    pub fn set_evidence_draft(&self, evidence_id: i64, draft_id: Option<i64>) -> Result<()> {
        self.conn.execute(
            "UPDATE evidence SET draft_id = ? WHERE id = ?",
            params![draft_id, evidence_id],
        )?;
        Ok(())
    }

    pub fn move_draft_evidence(&self, from_draft: i64, to_draft: i64) -> Result<usize> {
        let moved = self.conn.execute(
            "UPDATE evidence SET draft_id = ? WHERE draft_id = ?",
            params![to_draft, from_draft],
        )?;
        Ok(moved)
    }
}

fn row_to_resort(row: &rusqlite::Row) -> rusqlite::Result<Resort> {
    Ok(Resort {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        verified: row.get(5)?,
        suggested_by: row.get(6)?,
    })
}

fn row_to_day(row: &rusqlite::Row) -> rusqlite::Result<CalendarDay> {
    Ok(CalendarDay {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        date: row.get(2)?,
        resort_id: row.get(3)?,
        day_number: row.get(4)?,
        notes: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Read a text column into one of the closed enums, rejecting unknown values.
fn enum_column<T>(row: &rusqlite::Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let value: String = row.get(idx)?;
    parse(&value).ok_or_else(|| unknown_value(idx, &value))
}

fn unknown_value(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, format!("unknown value {:?}", value).into())
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<ImportSession> {
    Ok(ImportSession {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        source: enum_column(row, 2, ImportSource::from_str)?,
        status: enum_column(row, 3, SessionStatus::from_str)?,
        source_text: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_draft(row: &rusqlite::Row) -> rusqlite::Result<DraftEntry> {
    Ok(DraftEntry {
        id: row.get(0)?,
        session_id: row.get(1)?,
        date: row.get(2)?,
        resort_id: row.get(3)?,
        decision: enum_column(row, 4, Decision::from_str)?,
        linked_day_id: row.get(5)?,
        notes: row.get(6)?,
    })
}

fn row_to_evidence(row: &rusqlite::Row) -> rusqlite::Result<EvidenceItem> {
    let exif_state = match row.get::<_, Option<String>>(11)? {
        Some(value) => Some(ExifState::from_str(&value).ok_or_else(|| unknown_value(11, &value))?),
        None => None,
    };
    Ok(EvidenceItem {
        id: row.get(0)?,
        session_id: row.get(1)?,
        kind: enum_column(row, 2, EvidenceKind::from_str)?,
        raw: row.get(3)?,
        line_no: row.get(4)?,
        content_hash: row.get(5)?,
        taken_at: row.get(6)?,
        date: row.get(7)?,
        resort_id: row.get(8)?,
        latitude: row.get(9)?,
        longitude: row.get(10)?,
        exif_state,
        draft_id: row.get(12)?,
        error: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_visible_resorts_hide_other_suggestions() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        db.write(|store| {
            let alice = store.create_owner("alice", (9, 1))?;
            let bob = store.create_owner("bob", (9, 1))?;
            store.insert_resort(&NewResort {
                name: "Aspen Mountain".to_string(),
                country: "US".to_string(),
                latitude: Some(39.18),
                longitude: Some(-106.82),
                verified: true,
                suggested_by: None,
            })?;
            store.insert_resort(&NewResort {
                name: "Backyard Hill".to_string(),
                country: "US".to_string(),
                latitude: None,
                longitude: None,
                verified: false,
                suggested_by: Some(alice),
            })?;

            assert_eq!(store.visible_resorts(alice)?.len(), 2);
            let bobs = store.visible_resorts(bob)?;
            assert_eq!(bobs.len(), 1);
            assert_eq!(bobs[0].name, "Aspen Mountain");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_verified_resort_names_are_unique() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let resort = NewResort {
            name: "Zermatt".to_string(),
            country: "CH".to_string(),
            latitude: None,
            longitude: None,
            verified: true,
            suggested_by: None,
        };
        db.write(|store| store.insert_resort(&resort)).unwrap();
        assert!(db.write(|store| store.insert_resort(&resort)).is_err());
    }

    #[test]
    fn test_draft_key_is_unique_per_session() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let (session, resort) = db
            .write(|store| {
                let owner = store.create_owner("alice", (9, 1))?;
                let resort = store.insert_resort(&NewResort {
                    name: "Zermatt".to_string(),
                    country: "CH".to_string(),
                    latitude: None,
                    longitude: None,
                    verified: true,
                    suggested_by: None,
                })?;
                let session = store.insert_session(owner, ImportSource::Text, None)?;
                store.insert_draft(session, date, resort, Decision::Duplicate, None)?;
                Ok((session, resort))
            })
            .unwrap();

        let again = db.write(|store| store.insert_draft(session, date, resort, Decision::Duplicate, None));
        assert!(again.is_err());
    }

    #[test]
    fn test_unknown_decision_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let draft = db
            .write(|store| {
                let owner = store.create_owner("alice", (9, 1))?;
                let resort = store.insert_resort(&NewResort {
                    name: "Zermatt".to_string(),
                    country: "CH".to_string(),
                    latitude: None,
                    longitude: None,
                    verified: true,
                    suggested_by: None,
                })?;
                let session = store.insert_session(owner, ImportSource::Text, None)?;
                let draft = store.insert_draft(session, date, resort, Decision::Skip, None)?;
                store
                    .conn
                    .execute("UPDATE drafts SET decision = 'later' WHERE id = ?", [draft])?;
                Ok(draft)
            })
            .unwrap();

        let err = db.read(|store| store.get_draft(draft)).unwrap_err();
        assert!(err.to_string().contains("later"));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let result: Result<()> = db.write(|store| {
            store.create_owner("alice", (9, 1))?;
            Err(crate::error::ImportError::Invalid("abort".to_string()))
        });
        assert!(result.is_err());

        let owner = db.read(|store| store.get_owner(1)).unwrap();
        assert!(owner.is_none());
    }
}
