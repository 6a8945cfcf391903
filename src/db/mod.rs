mod schema;
pub mod days;
pub mod drafts;
pub mod evidence;
pub mod resorts;
pub mod sessions;
pub mod sqlite;

use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::Result;

pub use schema::SCHEMA;
pub use days::{CalendarDay, NewDay, Owner};
pub use drafts::{Decision, DraftEntry};
pub use evidence::{EvidenceItem, EvidenceKind, ExifState, NewEvidence};
pub use resorts::{NewResort, Resort};
pub use sessions::{ImportSession, ImportSource, SessionStatus};
pub use sqlite::SqliteStore;

/// How long a writer waits on a lock held by another connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle onto the journal database.
///
/// The connection sits behind a mutex so the handle can be shared by the
/// photo workers. Every mutation runs inside a `BEGIN IMMEDIATE` transaction.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn initialize(&self) -> Result<()> {
        self.lock().execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Run `f` inside an immediate transaction, committing on success.
    ///
    /// An error from `f` rolls the whole transaction back.
    pub fn write<T>(&self, f: impl FnOnce(&SqliteStore<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&SqliteStore::new(&tx))?;
        tx.commit()?;
        Ok(value)
    }

    /// Run read-only queries against the connection.
    pub fn read<T>(&self, f: impl FnOnce(&SqliteStore<'_>) -> Result<T>) -> Result<T> {
        let conn = self.lock();
        f(&SqliteStore::new(&conn))
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panicking writer rolled its transaction back, the connection is still usable
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
