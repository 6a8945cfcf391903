//! Calendar day maintenance that keeps day numbers consistent.

use chrono::NaiveDate;
use tracing::info;

use crate::db::{CalendarDay, NewDay, SqliteStore};
use crate::error::{ImportError, Result};
use crate::renumber::renumber_in;

/// Days one owner may record on a single date.
pub const DEFAULT_MAX_DAYS_PER_DATE: usize = 3;

/// Insert a day after checking the per-date limit. Does not renumber.
pub fn insert_checked(store: &SqliteStore<'_>, day: &NewDay, max_per_date: usize) -> Result<i64> {
    let existing = store.count_days_on(day.owner_id, day.date)?;
    if existing >= max_per_date {
        return Err(ImportError::DayLimit {
            date: day.date,
            limit: max_per_date,
        });
    }
    store.insert_day(day)
}

pub(crate) fn load_day(store: &SqliteStore<'_>, day_id: i64) -> Result<CalendarDay> {
    store
        .get_day(day_id)?
        .ok_or(ImportError::NotFound { entity: "day", id: day_id })
}

/// Record a new day and renumber its season.
pub fn create_day(store: &SqliteStore<'_>, day: &NewDay, max_per_date: usize) -> Result<CalendarDay> {
    let id = insert_checked(store, day, max_per_date)?;
    renumber_in(store, day.owner_id, &[day.date])?;
    info!(day_id = id, owner_id = day.owner_id, date = %day.date, "Day created");
    load_day(store, id)
}

/// Change a day's date and resort, renumbering both the old and new season.
pub fn move_day(
    store: &SqliteStore<'_>,
    day_id: i64,
    date: NaiveDate,
    resort_id: i64,
    max_per_date: usize,
) -> Result<CalendarDay> {
    let day = load_day(store, day_id)?;
    if day.date != date && store.count_days_on(day.owner_id, date)? >= max_per_date {
        return Err(ImportError::DayLimit {
            date,
            limit: max_per_date,
        });
    }
    store.update_day_key(day_id, date, resort_id)?;
    renumber_in(store, day.owner_id, &[day.date, date])?;
    load_day(store, day_id)
}

/// Delete a day and close the gap it leaves in its season.
pub fn delete_day(store: &SqliteStore<'_>, day_id: i64) -> Result<()> {
    let day = load_day(store, day_id)?;
    store.delete_day(day_id)?;
    renumber_in(store, day.owner_id, &[day.date])?;
    info!(day_id, owner_id = day.owner_id, "Day deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{date, Fixture};

    fn new_day(fx: &Fixture, d: NaiveDate, resort: i64) -> NewDay {
        NewDay {
            owner_id: fx.owner,
            date: d,
            resort_id: resort,
            notes: None,
            created_at: fx.tick(),
        }
    }

    fn create(fx: &Fixture, d: NaiveDate, resort: i64) -> CalendarDay {
        let day = new_day(fx, d, resort);
        fx.db.write(|store| create_day(store, &day, 3)).unwrap()
    }

    #[test]
    fn test_create_day_numbers_it() {
        let fx = Fixture::new();
        let first = create(&fx, date(2024, 1, 20), fx.aspen);
        let second = create(&fx, date(2024, 1, 5), fx.aspen);

        assert_eq!(second.day_number, Some(1));
        let first = fx.db.read(|store| store.get_day(first.id)).unwrap().unwrap();
        assert_eq!(first.day_number, Some(2));
    }

    #[test]
    fn test_per_date_limit() {
        let fx = Fixture::new();
        let d = date(2024, 1, 20);
        for _ in 0..3 {
            create(&fx, d, fx.aspen);
        }
        let day = new_day(&fx, d, fx.zermatt);
        let err = fx.db.write(|store| create_day(store, &day, 3)).unwrap_err();
        assert!(matches!(err, ImportError::DayLimit { limit: 3, .. }));
    }

    #[test]
    fn test_move_day_renumbers_both_seasons() {
        let fx = Fixture::new();
        let a = create(&fx, date(2024, 1, 5), fx.aspen);
        let b = create(&fx, date(2024, 1, 6), fx.aspen);
        let c = create(&fx, date(2022, 12, 1), fx.aspen);
        assert_eq!(c.day_number, Some(1));

        let moved = fx
            .db
            .write(|store| move_day(store, a.id, date(2022, 12, 2), fx.zermatt, 3))
            .unwrap();
        assert_eq!(moved.day_number, Some(2));
        assert_eq!(moved.resort_id, fx.zermatt);
        let b = fx.db.read(|store| store.get_day(b.id)).unwrap().unwrap();
        assert_eq!(b.day_number, Some(1));
    }

    #[test]
    fn test_delete_day_closes_gap() {
        let fx = Fixture::new();
        let a = create(&fx, date(2024, 1, 5), fx.aspen);
        let b = create(&fx, date(2024, 1, 6), fx.aspen);
        assert_eq!(b.day_number, Some(2));

        fx.db.write(|store| delete_day(store, a.id)).unwrap();
        let b = fx.db.read(|store| store.get_day(b.id)).unwrap().unwrap();
        assert_eq!(b.day_number, Some(1));
        let again = fx.db.write(|store| delete_day(store, a.id));
        assert!(matches!(again, Err(ImportError::NotFound { .. })));
    }
}
