//! Season-relative day numbering.
//!
//! Every renumber recomputes whole seasons: inserts, deletes and moves can
//! shift every later ordinal, so there is no incremental patching.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::debug;

use crate::db::{Database, SqliteStore};
use crate::error::{ImportError, Result};
use crate::season::{SeasonCalendar, SeasonRange};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenumberSummary {
    pub seasons: usize,
    pub days: usize,
    pub updated: usize,
}

impl RenumberSummary {
    fn add(&mut self, other: RenumberSummary) {
        self.seasons += other.seasons;
        self.days += other.days;
        self.updated += other.updated;
    }
}

pub fn owner_calendar(store: &SqliteStore<'_>, owner_id: i64) -> Result<SeasonCalendar> {
    let owner = store.get_owner(owner_id)?.ok_or(ImportError::NotFound {
        entity: "owner",
        id: owner_id,
    })?;
    SeasonCalendar::new(owner.season_start_month, owner.season_start_day)
}

/// Distinct seasons touched by `dates`, in chronological order.
pub fn seasons_for(calendar: &SeasonCalendar, dates: &[NaiveDate]) -> Result<Vec<SeasonRange>> {
    let mut seen = BTreeSet::new();
    for date in dates {
        let range = calendar.season_of(*date)?;
        seen.insert((range.start, range.end));
    }
    Ok(seen
        .into_iter()
        .map(|(start, end)| SeasonRange { start, end })
        .collect())
}

/// Assign `1..=N` to the owner's days in `season`, ordered by date then
/// creation time.
pub fn renumber_season(store: &SqliteStore<'_>, owner_id: i64, season: SeasonRange) -> Result<RenumberSummary> {
    let days = store.days_in_range(owner_id, season.start, season.end)?;
    let mut updated = 0;
    for (index, day) in days.iter().enumerate() {
        let number = index as i64 + 1;
        if day.day_number != Some(number) {
            store.set_day_number(day.id, Some(number))?;
            updated += 1;
        }
    }
    debug!(owner_id, start = %season.start, days = days.len(), updated, "Season renumbered");
    Ok(RenumberSummary {
        seasons: 1,
        days: days.len(),
        updated,
    })
}

/// Renumber every season touched by `dates` inside the caller's transaction.
pub fn renumber_in(store: &SqliteStore<'_>, owner_id: i64, dates: &[NaiveDate]) -> Result<RenumberSummary> {
    let calendar = owner_calendar(store, owner_id)?;
    let mut summary = RenumberSummary::default();
    for season in seasons_for(&calendar, dates)? {
        summary.add(renumber_season(store, owner_id, season)?);
    }
    Ok(summary)
}

/// Renumber every season touched by `dates`, one write transaction per
/// season so concurrent passes never interleave within a season.
pub fn renumber(db: &Database, owner_id: i64, dates: &[NaiveDate]) -> Result<RenumberSummary> {
    let calendar = db.read(|store| owner_calendar(store, owner_id))?;
    let mut summary = RenumberSummary::default();
    for season in seasons_for(&calendar, dates)? {
        summary.add(db.write(|store| renumber_season(store, owner_id, season))?);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{date, seed_day, Fixture};
    use std::collections::HashMap;

    fn numbers_by_season(fx: &Fixture) -> HashMap<NaiveDate, Vec<i64>> {
        let calendar = fx.db.read(|store| owner_calendar(store, fx.owner)).unwrap();
        let days = fx.db.read(|store| store.days_for_owner(fx.owner)).unwrap();
        let mut seasons: HashMap<NaiveDate, Vec<i64>> = HashMap::new();
        for day in days {
            let start = calendar.season_of(day.date).unwrap().start;
            seasons.entry(start).or_default().push(day.day_number.unwrap_or(0));
        }
        seasons
    }

    #[test]
    fn test_renumber_is_dense_per_season() {
        let fx = Fixture::new();
        let dates = [
            date(2023, 12, 20),
            date(2024, 1, 15),
            date(2023, 12, 1),
            date(2024, 9, 5),
            date(2024, 10, 1),
        ];
        for d in dates {
            seed_day(&fx, d, fx.aspen);
        }

        let summary = renumber(&fx.db, fx.owner, &dates).unwrap();
        assert_eq!(summary.seasons, 2);
        assert_eq!(summary.days, 5);

        for (_, mut numbers) in numbers_by_season(&fx) {
            numbers.sort();
            let expected: Vec<i64> = (1..=numbers.len() as i64).collect();
            assert_eq!(numbers, expected);
        }
    }

    #[test]
    fn test_renumber_orders_by_date_then_creation() {
        let fx = Fixture::new();
        let late = seed_day(&fx, date(2024, 1, 15), fx.aspen);
        let early = seed_day(&fx, date(2024, 1, 10), fx.aspen);
        let same_day = seed_day(&fx, date(2024, 1, 15), fx.zermatt);

        renumber(&fx.db, fx.owner, &[date(2024, 1, 15)]).unwrap();

        let number = |id| fx.db.read(|store| store.get_day(id)).unwrap().unwrap().day_number;
        assert_eq!(number(early), Some(1));
        assert_eq!(number(late), Some(2));
        assert_eq!(number(same_day), Some(3));
    }

    #[test]
    fn test_renumber_is_idempotent() {
        let fx = Fixture::new();
        seed_day(&fx, date(2024, 1, 10), fx.aspen);
        seed_day(&fx, date(2024, 2, 10), fx.aspen);

        let first = renumber(&fx.db, fx.owner, &[date(2024, 1, 10)]).unwrap();
        assert_eq!(first.updated, 2);
        let second = renumber(&fx.db, fx.owner, &[date(2024, 1, 10)]).unwrap();
        assert_eq!(second.updated, 0);
    }

    #[test]
    fn test_renumber_leaves_other_seasons_alone() {
        let fx = Fixture::new();
        let old = seed_day(&fx, date(2022, 12, 1), fx.aspen);
        seed_day(&fx, date(2024, 1, 10), fx.aspen);

        renumber(&fx.db, fx.owner, &[date(2024, 1, 10)]).unwrap();
        let old_day = fx.db.read(|store| store.get_day(old)).unwrap().unwrap();
        assert_eq!(old_day.day_number, None);
    }
}
