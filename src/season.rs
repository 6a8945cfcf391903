//! Season calendar arithmetic.
//!
//! A season is the window starting on an owner's configured month/day and
//! ending the day before the next occurrence. Offset 0 is the season that
//! contains "today"; callers pass today explicitly.

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{ImportError, Result};

/// Inclusive date range of one season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeasonRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonCalendar {
    month: u32,
    day: u32,
}

impl SeasonCalendar {
    /// Build a calendar whose seasons start on `month`/`day`.
    ///
    /// February 29 is accepted; in common years the season starts on
    /// February 28 instead.
    pub fn new(month: u32, day: u32) -> Result<Self> {
        // 2000 is a leap year, so Feb 29 validates
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(ImportError::InvalidSeasonStart { month, day });
        }
        Ok(Self { month, day })
    }

    /// Parse an `"MM-DD"` season start.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || ImportError::Invalid(format!("season start must be MM-DD, got {:?}", s));
        let (month, day) = s.trim().split_once('-').ok_or_else(invalid)?;
        let month = month.parse().map_err(|_| invalid())?;
        let day = day.parse().map_err(|_| invalid())?;
        Self::new(month, day)
    }

    pub fn start(&self) -> (u32, u32) {
        (self.month, self.day)
    }

    /// The season `offset` years away from the one containing `today`.
    pub fn date_range(&self, offset: i32, today: NaiveDate) -> Result<SeasonRange> {
        let year = self
            .start_year(today)
            .and_then(|y| y.checked_add(offset))
            .ok_or(ImportError::SeasonOutOfRange(offset))?;
        let start = self.occurrence(year).ok_or(ImportError::SeasonOutOfRange(offset))?;
        let next = year
            .checked_add(1)
            .and_then(|y| self.occurrence(y))
            .ok_or(ImportError::SeasonOutOfRange(offset))?;
        Ok(SeasonRange {
            start,
            end: next - Duration::days(1),
        })
    }

    /// The offset `k` such that `date` falls in `date_range(k, today)`.
    pub fn season_offset(&self, date: NaiveDate, today: NaiveDate) -> Result<i32> {
        match (self.start_year(date), self.start_year(today)) {
            (Some(season), Some(current)) => Ok(season - current),
            _ => Err(ImportError::Invalid(format!("no season contains {}", date))),
        }
    }

    /// The season containing `date`.
    pub fn season_of(&self, date: NaiveDate) -> Result<SeasonRange> {
        self.date_range(0, date)
    }

    /// Year whose season-start occurrence is the lower bound for `date`.
    fn start_year(&self, date: NaiveDate) -> Option<i32> {
        let this_year = self.occurrence(date.year())?;
        if date >= this_year {
            Some(date.year())
        } else {
            date.year().checked_sub(1)
        }
    }

    fn occurrence(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
            .or_else(|| NaiveDate::from_ymd_opt(year, self.month, self.day - 1))
    }
}

impl Default for SeasonCalendar {
    fn default() -> Self {
        Self { month: 9, day: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_current_season() {
        let cal = SeasonCalendar::new(9, 1).unwrap();
        let range = cal.date_range(0, date(2024, 1, 15)).unwrap();
        assert_eq!(range.start, date(2023, 9, 1));
        assert_eq!(range.end, date(2024, 8, 31));
        assert_eq!(range.len_days(), 366);
    }

    #[test]
    fn test_today_on_boundary() {
        let cal = SeasonCalendar::new(9, 1).unwrap();
        assert_eq!(cal.date_range(0, date(2024, 9, 1)).unwrap().start, date(2024, 9, 1));
        assert_eq!(cal.date_range(0, date(2024, 8, 31)).unwrap().start, date(2023, 9, 1));
    }

    #[test]
    fn test_offsets_shift_by_years() {
        let cal = SeasonCalendar::new(11, 15).unwrap();
        let today = date(2024, 12, 1);
        assert_eq!(cal.date_range(-1, today).unwrap().start, date(2023, 11, 15));
        assert_eq!(cal.date_range(2, today).unwrap().end, date(2027, 11, 14));
    }

    #[test]
    fn test_season_offset_boundaries() {
        let cal = SeasonCalendar::new(9, 1).unwrap();
        let today = date(2024, 1, 15);
        assert_eq!(cal.season_offset(date(2023, 9, 1), today).unwrap(), 0);
        assert_eq!(cal.season_offset(date(2023, 8, 31), today).unwrap(), -1);
        assert_eq!(cal.season_offset(date(2024, 8, 31), today).unwrap(), 0);
        assert_eq!(cal.season_offset(date(2024, 9, 1), today).unwrap(), 1);
    }

    #[test]
    fn test_round_trip_all_starts_and_offsets() {
        let today = date(2024, 3, 10);
        let starts = [(1, 1), (2, 28), (2, 29), (3, 1), (7, 1), (9, 1), (12, 31)];
        for (month, day) in starts {
            let cal = SeasonCalendar::new(month, day).unwrap();
            for k in -100..=100 {
                let range = cal.date_range(k, today).unwrap();
                assert_eq!(cal.season_offset(range.start, today).unwrap(), k, "{month}-{day} start {k}");
                assert_eq!(cal.season_offset(range.end, today).unwrap(), k, "{month}-{day} end {k}");
                assert!(range.len_days() == 365 || range.len_days() == 366);
            }
        }
    }

    #[test]
    fn test_leap_day_start() {
        let cal = SeasonCalendar::new(2, 29).unwrap();
        let range = cal.date_range(0, date(2023, 6, 1)).unwrap();
        assert_eq!(range.start, date(2023, 2, 28));
        assert_eq!(range.end, date(2024, 2, 28));
    }

    #[test]
    fn test_invalid_start() {
        assert!(SeasonCalendar::new(2, 30).is_err());
        assert!(SeasonCalendar::new(13, 1).is_err());
        assert!(SeasonCalendar::new(0, 1).is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(SeasonCalendar::parse("07-01").unwrap().start(), (7, 1));
        assert!(SeasonCalendar::parse("7/1").is_err());
        assert!(SeasonCalendar::parse("xx-01").is_err());
    }
}
