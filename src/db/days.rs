//! Types for calendar days and owners.

use chrono::{NaiveDate, NaiveDateTime};

/// A recorded ski day.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDay {
    pub id: i64,
    pub owner_id: i64,
    pub date: NaiveDate,
    pub resort_id: i64,
    /// Dense 1-based ordinal within the owner's season; `None` until computed.
    pub day_number: Option<i64>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewDay {
    pub owner_id: i64,
    pub date: NaiveDate,
    pub resort_id: i64,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub id: i64,
    pub name: String,
    pub season_start_month: u32,
    pub season_start_day: u32,
}
