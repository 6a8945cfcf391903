//! Shared fixtures for unit tests.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::Cell;
use std::sync::Arc;

use crate::db::{Database, NewDay, NewResort};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// In-memory database with one owner (season start Sept 1) and a small
/// gazetteer.
pub struct Fixture {
    pub db: Arc<Database>,
    pub owner: i64,
    pub aspen: i64,
    pub zermatt: i64,
    pub whistler: i64,
    tick: Cell<i64>,
}

impl Fixture {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let resort = |name: &str, country: &str, lat: f64, lon: f64| NewResort {
            name: name.to_string(),
            country: country.to_string(),
            latitude: Some(lat),
            longitude: Some(lon),
            verified: true,
            suggested_by: None,
        };

        let (owner, aspen, zermatt, whistler) = db
            .write(|store| {
                let owner = store.create_owner("alice", (9, 1))?;
                let aspen = store.insert_resort(&resort("Aspen Mountain", "US", 39.1869, -106.8182))?;
                let zermatt = store.insert_resort(&resort("Zermatt", "CH", 46.0207, 7.7491))?;
                let whistler =
                    store.insert_resort(&resort("Whistler Blackcomb", "CA", 50.1163, -122.9574))?;
                Ok((owner, aspen, zermatt, whistler))
            })
            .unwrap();

        Self {
            db: Arc::new(db),
            owner,
            aspen,
            zermatt,
            whistler,
            tick: Cell::new(0),
        }
    }

    /// Strictly increasing timestamps for creation-order tie breaks.
    pub fn tick(&self) -> NaiveDateTime {
        let n = self.tick.get() + 1;
        self.tick.set(n);
        date(2020, 1, 1).and_hms_opt(0, 0, 0).unwrap() + Duration::seconds(n)
    }
}

pub fn seed_day(fx: &Fixture, d: NaiveDate, resort_id: i64) -> i64 {
    let day = NewDay {
        owner_id: fx.owner,
        date: d,
        resort_id,
        notes: None,
        created_at: fx.tick(),
    };
    fx.db.write(|store| store.insert_day(&day)).unwrap()
}
