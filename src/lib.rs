//! Import reconciliation for a ski-day journal.
//!
//! Turns free-text log lines and geotagged photos into calendar days,
//! grouping evidence into draft buckets, avoiding duplicate days, and
//! keeping season-relative day numbers dense.

pub mod clock;
pub mod config;
pub mod days;
pub mod db;
pub mod error;
pub mod gazetteer;
pub mod import;
pub mod logging;
pub mod renumber;
pub mod scanner;
pub mod season;
pub mod tasks;

#[cfg(test)]
mod testutil;

pub use error::{ImportError, Outcome, Result};
pub use import::Importer;
