//! The resort gazetteer: name normalization, fuzzy matching, nearest lookup
//! and seeding.

pub mod matcher;
pub mod nearest;
pub mod normalize;

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::db::{NewResort, SqliteStore};
use crate::error::{ImportError, Result};

pub use matcher::{ResortMatch, ResortMatcher, DEFAULT_MATCH_THRESHOLD};
pub use nearest::{haversine_km, nearest_resort, NearestResort};
pub use normalize::{normalize, split_candidates};

/// One `[[resort]]` table of a gazetteer seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedResort {
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct SeedFile {
    #[serde(default)]
    resort: Vec<SeedResort>,
}

pub fn parse_seed(content: &str) -> Result<Vec<SeedResort>> {
    let seed: SeedFile =
        toml::from_str(content).map_err(|e| ImportError::Invalid(format!("gazetteer seed: {}", e)))?;
    Ok(seed.resort)
}

pub fn load_seed(path: &Path) -> Result<Vec<SeedResort>> {
    let content = std::fs::read_to_string(path)?;
    parse_seed(&content)
}

/// Insert seed resorts as verified, skipping `(name, country)` pairs already
/// present. Returns the number inserted.
pub fn seed_resorts(store: &SqliteStore<'_>, resorts: &[SeedResort]) -> Result<usize> {
    let mut inserted = 0;
    for seed in resorts {
        if store.find_verified_resort(&seed.name, &seed.country)?.is_some() {
            continue;
        }
        store.insert_resort(&NewResort {
            name: seed.name.clone(),
            country: seed.country.clone(),
            latitude: seed.latitude,
            longitude: seed.longitude,
            verified: true,
            suggested_by: None,
        })?;
        inserted += 1;
    }
    info!(inserted, skipped = resorts.len() - inserted, "Gazetteer seeded");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    const SEED: &str = r#"
        [[resort]]
        name = "Aspen Mountain"
        country = "US"
        latitude = 39.1869
        longitude = -106.8182

        [[resort]]
        name = "Zermatt"
        country = "CH"
    "#;

    #[test]
    fn test_parse_seed() {
        let resorts = parse_seed(SEED).unwrap();
        assert_eq!(resorts.len(), 2);
        assert_eq!(resorts[0].latitude, Some(39.1869));
        assert!(resorts[1].longitude.is_none());
    }

    #[test]
    fn test_parse_seed_rejects_garbage() {
        assert!(parse_seed("[[resort]]\nname = 3").is_err());
    }

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let resorts = parse_seed(SEED).unwrap();

        assert_eq!(db.write(|store| seed_resorts(store, &resorts)).unwrap(), 2);
        assert_eq!(db.write(|store| seed_resorts(store, &resorts)).unwrap(), 0);
    }
}
