//! Nearest-resort lookup for geotagged photos.

use crate::db::Resort;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A resort together with its distance from the query point.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestResort<'r> {
    pub resort: &'r Resort,
    pub distance_km: f64,
}

/// Great-circle distance between two points in decimal degrees.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// The resort closest to `point`.
///
/// No distance cutoff is applied: any resort with coordinates is a
/// candidate, however far away. Resorts without coordinates are ignored;
/// the first in gazetteer order wins an exact tie.
pub fn nearest_resort(point: (f64, f64), resorts: &[Resort]) -> Option<NearestResort<'_>> {
    resorts
        .iter()
        .filter_map(|resort| {
            let coords = resort.coordinates()?;
            Some(NearestResort {
                resort,
                distance_km: haversine_km(point, coords),
            })
        })
        .fold(None, |best: Option<NearestResort<'_>>, candidate| match best {
            Some(best) if best.distance_km <= candidate.distance_km => Some(best),
            _ => Some(candidate),
        })
}
