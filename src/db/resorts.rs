//! Types for the resort gazetteer.

#[derive(Debug, Clone, PartialEq)]
pub struct Resort {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub verified: bool,
    /// Owner who suggested an unverified resort.
    pub suggested_by: Option<i64>,
}

impl Resort {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Fields for inserting a resort.
#[derive(Debug, Clone)]
pub struct NewResort {
    pub name: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub verified: bool,
    pub suggested_by: Option<i64>,
}
