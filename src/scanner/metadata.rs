//! Capture time and GPS position from photo metadata.
//!
//! Tags are read through an [`ImageStore`] as strings; rational values are
//! rendered as `"n/d, n/d, n/d"`. Nothing in here fails loudly: unreadable
//! or malformed tags simply count as absent.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::debug;

use crate::db::ExifState;
use crate::error::{ImportError, Result};

/// Tag name to rendered value, e.g. `"GPSLatitudeRef" => "N"`.
pub type ExifTags = HashMap<String, String>;

const TIMESTAMP_TAGS: &[&str] = &["DateTimeOriginal", "DateTimeDigitized", "DateTime"];
const TIMESTAMP_FORMATS: &[&str] = &["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Source of photo bytes and metadata, addressed by blob reference.
pub trait ImageStore: Send + Sync {
    fn read_metadata(&self, blob_ref: &str) -> Result<ExifTags>;
    fn bytes(&self, blob_ref: &str) -> Result<Vec<u8>>;
}

/// Blob references are file paths, optionally relative to `root`.
#[derive(Debug, Clone, Default)]
pub struct FsImageStore {
    root: Option<PathBuf>,
}

impl FsImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, blob_ref: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(blob_ref),
            None => PathBuf::from(blob_ref),
        }
    }
}

impl ImageStore for FsImageStore {
    fn read_metadata(&self, blob_ref: &str) -> Result<ExifTags> {
        let file = File::open(self.resolve(blob_ref))?;
        let mut reader = BufReader::new(file);
        let exif = exif::Reader::new()
            .read_from_container(&mut reader)
            .map_err(|e| ImportError::Invalid(format!("{}: {}", blob_ref, e)))?;

        let tags = exif
            .fields()
            .filter(|field| field.ifd_num == exif::In::PRIMARY)
            .map(|field| (field.tag.to_string(), render_value(field)))
            .collect();
        Ok(tags)
    }

    fn bytes(&self, blob_ref: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.resolve(blob_ref))?)
    }
}

fn render_value(field: &exif::Field) -> String {
    match &field.value {
        exif::Value::Ascii(parts) => parts
            .iter()
            .map(|p| String::from_utf8_lossy(p).trim_end_matches('\0').to_string())
            .collect::<Vec<_>>()
            .join(" "),
        exif::Value::Rational(values) => values
            .iter()
            .map(|r| format!("{}/{}", r.num, r.denom))
            .collect::<Vec<_>>()
            .join(", "),
        exif::Value::SRational(values) => values
            .iter()
            .map(|r| format!("{}/{}", r.num, r.denom))
            .collect::<Vec<_>>()
            .join(", "),
        _ => field.display_value().to_string(),
    }
}

/// What a photo's metadata says about when and where it was taken.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhotoGeo {
    pub taken_at: Option<NaiveDateTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PhotoGeo {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// `Extracted` needs the timestamp and both coordinates; a timestamp
    /// alone cannot place the photo at a resort.
    pub fn state(&self) -> ExifState {
        if self.taken_at.is_some() && self.coordinates().is_some() {
            ExifState::Extracted
        } else {
            ExifState::Missing
        }
    }
}

/// Read a photo's capture time and position. Read failures yield an empty
/// result rather than an error.
pub fn extract_geo(store: &dyn ImageStore, blob_ref: &str) -> PhotoGeo {
    match store.read_metadata(blob_ref) {
        Ok(tags) => geo_from_tags(&tags),
        Err(e) => {
            debug!(blob_ref, error = %e, "No readable metadata");
            PhotoGeo::default()
        }
    }
}

pub fn geo_from_tags(tags: &ExifTags) -> PhotoGeo {
    let taken_at = TIMESTAMP_TAGS
        .iter()
        .filter_map(|tag| tags.get(*tag))
        .find_map(|value| parse_exif_timestamp(value));

    let coordinate = |value_tag: &str, ref_tag: &str| {
        let value = tags.get(value_tag)?;
        let hemisphere = tags.get(ref_tag)?;
        dms_to_decimal(value, hemisphere)
    };

    PhotoGeo {
        taken_at,
        latitude: coordinate("GPSLatitude", "GPSLatitudeRef"),
        longitude: coordinate("GPSLongitude", "GPSLongitudeRef"),
    }
}

pub fn parse_exif_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().trim_matches('"');
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Convert a degrees/minutes/seconds triple to signed decimal degrees.
///
/// Components may be rationals (`"835/100"`) or plain decimals, separated by
/// commas and/or spaces. Southern and western hemispheres are negative.
/// Returns `None` when fewer than three components parse.
pub fn dms_to_decimal(dms: &str, hemisphere: &str) -> Option<f64> {
    let components: Vec<f64> = dms
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(parse_component)
        .collect::<Option<Vec<_>>>()?;

    let [degrees, minutes, seconds] = components.get(..3)? else {
        return None;
    };
    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;

    match hemisphere.trim().to_ascii_uppercase().chars().next() {
        Some('S') | Some('W') => Some(-decimal),
        _ => Some(decimal),
    }
}

fn parse_component(part: &str) -> Option<f64> {
    match part.split_once('/') {
        Some((num, denom)) => {
            let num: f64 = num.trim().parse().ok()?;
            let denom: f64 = denom.trim().parse().ok()?;
            (denom != 0.0).then(|| num / denom)
        }
        None => part.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tags(pairs: &[(&str, &str)]) -> ExifTags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_dms_to_decimal() {
        let north = dms_to_decimal("47/1, 18/1, 835/100", "N").unwrap();
        assert!((north - 47.30232).abs() < 0.0001);

        let south = dms_to_decimal("34/1, 5/1, 0/1", "S").unwrap();
        assert!((south - -34.08333).abs() < 0.0001);
    }

    #[test]
    fn test_dms_to_decimal_separators() {
        let spaced = dms_to_decimal("122/1 57/1 2667/100", "W").unwrap();
        let decimals = dms_to_decimal("122, 57, 26.67", "W").unwrap();
        assert!((spaced - decimals).abs() < 1e-9);
        assert!(spaced < 0.0);
    }

    #[test]
    fn test_dms_to_decimal_malformed() {
        assert_eq!(dms_to_decimal("47/1, 18/1", "N"), None);
        assert_eq!(dms_to_decimal("", "N"), None);
        assert_eq!(dms_to_decimal("47/1, x/1, 0/1", "N"), None);
        assert_eq!(dms_to_decimal("47/0, 1/1, 0/1", "N"), None);
    }

    #[test]
    fn test_geo_from_tags_extracted() {
        let geo = geo_from_tags(&tags(&[
            ("DateTimeOriginal", "2024:01:15 10:30:00"),
            ("GPSLatitude", "39/1, 11/1, 1284/100"),
            ("GPSLatitudeRef", "N"),
            ("GPSLongitude", "106/1, 49/1, 57/1"),
            ("GPSLongitudeRef", "W"),
        ]));
        assert_eq!(geo.state(), ExifState::Extracted);
        assert_eq!(
            geo.taken_at.map(|t| t.date()),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        let (lat, lon) = geo.coordinates().unwrap();
        assert!((lat - 39.1869).abs() < 0.001);
        assert!((lon - -106.8325).abs() < 0.001);
    }

    #[test]
    fn test_timestamp_alone_is_missing() {
        let geo = geo_from_tags(&tags(&[("DateTimeOriginal", "2024:01:15 10:30:00")]));
        assert!(geo.taken_at.is_some());
        assert_eq!(geo.state(), ExifState::Missing);
    }

    #[test]
    fn test_missing_reference_drops_coordinate() {
        let geo = geo_from_tags(&tags(&[
            ("DateTimeOriginal", "2024:01:15 10:30:00"),
            ("GPSLatitude", "39/1, 11/1, 0/1"),
            ("GPSLongitude", "106/1, 49/1, 0/1"),
            ("GPSLongitudeRef", "W"),
        ]));
        assert!(geo.latitude.is_none());
        assert_eq!(geo.state(), ExifState::Missing);
    }

    #[test]
    fn test_timestamp_fallbacks() {
        let geo = geo_from_tags(&tags(&[
            ("DateTimeOriginal", "0000:00:00 00:00:00"),
            ("DateTime", "2024-02-01 08:00:00"),
        ]));
        assert_eq!(
            geo.taken_at.map(|t| t.date()),
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
    }

    #[test]
    fn test_fs_store_without_exif() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plain.jpg"), b"not really a jpeg").unwrap();

        let store = FsImageStore::with_root(dir.path());
        assert!(store.read_metadata("plain.jpg").is_err());
        assert_eq!(store.bytes("plain.jpg").unwrap(), b"not really a jpeg");

        let geo = extract_geo(&store, "plain.jpg");
        assert_eq!(geo, PhotoGeo::default());
        assert_eq!(geo.state(), ExifState::Missing);
        assert_eq!(extract_geo(&store, "absent.jpg").state(), ExifState::Missing);
    }
}
