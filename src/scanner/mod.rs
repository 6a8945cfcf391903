//! Photo evidence: discovery, hashing, metadata extraction and resort
//! inference.

pub mod discovery;
pub mod hashing;
pub mod metadata;

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use tracing::{debug, info, warn};

use crate::db::{Database, EvidenceItem, ExifState, ImportSession, Resort};
use crate::error::Result;
use crate::gazetteer::nearest_resort;
use crate::import::drafts::attach_evidence;
use crate::tasks::{is_cancelled, TaskProgress, TaskUpdate};

pub use discovery::discover_photos;
pub use hashing::content_hash;
pub use metadata::{dms_to_decimal, extract_geo, FsImageStore, ImageStore, PhotoGeo};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub processed: usize,
    /// Photos with a capture time and GPS position.
    pub extracted: usize,
    /// Photos that ended up filed under a draft.
    pub attached: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// What extraction learned about one photo, before it is persisted.
struct Extraction {
    geo: PhotoGeo,
    resort_id: Option<i64>,
    error: Option<String>,
}

fn extract(store: &dyn ImageStore, resorts: &[Resort], photo: &EvidenceItem) -> Extraction {
    let geo = extract_geo(store, &photo.raw);
    let nearest = geo.coordinates().and_then(|point| nearest_resort(point, resorts));
    if let Some(found) = &nearest {
        debug!(
            blob_ref = %photo.raw,
            resort = %found.resort.name,
            distance_km = found.distance_km,
            "Nearest resort"
        );
    }

    let error = match (geo.taken_at, geo.coordinates(), &nearest) {
        (None, None, _) => Some("no capture time or GPS position"),
        (None, Some(_), _) => Some("no capture time"),
        (Some(_), None, _) => Some("no GPS position"),
        (Some(_), Some(_), None) => Some("no resort with coordinates"),
        (Some(_), Some(_), Some(_)) => None,
    };

    Extraction {
        geo,
        resort_id: nearest.map(|n| n.resort.id),
        error: error.map(str::to_string),
    }
}

/// Persist one extraction and file the photo under its draft.
fn record(db: &Database, session: &ImportSession, photo: &EvidenceItem, extraction: &Extraction) -> Result<bool> {
    db.write(|store| {
        store.record_extraction(
            photo.id,
            extraction.geo.taken_at,
            extraction.geo.latitude,
            extraction.geo.longitude,
            extraction.geo.state(),
            extraction.geo.taken_at.map(|t| t.date()),
            extraction.resort_id,
            extraction.error.as_deref(),
        )?;
        let Some(updated) = store.get_evidence(photo.id)? else {
            return Ok(false);
        };
        Ok(attach_evidence(store, session, &updated)?.is_some())
    })
}

/// Extract metadata for every unprocessed photo of `session` in parallel.
///
/// Extraction and the nearest-resort search share no state; each photo is
/// written in its own transaction. Photos still queued when `cancel_flag` is
/// raised are left unprocessed.
pub fn process_photos(
    db: &Database,
    store: &dyn ImageStore,
    session: &ImportSession,
    resorts: &[Resort],
    progress_tx: Option<mpsc::Sender<TaskUpdate>>,
    cancel_flag: &AtomicBool,
) -> Result<ExtractionSummary> {
    let photos = db.read(|s| s.unprocessed_photos(session.id))?;
    let total = photos.len();
    if let Some(tx) = &progress_tx {
        let _ = tx.send(TaskUpdate::Started { total });
    }

    let processed = AtomicUsize::new(0);
    let extracted = AtomicUsize::new(0);
    let attached = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    photos.par_iter().for_each(|photo| {
        if is_cancelled(cancel_flag) {
            return;
        }
        let extraction = extract(store, resorts, photo);
        if extraction.geo.state() == ExifState::Extracted {
            extracted.fetch_add(1, Ordering::Relaxed);
        }

        match record(db, session, photo, &extraction) {
            Ok(true) => {
                attached.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {}
            Err(e) => {
                warn!(evidence_id = photo.id, error = %e, "Photo not recorded");
                failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(tx) = &progress_tx {
            let _ = tx.send(TaskUpdate::Progress(
                TaskProgress::new(current, total).with_item(photo.raw.clone()),
            ));
        }
    });

    let summary = ExtractionSummary {
        processed: processed.into_inner(),
        extracted: extracted.into_inner(),
        attached: attached.into_inner(),
        failed: failed.into_inner(),
        cancelled: is_cancelled(cancel_flag),
    };
    info!(
        session_id = session.id,
        processed = summary.processed,
        extracted = summary.extracted,
        attached = summary.attached,
        failed = summary.failed,
        "Photo extraction finished"
    );

    if let Some(tx) = &progress_tx {
        let update = if summary.cancelled {
            TaskUpdate::Cancelled
        } else {
            TaskUpdate::Completed {
                message: format!("{} of {} photos placed", summary.attached, total),
            }
        };
        let _ = tx.send(update);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{EvidenceKind, ImportSource, NewEvidence};
    use crate::error::ImportError;
    use crate::scanner::metadata::ExifTags;
    use crate::testutil::{date, Fixture};
    use std::collections::HashMap;

    /// Image store serving canned tags keyed by blob reference.
    struct MemoryStore(HashMap<String, ExifTags>);

    impl ImageStore for MemoryStore {
        fn read_metadata(&self, blob_ref: &str) -> Result<ExifTags> {
            self.0
                .get(blob_ref)
                .cloned()
                .ok_or_else(|| ImportError::Invalid(format!("no blob {}", blob_ref)))
        }

        fn bytes(&self, blob_ref: &str) -> Result<Vec<u8>> {
            Ok(blob_ref.as_bytes().to_vec())
        }
    }

    fn tags(taken: &str, lat: &str, lat_ref: &str, lon: &str, lon_ref: &str) -> ExifTags {
        [
            ("DateTimeOriginal", taken),
            ("GPSLatitude", lat),
            ("GPSLatitudeRef", lat_ref),
            ("GPSLongitude", lon),
            ("GPSLongitudeRef", lon_ref),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn setup(fx: &Fixture, blobs: &[&str]) -> ImportSession {
        fx.db
            .write(|store| {
                let id = store.insert_session(fx.owner, ImportSource::Photos, None)?;
                for blob in blobs {
                    store.insert_evidence(
                        id,
                        EvidenceKind::Photo,
                        &NewEvidence {
                            raw: blob.to_string(),
                            ..Default::default()
                        },
                    )?;
                }
                Ok(store.get_session(id)?.unwrap())
            })
            .unwrap()
    }

    fn store() -> MemoryStore {
        let mut blobs = HashMap::new();
        // Near Zermatt.
        blobs.insert(
            "a.jpg".to_string(),
            tags("2024:01:15 10:00:00", "46/1, 0/1, 5/1", "N", "7/1, 45/1, 0/1", "E"),
        );
        blobs.insert(
            "b.jpg".to_string(),
            tags("2024:01:15 14:30:00", "46/1, 1/1, 0/1", "N", "7/1, 44/1, 30/1", "E"),
        );
        // Near Aspen, no timestamp.
        let mut no_time = tags("", "39/1, 11/1, 0/1", "N", "106/1, 49/1, 0/1", "W");
        no_time.remove("DateTimeOriginal");
        blobs.insert("c.jpg".to_string(), no_time);
        MemoryStore(blobs)
    }

    #[test]
    fn test_process_photos_groups_by_day_and_resort() {
        let fx = Fixture::new();
        let session = setup(&fx, &["a.jpg", "b.jpg", "c.jpg", "unreadable.jpg"]);
        let resorts = fx.db.read(|s| s.visible_resorts(fx.owner)).unwrap();
        let cancel = AtomicBool::new(false);

        let summary = process_photos(&fx.db, &store(), &session, &resorts, None, &cancel).unwrap();

        assert_eq!(summary.processed, 4);
        assert_eq!(summary.extracted, 2);
        assert_eq!(summary.attached, 2);
        assert_eq!(summary.failed, 0);

        let drafts = fx.db.read(|s| s.drafts_for_session(session.id)).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].key(), (date(2024, 1, 15), fx.zermatt));

        let unattached = fx.db.read(|s| s.unattached_evidence(session.id)).unwrap();
        assert_eq!(unattached.len(), 2);
        let no_time = unattached.iter().find(|e| e.raw == "c.jpg").unwrap();
        assert_eq!(no_time.exif_state, Some(ExifState::Missing));
        assert_eq!(no_time.resort_id, Some(fx.aspen));
        assert_eq!(no_time.error.as_deref(), Some("no capture time"));

        let again = process_photos(&fx.db, &store(), &session, &resorts, None, &cancel).unwrap();
        assert_eq!(again.processed, 0);
    }

    #[test]
    fn test_process_photos_cancelled() {
        let fx = Fixture::new();
        let session = setup(&fx, &["a.jpg", "b.jpg"]);
        let resorts = fx.db.read(|s| s.visible_resorts(fx.owner)).unwrap();
        let cancel = AtomicBool::new(true);
        let (tx, rx) = mpsc::channel();

        let summary = process_photos(&fx.db, &store(), &session, &resorts, Some(tx), &cancel).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.processed, 0);
        assert!(matches!(rx.try_iter().last(), Some(TaskUpdate::Cancelled)));
        assert_eq!(fx.db.read(|s| s.unprocessed_photos(session.id)).unwrap().len(), 2);
    }
}
