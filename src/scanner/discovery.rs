use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::error::{ImportError, Result};

/// Image files under `directory` with one of `extensions`, sorted by path.
///
/// Hidden files and directories are skipped.
pub fn discover_photos(directory: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(ImportError::Invalid(format!(
            "not a directory: {}",
            directory.display()
        )));
    }

    let mut photos: Vec<PathBuf> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), extensions))
        .map(|e| e.into_path())
        .collect();

    photos.sort();
    Ok(photos)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_discover_photos() {
        let dir = tempdir().unwrap();

        File::create(dir.path().join("lift.JPG")).unwrap();
        File::create(dir.path().join("summit.jpeg")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        File::create(dir.path().join(".hidden.jpg")).unwrap();

        fs::create_dir(dir.path().join("day2")).unwrap();
        File::create(dir.path().join("day2/gondola.jpg")).unwrap();
        fs::create_dir(dir.path().join(".thumbs")).unwrap();
        File::create(dir.path().join(".thumbs/small.jpg")).unwrap();

        let extensions = vec!["jpg".to_string(), "jpeg".to_string()];
        let photos = discover_photos(dir.path(), &extensions).unwrap();

        let names: Vec<String> = photos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["gondola.jpg", "lift.JPG", "summit.jpeg"]);
    }

    #[test]
    fn test_discover_rejects_missing_directory() {
        let dir = tempdir().unwrap();
        assert!(discover_photos(&dir.path().join("nope"), &["jpg".to_string()]).is_err());
    }
}
