//! Image discovery for batch runs

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tarot_common::{Error, Result};

use crate::store::LabelStore;

/// Extensions picked up by a batch run
const BATCH_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Image filenames in `dir`, sorted
pub fn list_images(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::NotFound(format!(
                "Image folder does not exist: {}",
                dir.display()
            )))
        }
        Err(e) => return Err(e.into()),
    };

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_image = Path::new(&name)
            .extension()
            .map(|e| e.to_string_lossy())
            .is_some_and(|e| BATCH_EXTENSIONS.iter().any(|b| b.eq_ignore_ascii_case(&e)));
        if is_image {
            images.push(name);
        }
    }

    images.sort();
    Ok(images)
}

/// Drop the first `start` images, then (optionally) those already annotated
pub fn select_images(
    images: Vec<String>,
    start: usize,
    skip_existing: bool,
    labels: &LabelStore,
) -> Result<Vec<String>> {
    let mut selected = Vec::new();
    for image in images.into_iter().skip(start) {
        if skip_existing && labels.has_annotation(&image)? {
            continue;
        }
        selected.push(image);
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_images_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.JPG", "a.png", "c.jpeg", "notes.txt", "d.webp"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        assert_eq!(list_images(dir.path()).unwrap(), vec!["a.png", "b.JPG", "c.jpeg"]);
    }

    #[test]
    fn test_missing_folder_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(list_images(&dir.path().join("nope")), Err(Error::NotFound(_))));
    }
}
