//! Bundle resolution: locate the exported document and its images.
//!
//! A bundle is an already-extracted directory tree (archive handling is the
//! caller's problem) containing exactly one HTML export plus zero or more
//! image files, usually under an `images/` subdirectory. The walk is
//! recursive because exporters differ on nesting; file extension decides the
//! role of each file.

use crate::error::MailforgeError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Image extensions the upload pipeline accepts.
const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// The resolved contents of a bundle directory.
#[derive(Debug)]
pub struct Bundle {
    /// The exported HTML document.
    pub document: PathBuf,
    /// Every image file found, in directory-walk order.
    pub images: Vec<PathBuf>,
}

/// Walk `dir` and classify its files.
///
/// # Errors
/// [`MailforgeError::BundleNotFound`] when the directory does not exist,
/// [`MailforgeError::DocumentMissing`] when no `.html` file is present.
/// Extra HTML files are tolerated: the first one found wins (exports only
/// ever contain one).
pub fn scan_bundle(dir: impl AsRef<Path>) -> Result<Bundle, MailforgeError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(MailforgeError::BundleNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut document = None;
    let mut images = Vec::new();
    walk(dir, &mut document, &mut images)?;

    let document = document.ok_or_else(|| MailforgeError::DocumentMissing {
        path: dir.to_path_buf(),
    })?;

    debug!(
        "Bundle {}: document {}, {} images",
        dir.display(),
        document.display(),
        images.len()
    );

    Ok(Bundle { document, images })
}

fn walk(
    dir: &Path,
    document: &mut Option<PathBuf>,
    images: &mut Vec<PathBuf>,
) -> Result<(), MailforgeError> {
    let entries = std::fs::read_dir(dir).map_err(|e| MailforgeError::Internal(format!(
        "cannot read bundle directory '{}': {e}",
        dir.display()
    )))?;

    for entry in entries {
        let entry = entry
            .map_err(|e| MailforgeError::Internal(format!("bundle walk failed: {e}")))?;
        let path = entry.path();

        if path.is_dir() {
            walk(&path, document, images)?;
            continue;
        }

        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();

        if ext == "html" {
            if document.is_none() {
                *document = Some(path);
            }
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            images.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_document_and_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("newsletter.html"), "<html></html>").unwrap();
        std::fs::create_dir(dir.path().join("images")).unwrap();
        std::fs::write(dir.path().join("images/image1.png"), b"png").unwrap();
        std::fs::write(dir.path().join("images/image2.JPG"), b"jpg").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let bundle = scan_bundle(dir.path()).unwrap();
        assert!(bundle.document.ends_with("newsletter.html"));
        assert_eq!(bundle.images.len(), 2);
    }

    #[test]
    fn missing_directory_is_fatal() {
        let err = scan_bundle("/definitely/not/here").unwrap_err();
        assert!(matches!(err, MailforgeError::BundleNotFound { .. }));
    }

    #[test]
    fn no_html_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("only.png"), b"png").unwrap();

        let err = scan_bundle(dir.path()).unwrap_err();
        assert!(matches!(err, MailforgeError::DocumentMissing { .. }));
    }

    #[test]
    fn empty_image_list_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.html"), "<html></html>").unwrap();

        let bundle = scan_bundle(dir.path()).unwrap();
        assert!(bundle.images.is_empty());
    }
}
