//! Optional crop images.
//!
//! Images live at `<dir>/<lowercased crop>.jpg`. A missing image is normal
//! and reported as an informational message, never as an error. An image
//! that exists but cannot be opened is reported as a warning instead.

use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default directory holding crop images
pub const DEFAULT_IMAGE_DIR: &str = "crop_images";

/// File extension of crop images
pub const IMAGE_EXTENSION: &str = "jpg";

/// Result of an image lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImagePreview {
    /// Image exists; `file_name` is relative to the image directory
    Available {
        #[serde(skip)]
        path: PathBuf,
        file_name: String,
    },
    /// No image for this crop
    Unavailable { message: String },
    /// Image file exists but could not be opened
    Unreadable { message: String },
}

impl ImagePreview {
    pub fn is_available(&self) -> bool {
        matches!(self, ImagePreview::Available { .. })
    }
}

/// Looks up crop images in one directory
#[derive(Debug, Clone)]
pub struct ImageCatalog {
    dir: PathBuf,
}

impl ImageCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a crop, or `None` if the name cannot be a plain file name
    pub fn file_name(crop: &str) -> Option<String> {
        let stem = crop.trim().to_lowercase();
        let is_plain = !stem.is_empty()
            && stem != "."
            && stem != ".."
            && !stem.contains(['/', '\\', '\0']);
        is_plain.then(|| format!("{}.{}", stem, IMAGE_EXTENSION))
    }

    pub fn lookup(&self, crop: &str) -> ImagePreview {
        let Some(file_name) = Self::file_name(crop) else {
            return Self::unavailable(crop);
        };
        let path = self.dir.join(&file_name);
        if !path.is_file() {
            return Self::unavailable(crop);
        }

        let opened = File::open(&path).map(drop);
        Self::checked(crop, path, file_name, opened)
    }

    /// Preview for an existing file, given the result of opening it
    fn checked(crop: &str, path: PathBuf, file_name: String, opened: io::Result<()>) -> ImagePreview {
        match opened {
            Ok(()) => ImagePreview::Available { path, file_name },
            Err(e) => {
                warn!("Couldn't load image for {} from {}: {}", crop, path.display(), e);
                ImagePreview::Unreadable {
                    message: "Couldn't load crop image".to_string(),
                }
            }
        }
    }

    fn unavailable(crop: &str) -> ImagePreview {
        ImagePreview::Unavailable {
            message: format!("No preview available for {}", crop),
        }
    }
}

impl Default for ImageCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_image_is_informational() {
        let dir = TempDir::new().unwrap();
        let catalog = ImageCatalog::new(dir.path());

        assert_eq!(
            catalog.lookup("rice"),
            ImagePreview::Unavailable {
                message: "No preview available for rice".into()
            }
        );
    }

    #[test]
    fn test_existing_image_is_found_by_lowercase_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("kidneybeans.jpg"), b"jpeg").unwrap();
        let catalog = ImageCatalog::new(dir.path());

        let preview = catalog.lookup("KidneyBeans");
        assert!(preview.is_available());
        match preview {
            ImagePreview::Available { path, file_name } => {
                assert_eq!(file_name, "kidneybeans.jpg");
                assert_eq!(path, dir.path().join("kidneybeans.jpg"));
            }
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_path_like_names_are_rejected() {
        assert_eq!(ImageCatalog::file_name("../secrets"), None);
        assert_eq!(ImageCatalog::file_name(".."), None);
        assert_eq!(ImageCatalog::file_name(""), None);
        assert_eq!(ImageCatalog::file_name("Rice"), Some("rice.jpg".into()));

        let catalog = ImageCatalog::new("/tmp");
        assert!(!catalog.lookup("../etc/passwd").is_available());
    }

    #[test]
    fn test_unopenable_image_is_a_warning() {
        let preview = ImageCatalog::checked(
            "rice",
            PathBuf::from("crop_images/rice.jpg"),
            "rice.jpg".into(),
            Err(io::Error::from(io::ErrorKind::PermissionDenied)),
        );

        assert!(!preview.is_available());
        assert_eq!(
            preview,
            ImagePreview::Unreadable {
                message: "Couldn't load crop image".into()
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_not_offered() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rice.jpg");
        fs::write(&path, b"jpeg").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();
        if File::open(&path).is_ok() {
            // running with privileges that ignore file modes
            return;
        }

        let preview = ImageCatalog::new(dir.path()).lookup("rice");
        assert!(matches!(preview, ImagePreview::Unreadable { .. }));
    }

    #[test]
    fn test_directory_named_like_crop_is_not_an_image() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("rice.jpg")).unwrap();
        assert!(!ImageCatalog::new(dir.path()).lookup("rice").is_available());
    }
}
