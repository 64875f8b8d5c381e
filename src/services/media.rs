//! Recipe image storage on the local filesystem.
//!
//! Images arrive as `data:<mime>;base64,<payload>` strings and are written
//! under `{root}/recipes/{uuid}.{ext}`. The database stores the path
//! relative to the media root; responses expose it as an absolute URL.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::fs;
use tracing::{debug, warn};

use crate::config::MediaConfig;
use crate::error::FieldErrors;
use crate::{Error, Result};

const IMAGE_DIR: &str = "recipes";

/// Allowed image formats: mime type, file extension, leading magic bytes.
const IMAGE_FORMATS: &[(&str, &str, &[u8])] = &[
    ("image/png", "png", b"\x89PNG\r\n\x1a\n"),
    ("image/jpeg", "jpg", b"\xFF\xD8\xFF"),
    ("image/jpg", "jpg", b"\xFF\xD8\xFF"),
    ("image/gif", "gif", b"GIF8"),
    ("image/webp", "webp", b"RIFF"),
];

/// An image decoded from a data URL, not yet written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Service for storing and serving recipe images.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
    public_url: String,
    max_size: usize,
}

impl MediaStorage {
    /// Create a media storage rooted at `config.root`.
    pub fn new(config: &MediaConfig, public_url: &str) -> Self {
        Self {
            root: config.root.clone(),
            url_prefix: config.url.clone(),
            public_url: public_url.trim_end_matches('/').to_string(),
            max_size: config.max_image_size,
        }
    }

    /// Decode and check a data URL. Problems are reported against `image`.
    pub fn decode(&self, data_url: &str) -> Result<DecodedImage> {
        let invalid = |message: &str| Error::Validation(FieldErrors::single("image", message));

        let rest = data_url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| invalid("Expected a base64 data URL."))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| invalid("Expected a base64 data URL."))?;

        let mime = mime.to_ascii_lowercase();
        let &(_, extension, magic) = IMAGE_FORMATS
            .iter()
            .find(|(m, _, _)| *m == mime)
            .ok_or_else(|| invalid("Unsupported image type. Use PNG, JPEG, GIF or WebP."))?;

        // Reject before decoding when the payload alone is clearly too big.
        if payload.len() / 4 * 3 > self.max_size + 3 {
            return Err(invalid(&self.too_large_message()));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|_| invalid("Invalid base64 image data."))?;

        if bytes.len() > self.max_size {
            return Err(invalid(&self.too_large_message()));
        }
        if !bytes.starts_with(magic) {
            return Err(invalid("Image content does not match its declared type."));
        }

        Ok(DecodedImage { extension, bytes })
    }

    fn too_large_message(&self) -> String {
        format!("Image exceeds the maximum size of {} bytes.", self.max_size)
    }

    /// Write an image and return its media-relative path.
    pub async fn save(&self, image: &DecodedImage) -> Result<String> {
        let dir = self.root.join(IMAGE_DIR);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Internal(format!("Failed to create media directory: {}", e)))?;

        let name = format!("{}.{}", uuid::Uuid::new_v4(), image.extension);
        let path = dir.join(&name);

        // Atomic write: temp file, then rename
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &image.bytes)
            .await
            .map_err(|e| Error::Internal(format!("Failed to write image: {}", e)))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| Error::Internal(format!("Failed to store image: {}", e)))?;

        debug!(path = %path.display(), size = image.bytes.len(), "Stored image");
        Ok(format!("{}/{}", IMAGE_DIR, name))
    }

    /// Remove a stored image. Failures are logged, not returned.
    pub async fn remove(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            warn!(path = relative, "Refusing to remove image outside media root");
            return;
        };

        match fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Removed image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove image"),
        }
    }

    /// Absolute path of a media-relative path, if it stays inside the root.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
        safe.then(|| self.root.join(relative))
    }

    /// Public URL of a stored image.
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}{}{}", self.public_url, self.url_prefix, relative)
    }
}
