//! Shelf image validation
//!
//! Size and format gate in front of the Gemini client. The format check
//! sniffs magic bytes rather than trusting a filename, so a renamed GIF is
//! still rejected. Filename extension checking is a separate, optional
//! courtesy check for upload paths that have one.

use thiserror::Error;

/// Upload size cap, 10 MB
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

#[derive(Debug, Error, PartialEq)]
pub enum ImageError {
    #[error("Empty image data")]
    Empty,

    #[error("Image is {size} bytes, maximum is {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Could not recognize image data")]
    UnrecognizedData,

    #[error("Unsupported image type: {0} (allowed: png, jpeg, webp)")]
    UnsupportedType(String),

    #[error("Unsupported file extension: {0} (allowed: png, jpg, jpeg, webp)")]
    UnsupportedExtension(String),
}

pub struct ImageValidator {
    max_bytes: usize,
}

impl ImageValidator {
    pub fn new() -> Self {
        Self {
            max_bytes: MAX_IMAGE_BYTES,
        }
    }

    /// Validator with a non-default size cap
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Check size and sniff the image format
    ///
    /// Returns the detected MIME type, which is what gets sent to the
    /// Gemini API as the inline data type.
    pub fn validate(&self, data: &[u8]) -> Result<&'static str, ImageError> {
        if data.is_empty() {
            return Err(ImageError::Empty);
        }
        if data.len() > self.max_bytes {
            return Err(ImageError::TooLarge {
                size: data.len(),
                max: self.max_bytes,
            });
        }
        let kind = infer::get(data).ok_or(ImageError::UnrecognizedData)?;
        let mime = kind.mime_type();
        ALLOWED_MIME_TYPES
            .iter()
            .find(|allowed| **allowed == mime)
            .copied()
            .ok_or_else(|| ImageError::UnsupportedType(mime.to_string()))
    }

    /// Reject filenames whose extension is not an accepted image type
    pub fn check_extension(filename: &str) -> Result<(), ImageError> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            Ok(())
        } else if extension.is_empty() {
            Err(ImageError::UnsupportedExtension(filename.to_string()))
        } else {
            Err(ImageError::UnsupportedExtension(extension))
        }
    }
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self::new()
    }
}
