//! # Image Loader
//!
//! Validates an uploaded file's media type and decodes it into a
//! [`SourceImage`]. A file is only decoded once it has been accepted as an
//! image, either from its declared type or, when none is declared, from its
//! file extension.

use image::RgbaImage;
use tracing::{info, warn};

use crate::error::WatermarkError;

/// A decoded image owned by one session.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub image: RgbaImage,
}

impl SourceImage {
    pub fn from_rgba(filename: impl Into<String>, image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            filename: filename.into(),
            width,
            height,
            image,
        }
    }
}

/// Reject anything that does not declare (or look like) an image.
pub fn check_media_type(declared: Option<&str>, filename: &str) -> Result<(), WatermarkError> {
    let media_type = match declared.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.to_ascii_lowercase(),
        None => match mime_guess::from_path(filename).first() {
            Some(guess) => guess.essence_str().to_string(),
            // Nothing to go on; let the decoder sniff the content.
            None => return Ok(()),
        },
    };

    if media_type.starts_with("image/") {
        Ok(())
    } else {
        Err(WatermarkError::InvalidInput(format!(
            "'{}' is {}, please upload an image file",
            filename, media_type
        )))
    }
}

/// Validate and decode an uploaded file.
pub fn load_image(
    bytes: &[u8],
    declared_type: Option<&str>,
    filename: &str,
) -> Result<SourceImage, WatermarkError> {
    if let Err(e) = check_media_type(declared_type, filename) {
        warn!(filename, ?declared_type, "rejected non-image upload");
        return Err(e);
    }
    if bytes.is_empty() {
        return Err(WatermarkError::InvalidInput(format!("'{}' is empty", filename)));
    }

    let decoded = image::load_from_memory(bytes).map_err(|e| {
        WatermarkError::Decode(format!("Failed to decode '{}': {}", filename, e))
    })?;

    let source = SourceImage::from_rgba(filename, decoded.to_rgba8());
    info!(
        filename,
        width = source.width,
        height = source.height,
        "loaded image"
    );
    Ok(source)
}
