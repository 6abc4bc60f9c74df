//! # Error Types
//!
//! This module defines error types used throughout the watermark-pro library.

use thiserror::Error;

/// Main error type for watermark-pro operations
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// The supplied file is not something we accept (wrong media type, empty)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The upload exceeded the accepted body size
    #[error("Upload too large: {0}")]
    TooLarge(String),

    /// The image bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The composited raster could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),

    /// A watermark parameter is out of range or malformed
    #[error("Invalid config: {0}")]
    Config(String),

    /// Font loading or glyph rasterization failed
    #[error("Font error: {0}")]
    Font(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WatermarkError::InvalidInput("text/plain is not an image".to_string());
        assert_eq!(err.to_string(), "Invalid input: text/plain is not an image");

        let err = WatermarkError::Encode("empty output".to_string());
        assert_eq!(err.to_string(), "Encode error: empty output");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.png");
        let err: WatermarkError = io.into();
        assert!(matches!(err, WatermarkError::Io(_)));
        assert!(err.to_string().contains("missing.png"));
    }
}
