//! Turns a validated source into image bytes with a sniffed format.

use bytes::Bytes;
use image::ImageFormat;
use thiserror::Error;

use super::validation::ValidatedSource;

/// Late failure once validation has passed. Not retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceFetchError {
    #[error("image data is empty")]
    Empty,

    #[error("image data is not a recognized image format")]
    UnrecognizedFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImage {
    pub bytes: Bytes,
    /// Sniffed from the bytes, never taken from a client-declared content type
    pub format: ImageFormat,
}

impl ResolvedImage {
    /// Lowercased format name used as the blob extension
    pub fn extension(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::WebP => "webp",
            ImageFormat::Tiff => "tiff",
            other => other.extensions_str().first().copied().unwrap_or("bin"),
        }
    }
}

/// URL bodies fetched during validation are reused as-is; inline data was
/// decoded while parsing.
pub fn resolve(source: ValidatedSource) -> Result<ResolvedImage, SourceFetchError> {
    let bytes = match source {
        ValidatedSource::Url { bytes, .. } => bytes,
        ValidatedSource::Inline(bytes) => bytes,
    };
    if bytes.is_empty() {
        return Err(SourceFetchError::Empty);
    }

    let format = image::guess_format(&bytes).map_err(|_| SourceFetchError::UnrecognizedFormat)?;
    Ok(ResolvedImage { bytes, format })
}
