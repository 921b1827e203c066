//! Request parsing and source validation.
//!
//! Parsing turns the wire body into an [`AnalyzeRequest`] (exactly one source,
//! settled label, inline data decoded). Validation then gates URL sources on
//! reachability, dimensions, content type and size. Nothing here writes
//! anywhere: a failure at this stage leaves no blob and no record behind.

use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::{Bytes, BytesMut};
use image::ImageReader;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::constants::{ALLOWED_CONTENT_TYPES, MAX_IMAGE_BYTES, MAX_LABEL_LEN, MIN_DIMENSION, MIN_LABEL_LEN};
use crate::labels;
use crate::models::{AnalyzeImageBody, AnalyzeRequest, ImageSource};

/// Client-caused rejection. The Display text is returned verbatim as the 400 detail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Cannot provide both image_url and image_data")]
    BothSources,

    #[error("Must provide one of image_url or image_data")]
    MissingSource,

    #[error("label must be between 1 and 50 characters")]
    InvalidLabel,

    #[error("image_data is not valid base64")]
    InvalidImageData,

    #[error("{0} is an invalid URL")]
    InvalidUrl(String),

    #[error("{0} does not exist")]
    UrlNotFound(String),

    #[error("An error occured accessing the image at {0}")]
    UrlUnreachable(String),

    #[error("{content_type} is an invalid content type. Must be one of {allowed}", allowed = ALLOWED_CONTENT_TYPES.join(", "))]
    InvalidContentType { content_type: String },

    #[error("Image must be smaller than 4 MB")]
    TooLarge,

    #[error("{0} could not be decoded as an image")]
    Undecodable(String),

    #[error("{0} does not meet the minimum dimensions of 50 x 50")]
    TooSmall(String),
}

/// Source bytes that passed validation. URL bodies are carried along so they
/// are never fetched a second time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedSource {
    Url { url: String, bytes: Bytes },
    Inline(Bytes),
}

/// Parse the wire body. Source exclusivity is checked first, then the label,
/// then inline data decoding.
pub fn parse_request(body: AnalyzeImageBody) -> Result<AnalyzeRequest, ValidationError> {
    let source = match (body.image_url, body.image_data) {
        (Some(_), Some(_)) => return Err(ValidationError::BothSources),
        (None, None) => return Err(ValidationError::MissingSource),
        (Some(url), None) => ImageSource::Url(url),
        (None, Some(data)) => ImageSource::Inline(decode_image_data(&data)?),
    };

    let label = match body.label {
        Some(label) => check_label(label)?,
        None => labels::generate(),
    };

    Ok(AnalyzeRequest {
        label,
        analyze_image: body.analyze_image,
        source,
    })
}

fn check_label(label: String) -> Result<String, ValidationError> {
    let len = label.chars().count();
    if (MIN_LABEL_LEN..=MAX_LABEL_LEN).contains(&len) {
        Ok(label)
    } else {
        Err(ValidationError::InvalidLabel)
    }
}

/// Decode standard base64, tolerating a `data:<mime>;base64,` prefix and
/// whitespace anywhere in the payload (wrapped lines included).
pub fn decode_image_data(data: &str) -> Result<Bytes, ValidationError> {
    let data = data.trim();
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let payload: Vec<u8> = payload
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    let decoded = STANDARD
        .decode(&payload)
        .map_err(|_| ValidationError::InvalidImageData)?;
    if decoded.is_empty() {
        return Err(ValidationError::InvalidImageData);
    }
    Ok(Bytes::from(decoded))
}

/// A URL is usable if it parses and has a non-empty host.
pub fn parse_source_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}

/// Media type of a response with parameters (`; charset=...`) stripped.
fn response_content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

pub fn is_allowed_content_type(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&content_type)
}

pub fn meets_minimum_dimensions(width: u32, height: u32) -> bool {
    width > MIN_DIMENSION && height > MIN_DIMENSION
}

/// Pixel dimensions read from the image header, if the format is recognised.
pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Gate for image sources. Holds the HTTP client used to probe URL sources.
#[derive(Clone)]
pub struct SourceValidator {
    http: reqwest::Client,
}

impl SourceValidator {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub async fn validate(&self, source: ImageSource) -> Result<ValidatedSource, ValidationError> {
        match source {
            ImageSource::Inline(bytes) => Ok(ValidatedSource::Inline(bytes)),
            ImageSource::Url(url) => self.validate_url(url).await,
        }
    }

    /// One GET covers existence, dimensions, content type and size, checked
    /// in that order. The body is kept for the rest of the pipeline.
    async fn validate_url(&self, raw: String) -> Result<ValidatedSource, ValidationError> {
        let url = parse_source_url(&raw).ok_or_else(|| ValidationError::InvalidUrl(raw.clone()))?;

        let mut response = self.http.get(url).send().await.map_err(|e| {
            debug!(url = %raw, error = %e, "Image source request failed");
            ValidationError::UrlUnreachable(raw.clone())
        })?;

        if !response.status().is_success() {
            debug!(url = %raw, status = %response.status(), "Image source returned non-success status");
            return Err(ValidationError::UrlNotFound(raw));
        }

        let content_type = response_content_type(response.headers()).unwrap_or_else(|| "<none>".to_string());

        // Reading stops at the cap; the header bytes are enough for dimensions
        let mut body = BytesMut::new();
        let mut too_large = false;
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            debug!(url = %raw, error = %e, "Image source body read failed");
            ValidationError::UrlUnreachable(raw.clone())
        })? {
            body.extend_from_slice(&chunk);
            if body.len() >= MAX_IMAGE_BYTES {
                too_large = true;
                break;
            }
        }
        let bytes = body.freeze();

        let (width, height) =
            image_dimensions(&bytes).ok_or_else(|| ValidationError::Undecodable(raw.clone()))?;
        debug!(url = %raw, width, height, "Image source dimensions");
        if !meets_minimum_dimensions(width, height) {
            return Err(ValidationError::TooSmall(raw));
        }

        if !is_allowed_content_type(&content_type) {
            return Err(ValidationError::InvalidContentType { content_type });
        }

        if too_large {
            return Err(ValidationError::TooLarge);
        }

        Ok(ValidatedSource::Url { url: raw, bytes })
    }
}
