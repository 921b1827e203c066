//! Application constants

/// Default GCS bucket for uploaded images
pub const DEFAULT_BUCKET_NAME: &str = "image_analysis_images";

/// Images must be strictly smaller than this many bytes (4 MiB)
pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// Both sides of a source image must be strictly larger than this
pub const MIN_DIMENSION: u32 = 50;

/// Content types accepted for URL sources
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/bmp"];

/// Request body limit: a base64-encoded 4 MiB image plus JSON overhead
pub const MAX_REQUEST_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Label length bounds, in characters
pub const MIN_LABEL_LEN: usize = 1;
pub const MAX_LABEL_LEN: usize = 50;

/// Default confidence a detected object must exceed to be kept
pub const DEFAULT_CONFIDENCE_SCORE: f64 = 0.5;

/// Default timeout for outbound HTTP calls (source fetch, vision API)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
