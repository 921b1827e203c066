//! Shared data models used across modules

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// JSON body of `POST /images`.
///
/// Both source fields are optional on the wire so that "both" and "neither"
/// reach validation and get their own error messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeImageBody {
    pub label: Option<String>,
    #[serde(default)]
    pub analyze_image: bool,
    pub image_url: Option<String>,
    /// Base64 encoded image bytes
    pub image_data: Option<String>,
}

/// Where the image bytes come from. Exactly one source per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    /// Already base64-decoded
    Inline(Bytes),
}

/// A request that has passed parsing: label settled, source unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub label: String,
    pub analyze_image: bool,
    pub source: ImageSource,
}

/// A persisted image record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImageRecord {
    pub id: i64,
    pub label: String,
    pub url: String,
    pub analyze_image: bool,
    pub objects: Vec<String>,
}

/// Fields of a record before the store assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewImageRecord {
    pub label: String,
    pub url: String,
    pub analyze_image: bool,
    pub objects: Vec<String>,
}

/// Response shape for created and fetched images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedImage {
    pub id: i64,
    pub label: String,
    pub url: String,
    pub objects: Vec<String>,
}

impl From<ImageRecord> for AnalyzedImage {
    fn from(record: ImageRecord) -> Self {
        AnalyzedImage {
            id: record.id,
            label: record.label,
            url: record.url,
            objects: record.objects,
        }
    }
}
