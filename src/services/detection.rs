//! Object detection against an external vision endpoint.
//!
//! The production detector talks to the Azure Computer Vision `analyze` REST
//! API. Only objects scoring strictly above the confidence threshold are kept,
//! in the order the endpoint returns them, duplicates included.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::VisionConfig;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("vision endpoint is not configured")]
    NotConfigured,

    #[error("vision request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("vision endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Labels of objects detected in `image` with confidence above `confidence_threshold`
    async fn detect(&self, image: Bytes, confidence_threshold: f64) -> Result<Vec<String>, DetectionError>;
}

/// One object as reported by the vision endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectedObject {
    #[serde(rename = "object")]
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    objects: Vec<DetectedObject>,
}

/// Keep labels whose confidence is strictly greater than the threshold
pub fn labels_above(objects: impl IntoIterator<Item = DetectedObject>, threshold: f64) -> Vec<String> {
    objects
        .into_iter()
        .filter(|obj| obj.confidence > threshold)
        .map(|obj| obj.label)
        .collect()
}

/// Azure Computer Vision client
#[derive(Clone)]
pub struct AzureVisionDetector {
    http: reqwest::Client,
    config: Option<VisionConfig>,
}

impl AzureVisionDetector {
    pub fn new(http: reqwest::Client, config: Option<VisionConfig>) -> Self {
        if config.is_none() {
            warn!("VISION_ENDPOINT/VISION_API_KEY not set; image analysis requests will fail");
        }
        Self { http, config }
    }

    fn analyze_url(endpoint: &str) -> String {
        format!("{}/vision/v3.2/analyze", endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl ObjectDetector for AzureVisionDetector {
    async fn detect(&self, image: Bytes, confidence_threshold: f64) -> Result<Vec<String>, DetectionError> {
        let config = self.config.as_ref().ok_or(DetectionError::NotConfigured)?;

        let response = self
            .http
            .post(Self::analyze_url(&config.endpoint))
            .query(&[("visualFeatures", "Objects")])
            .header("Ocp-Apim-Subscription-Key", &config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectionError::Status { status, body });
        }

        let analysis: AnalyzeResponse = response.json().await?;
        debug!(detected = analysis.objects.len(), "Vision analysis complete");

        Ok(labels_above(analysis.objects, confidence_threshold))
    }
}
