//! Image intake pipeline
//!
//! Runs one `POST /images` request through its stages, strictly in order:
//! 1. Validating - parse the body, gate the source (no side effects)
//! 2. Resolving  - settle on bytes and sniff the image format
//! 3. Detecting  - only when `analyze_image` is set
//! 4. Uploading  - name the blob and upload it
//! 5. Persisting - insert the record
//!
//! The first failing stage ends the run. Nothing is retried and nothing is
//! rolled back: a persistence failure after a successful upload leaves the
//! blob in place.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::domain::images::ImageRecordStore;
use crate::models::{AnalyzeImageBody, AnalyzedImage, NewImageRecord};
use crate::services::detection::ObjectDetector;
use crate::services::resolver::{self, SourceFetchError};
use crate::services::validation::{self, SourceValidator, ValidationError};
use crate::storage::{self, BlobStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Resolving,
    Detecting,
    Uploading,
    Persisting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Resolving => "resolving",
            Stage::Detecting => "detecting",
            Stage::Uploading => "uploading",
            Stage::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    SourceFetch(#[from] SourceFetchError),

    /// An external call failed after validation
    #[error("{stage} stage failed: {source}")]
    Upstream { stage: Stage, source: BoxError },
}

impl IntakeError {
    fn upstream(stage: Stage, source: impl Into<BoxError>) -> IntakeError {
        IntakeError::Upstream {
            stage,
            source: source.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            IntakeError::Validation(_) => Stage::Validating,
            IntakeError::SourceFetch(_) => Stage::Resolving,
            IntakeError::Upstream { stage, .. } => *stage,
        }
    }
}

/// Collaborators and settings shared by every intake run
#[derive(Clone)]
pub struct Intake {
    validator: SourceValidator,
    detector: Arc<dyn ObjectDetector>,
    blobs: Arc<dyn BlobStore>,
    images: Arc<dyn ImageRecordStore>,
    confidence_threshold: f64,
}

impl Intake {
    pub fn new(
        validator: SourceValidator,
        detector: Arc<dyn ObjectDetector>,
        blobs: Arc<dyn BlobStore>,
        images: Arc<dyn ImageRecordStore>,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            validator,
            detector,
            blobs,
            images,
            confidence_threshold,
        }
    }

    pub async fn run(&self, body: AnalyzeImageBody) -> Result<AnalyzedImage, IntakeError> {
        let result = self.run_stages(body).await;
        match &result {
            Ok(image) => info!(
                id = image.id,
                label = %image.label,
                objects = image.objects.len(),
                "Image stored"
            ),
            Err(e @ IntakeError::Upstream { .. }) => error!(stage = %e.stage(), "Image intake failed: {}", e),
            Err(e) => debug!(stage = %e.stage(), "Image rejected: {}", e),
        }
        result
    }

    async fn run_stages(&self, body: AnalyzeImageBody) -> Result<AnalyzedImage, IntakeError> {
        debug!(stage = %Stage::Validating, "Intake stage");
        let request = validation::parse_request(body)?;
        let validated = self.validator.validate(request.source).await?;

        debug!(stage = %Stage::Resolving, "Intake stage");
        let image = resolver::resolve(validated)?;

        let objects = if request.analyze_image {
            debug!(stage = %Stage::Detecting, "Intake stage");
            self.detector
                .detect(image.bytes.clone(), self.confidence_threshold)
                .await
                .map_err(|e| IntakeError::upstream(Stage::Detecting, e))?
        } else {
            Vec::new()
        };

        debug!(stage = %Stage::Uploading, "Intake stage");
        let name = storage::blob_name(image.extension());
        let url = self
            .blobs
            .upload(&name, image.bytes)
            .await
            .map_err(|e| IntakeError::upstream(Stage::Uploading, e))?;

        debug!(stage = %Stage::Persisting, "Intake stage");
        let record = NewImageRecord {
            label: request.label,
            url,
            analyze_image: request.analyze_image,
            objects,
        };
        let id = self
            .images
            .create(&record)
            .await
            .map_err(|e| IntakeError::upstream(Stage::Persisting, e))?;

        Ok(AnalyzedImage {
            id,
            label: record.label,
            url: record.url,
            objects: record.objects,
        })
    }
}
