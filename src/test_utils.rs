//! In-memory collaborators and fixtures for tests.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum_test::TestServer;
use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};

use crate::domain::images::ImageRecordStore;
use crate::intake::Intake;
use crate::models::{ImageRecord, NewImageRecord};
use crate::services::detection::{DetectedObject, DetectionError, ObjectDetector, labels_above};
use crate::services::validation::SourceValidator;
use crate::storage::{BlobStore, StorageError};
use crate::{AppState, build_app};

fn encode_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([180, 90, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_image(width, height, ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_image(width, height, ImageFormat::Jpeg)
}

/// Base64 PNG, ready for `image_data`
pub fn encoded_png(width: u32, height: u32) -> String {
    STANDARD.encode(png_bytes(width, height))
}

/// True if `objects` contains every tag in `filter`, as `@>` does in Postgres
pub fn contains_all(objects: &[String], filter: &[String]) -> bool {
    filter.iter().all(|tag| objects.contains(tag))
}

/// Record store backed by a Vec; ids start at 1 and only grow
#[derive(Default)]
pub struct MemoryImageStore {
    records: Mutex<Vec<ImageRecord>>,
}

#[async_trait]
impl ImageRecordStore for MemoryImageStore {
    async fn create(&self, image: &NewImageRecord) -> Result<i64, sqlx::Error> {
        let mut records = self.records.lock().unwrap();
        let id = records.len() as i64 + 1;
        records.push(ImageRecord {
            id,
            label: image.label.clone(),
            url: image.url.clone(),
            analyze_image: image.analyze_image,
            objects: image.objects.clone(),
        });
        Ok(id)
    }

    async fn get(&self, image_id: i64) -> Result<Option<ImageRecord>, sqlx::Error> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().find(|r| r.id == image_id).cloned())
    }

    async fn list(&self, objects: Option<&[String]>) -> Result<Vec<ImageRecord>, sqlx::Error> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| objects.is_none_or(|filter| contains_all(&r.objects, filter)))
            .cloned()
            .collect())
    }
}

/// Detector returning a fixed set of scored objects, filtered like the real one
pub struct FakeDetector {
    objects: Option<Vec<DetectedObject>>,
    calls: AtomicUsize,
}

impl FakeDetector {
    pub fn with_objects(objects: &[(&str, f64)]) -> Self {
        Self {
            objects: Some(
                objects
                    .iter()
                    .map(|(label, confidence)| DetectedObject {
                        label: label.to_string(),
                        confidence: *confidence,
                    })
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails as an unconfigured endpoint would
    pub fn failing() -> Self {
        Self {
            objects: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectDetector for FakeDetector {
    async fn detect(&self, _image: Bytes, confidence_threshold: f64) -> Result<Vec<String>, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.clone().ok_or(DetectionError::NotConfigured)?;
        Ok(labels_above(objects, confidence_threshold))
    }
}

/// Blob store that keeps uploads in memory and hands out `memory://` URLs
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<Vec<(String, Bytes)>>,
}

impl MemoryBlobStore {
    pub fn uploads(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, name: &str, data: Bytes) -> Result<String, StorageError> {
        self.blobs.lock().unwrap().push((name.to_string(), data));
        Ok(format!("memory://images/{}", name))
    }
}

pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn upload(&self, _name: &str, _data: Bytes) -> Result<String, StorageError> {
        Err(StorageError::Gcs("bucket unavailable".to_string()))
    }
}

/// Handles onto the fakes behind a test server
pub struct TestApp {
    pub server: TestServer,
    pub detector: Arc<FakeDetector>,
    pub blobs: Arc<MemoryBlobStore>,
    pub images: Arc<MemoryImageStore>,
}

pub fn create_test_app(detector: FakeDetector) -> TestApp {
    create_test_app_with_storage(detector, None)
}

/// Like [`create_test_app`], with `/media/*` serving from `local_storage_path`
pub fn create_test_app_with_storage(detector: FakeDetector, local_storage_path: Option<PathBuf>) -> TestApp {
    let detector = Arc::new(detector);
    let blobs = Arc::new(MemoryBlobStore::default());
    let images = Arc::new(MemoryImageStore::default());

    let intake = Intake::new(
        SourceValidator::new(reqwest::Client::new()),
        detector.clone(),
        blobs.clone(),
        images.clone(),
        0.5,
    );
    let state = Arc::new(AppState {
        intake,
        images: images.clone(),
        local_storage_path,
    });

    TestApp {
        server: TestServer::new(build_app(state)).unwrap(),
        detector,
        blobs,
        images,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_containment_not_overlap() {
        let record = tags(&["cat", "animal"]);
        assert!(contains_all(&record, &tags(&["cat"])));
        assert!(contains_all(&record, &tags(&["animal", "cat"])));
        assert!(!contains_all(&record, &tags(&["cat", "dog"])));
        assert!(!contains_all(&tags(&["dog"]), &tags(&["cat"])));
        assert!(contains_all(&record, &[]));
    }
}
