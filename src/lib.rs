//! Image intake service: validate an image source, optionally detect objects
//! in it, store the bytes and keep a queryable record.

pub mod config;
pub mod constants;
pub mod domain;
pub mod intake;
pub mod labels;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;

#[cfg(test)]
mod test_utils;

use axum::{Router, extract::DefaultBodyLimit};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use constants::MAX_REQUEST_BODY_SIZE;
use domain::images::ImageRecordStore;
use intake::Intake;

#[derive(Clone)]
pub struct AppState {
    pub intake: Intake,
    pub images: Arc<dyn ImageRecordStore>,
    /// Set when blobs live on local disk and are served from `/media/*`
    pub local_storage_path: Option<PathBuf>,
}

pub fn build_app(state: Arc<AppState>) -> Router {
    routes::build_routes()
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
