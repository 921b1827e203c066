//! Image endpoints (/images, /images/{id})

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;
use crate::domain::images::parse_object_filter;
use crate::models::{AnalyzeImageBody, AnalyzedImage};
use crate::services::error::AppError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/images", get(list_images).post(create_image))
        .route("/images/{id}", get(get_image))
}

/// POST /images - Validate, optionally analyze, store and record an image
async fn create_image(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeImageBody>, JsonRejection>,
) -> Result<Json<AnalyzedImage>, AppError> {
    let Json(body) = body.map_err(|e| AppError::BadBody(e.body_text()))?;
    let image = state.intake.run(body).await?;
    Ok(Json(image))
}

/// GET /images/:id - Fetch one image record
async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<i64>,
) -> Result<Json<AnalyzedImage>, AppError> {
    let record = state.images.get(image_id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(record.into()))
}

#[derive(Deserialize)]
struct ListImagesQuery {
    /// Comma-separated tags; a record must contain all of them
    objects: Option<String>,
}

/// GET /images - List image records, optionally filtered by detected objects
async fn list_images(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListImagesQuery>,
) -> Result<Json<Vec<AnalyzedImage>>, AppError> {
    let filter = parse_object_filter(query.objects.as_deref());
    let records = state.images.list(filter.as_deref()).await?;
    Ok(Json(records.into_iter().map(AnalyzedImage::from).collect()))
}
