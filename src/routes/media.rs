//! Serves blobs written by the local storage backend (/media/*)

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use image::ImageFormat;
use std::io::ErrorKind;
use std::sync::Arc;

use crate::AppState;
use crate::services::error::LogErr;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/media/{name}", get(serve_media))
}

/// Blob names are flat `image-<uuid>.<ext>` files directly under the storage root
fn is_blob_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

fn content_type_for(name: &str) -> &'static str {
    std::path::Path::new(name)
        .extension()
        .and_then(ImageFormat::from_extension)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// GET /media/:name - Serve a locally stored image
async fn serve_media(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let root = state
        .local_storage_path
        .as_ref()
        .ok_or(StatusCode::NOT_FOUND)?;

    if !is_blob_name(&name) {
        return Err(StatusCode::FORBIDDEN);
    }

    let bytes = match tokio::fs::read(root.join(&name)).await {
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(StatusCode::NOT_FOUND),
        result => result.log_500("Failed to read stored image")?,
    };

    // Every upload gets a fresh name, so stored bytes never change
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&name)),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        bytes,
    ))
}
