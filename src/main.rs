use google_cloud_storage::client::Storage;
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use image_analysis_api::config::{Config, StorageConfig};
use image_analysis_api::domain::images::PgImageStore;
use image_analysis_api::intake::Intake;
use image_analysis_api::services::detection::AzureVisionDetector;
use image_analysis_api::services::validation::SourceValidator;
use image_analysis_api::storage::{BlobStore, GcsBlobStore, LocalBlobStore};
use image_analysis_api::{AppState, build_app};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {}", e));

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .expect("Failed to build HTTP client");

    let (blobs, local_storage_path): (Arc<dyn BlobStore>, Option<PathBuf>) = match &config.storage {
        StorageConfig::Local {
            path,
            public_base_url,
        } => {
            info!("Using local storage at {}", path.display());
            (
                Arc::new(LocalBlobStore::new(path.clone(), public_base_url.clone())),
                Some(path.clone()),
            )
        }
        StorageConfig::Gcs { bucket } => {
            // GCS client uses GOOGLE_APPLICATION_CREDENTIALS env var
            let gcs = Storage::builder()
                .build()
                .await
                .expect("Failed to create GCS client");
            info!("Using GCS bucket {}", bucket);
            (Arc::new(GcsBlobStore::new(gcs, bucket.clone())), None)
        }
    };

    let images = Arc::new(PgImageStore::new(pool));
    let detector = Arc::new(AzureVisionDetector::new(http.clone(), config.vision.clone()));

    let intake = Intake::new(
        SourceValidator::new(http),
        detector,
        blobs,
        images.clone(),
        config.confidence_threshold,
    );

    let state = Arc::new(AppState {
        intake,
        images,
        local_storage_path,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", addr, e));

    info!("Listening on http://{}", addr);
    axum::serve(listener, build_app(state))
        .await
        .expect("Server failed");
}
