//! HTTP surface: upload form, generate endpoint, static result serving

use std::num::NonZeroU16;
use std::path::Path;
use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::constants::{MAX_REQUEST_BYTES, RESULT_URL_PREFIX};
use crate::error::GlassifyError;
use crate::generation::Generator;
use crate::store::{ImageRole, ImageStore};
use crate::validate::{self, PendingUpload};

mod views;

use views::IndexTemplate;

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    store: ImageStore,
    generator: Arc<Generator>,
}

impl AppState {
    fn new(config: &AppConfig, store: ImageStore) -> Result<Self, GlassifyError> {
        Ok(Self {
            store,
            generator: Arc::new(Generator::new(config)?),
        })
    }
}

/// Success body for `POST /generate`.
#[derive(Debug, Serialize)]
pub(crate) struct GenerateResponse {
    result_image: String,
    api_status: String,
    message: String,
}

async fn index_handler() -> IndexTemplate {
    IndexTemplate
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

/// A body that blows the request size limit is still an oversized payload
/// from the client's point of view, not a server fault.
fn multipart_error(err: MultipartError) -> GlassifyError {
    if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        GlassifyError::PayloadTooLarge
    } else {
        GlassifyError::InternalServerError(err.to_string())
    }
}

async fn read_upload(field: axum::extract::multipart::Field<'_>) -> Result<PendingUpload, GlassifyError> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let bytes = field.bytes().await.map_err(multipart_error)?;
    Ok(PendingUpload {
        filename,
        bytes: bytes.to_vec(),
    })
}

async fn generate_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, GlassifyError> {
    let mut face: Option<PendingUpload> = None;
    let mut glasses: Option<PendingUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "face" => face = Some(read_upload(field).await?),
            "glasses" => glasses = Some(read_upload(field).await?),
            _ => {}
        }
    }

    let (face, glasses) = validate::validate_pair(face, glasses)?;

    let (face_path, _) = state
        .store
        .save(ImageRole::Face, &face.extension, &face.bytes)
        .await?;
    let (glasses_path, _) = state
        .store
        .save(ImageRole::Glasses, &glasses.extension, &glasses.bytes)
        .await?;

    let verified =
        validate::verify_image(&face_path).and_then(|_| validate::verify_image(&glasses_path));
    if let Err(err) = verified {
        // No orphaned files after a corrupt upload.
        for path in [&face_path, &glasses_path] {
            if let Err(cleanup) = ImageStore::remove_if_exists(path).await {
                error!("Failed to clean up {}: {:?}", path.display(), cleanup);
            }
        }
        return Err(err);
    }

    let (filename, outcome) = state
        .generator
        .generate(&state.store, &face_path, &glasses_path)
        .await?;
    info!("Generated {} ({})", filename, outcome.api_status());

    Ok(Json(GenerateResponse {
        result_image: format!("{RESULT_URL_PREFIX}/{filename}"),
        api_status: outcome.api_status().to_string(),
        message: "Image generated successfully!".to_string(),
    }))
}

fn create_router(results_dir: &Path) -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(index_handler))
        .route("/static/styles.css", axum::routing::get(styles_handler))
        .route("/generate", axum::routing::post(generate_handler))
        .nest_service(RESULT_URL_PREFIX, ServeDir::new(results_dir))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
}

/// Builds the application state and serves it on the given address.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    config: AppConfig,
    store: ImageStore,
) -> Result<(), anyhow::Error> {
    let results_dir = store.dir_for(ImageRole::Result).to_path_buf();
    let state =
        AppState::new(&config, store).map_err(|err| anyhow::anyhow!("{err:?}"))?;
    let app = create_router(&results_dir).with_state(state);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
    Ok(())
}
