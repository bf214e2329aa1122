//! Generation cascade
//!
//! Strict fallback order, each state reached only when the previous one is
//! unavailable or fails: external Gemini call, deterministic compositing,
//! byte-copy of the face image. No state is retried; the cascade runs at
//! most once straight through per request.

use std::path::Path;

use anyhow::{Context, anyhow};
use tracing::{info, warn};

use crate::compositor;
use crate::config::AppConfig;
use crate::error::GlassifyError;
use crate::gemini::{GeminiClient, mime_for_extension};
use crate::store::ImageStore;

/// Which cascade state produced the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The external generative call succeeded.
    External,
    /// The deterministic compositor produced the result.
    Composited,
    /// The face image was copied verbatim.
    Copied,
}

impl GenerationOutcome {
    /// The status string reported to the caller. Fallback results are
    /// "simulation"; why a fallback happened is logged, never surfaced.
    pub fn api_status(self) -> &'static str {
        match self {
            GenerationOutcome::External => "real",
            GenerationOutcome::Composited | GenerationOutcome::Copied => "simulation",
        }
    }
}

/// Runs the generation cascade for one request.
#[derive(Clone, Debug)]
pub struct Generator {
    client: Option<GeminiClient>,
}

impl Generator {
    /// Builds a generator from the process configuration. Without a usable
    /// API key the external state is skipped entirely.
    pub fn new(config: &AppConfig) -> Result<Self, GlassifyError> {
        let client = match config.usable_api_key() {
            Some(key) => Some(
                GeminiClient::new(key)
                    .map_err(|err| GlassifyError::InternalServerError(err.to_string()))?,
            ),
            None => None,
        };
        Ok(Self { client })
    }

    /// Builds a generator around an explicit client, or none at all.
    pub fn from_client(client: Option<GeminiClient>) -> Self {
        Self { client }
    }

    /// Produces a result image for the persisted face/glasses pair.
    /// Returns the result filename and which state produced it.
    pub async fn generate(
        &self,
        store: &ImageStore,
        face_path: &Path,
        glasses_path: &Path,
    ) -> Result<(String, GenerationOutcome), GlassifyError> {
        if let Some(client) = &self.client {
            match try_external(client, store, face_path, glasses_path).await {
                Ok(filename) => return Ok((filename, GenerationOutcome::External)),
                Err(err) => {
                    warn!("External generation failed, falling back to compositing: {err:?}");
                }
            }
        } else {
            info!("No API key configured, using simulation mode");
        }

        match compositor::composite_to_store(store, face_path, glasses_path).await {
            Ok(filename) => return Ok((filename, GenerationOutcome::Composited)),
            Err(err) => {
                warn!("Compositing failed, falling back to copying the face image: {err:?}");
            }
        }

        let filename = copy_face(store, face_path).await?;
        Ok((filename, GenerationOutcome::Copied))
    }
}

/// Runs the external state, folding every failure into the
/// `ExternalService` classification the cascade swallows.
async fn try_external(
    client: &GeminiClient,
    store: &ImageStore,
    face_path: &Path,
    glasses_path: &Path,
) -> Result<String, GlassifyError> {
    external_generation(client, store, face_path, glasses_path)
        .await
        .map_err(|err| GlassifyError::ExternalService(format!("{err:#}")))
}

async fn external_generation(
    client: &GeminiClient,
    store: &ImageStore,
    face_path: &Path,
    glasses_path: &Path,
) -> anyhow::Result<String> {
    let face_bytes = tokio::fs::read(face_path)
        .await
        .context("Failed to read face image")?;
    let glasses_bytes = tokio::fs::read(glasses_path)
        .await
        .context("Failed to read glasses image")?;

    let generated = client
        .fuse_images(
            &face_bytes,
            mime_for_path(face_path),
            &glasses_bytes,
            mime_for_path(glasses_path),
        )
        .await?;

    // Re-encode whatever came back as quality-95 JPEG.
    let decoded = image::load_from_memory(&generated)
        .context("Generated bytes are not a decodable image")?;
    let encoded =
        compositor::encode_jpeg(&decoded.to_rgb8()).map_err(|err| anyhow!("{err:?}"))?;

    let (result_path, filename) = store.fresh_result_path("jpg");
    tokio::fs::write(&result_path, encoded)
        .await
        .context("Failed to persist generated image")?;
    Ok(filename)
}

/// Last-resort fallback: byte-copy of the face file under a fresh result
/// name. The only cascade state whose failure surfaces to the caller.
async fn copy_face(store: &ImageStore, face_path: &Path) -> Result<String, GlassifyError> {
    let (result_path, filename) = store.fresh_result_path("jpg");
    tokio::fs::copy(face_path, &result_path)
        .await
        .map_err(|err| GlassifyError::GenerationFailed(err.to_string()))?;
    Ok(filename)
}

fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    mime_for_extension(extension)
}
