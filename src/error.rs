//! Error handling

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::{error, info};

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// User-facing description of what went wrong.
    pub error: String,
}

/// Definitions for the glassify application.
#[derive(Debug)]
pub enum GlassifyError {
    /// An upload slot was absent or had an empty filename
    MissingFile,
    /// An uploaded filename had a disallowed extension
    UnsupportedFormat,
    /// An uploaded file exceeded the per-file size limit
    PayloadTooLarge,
    /// A persisted upload was not a decodable image
    CorruptImage,
    /// The deterministic compositor failed; recovered by the copy fallback
    /// and never shown to the caller
    CompositingFailed(String),
    /// The external generation call failed; recovered by the compositor
    /// and never shown to the caller
    ExternalService(String),
    /// The copy fallback itself failed, nothing left to try
    GenerationFailed(String),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl From<std::io::Error> for GlassifyError {
    fn from(err: std::io::Error) -> Self {
        GlassifyError::InternalServerError(err.to_string())
    }
}

impl From<axum::http::Error> for GlassifyError {
    fn from(err: axum::http::Error) -> Self {
        GlassifyError::InternalServerError(err.to_string())
    }
}

fn json_error(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for GlassifyError {
    fn into_response(self) -> axum::response::Response {
        match self {
            GlassifyError::MissingFile => {
                info!("Upload rejected: missing file");
                json_error(
                    StatusCode::BAD_REQUEST,
                    "Files not found. Please select a face photo and a glasses photo.",
                )
            }
            GlassifyError::UnsupportedFormat => {
                info!("Upload rejected: unsupported format");
                json_error(
                    StatusCode::BAD_REQUEST,
                    "File format not allowed. Use PNG, JPG or JPEG only.",
                )
            }
            GlassifyError::PayloadTooLarge => {
                info!("Upload rejected: payload too large");
                json_error(
                    StatusCode::BAD_REQUEST,
                    "File too large. Maximum size: 10MB per image.",
                )
            }
            GlassifyError::CorruptImage => {
                info!("Upload rejected: corrupt image");
                json_error(
                    StatusCode::BAD_REQUEST,
                    "Invalid or corrupted image files.",
                )
            }
            // The cascade swallows these two; reaching here is a bug, so log
            // the detail and keep the body generic.
            GlassifyError::CompositingFailed(message) => {
                error!("Unrecovered compositing error: {}", message);
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate the image. Please try again.",
                )
            }
            GlassifyError::ExternalService(message) => {
                error!("Unrecovered external service error: {}", message);
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate the image. Please try again.",
                )
            }
            GlassifyError::GenerationFailed(message) => {
                error!("Generation failed beyond recovery: {}", message);
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate the image. Please try again.",
                )
            }
            GlassifyError::InternalServerError(message) => {
                error!("Internal server error: {}", message);
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error. Please try again later.",
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        for err in [
            GlassifyError::MissingFile,
            GlassifyError::UnsupportedFormat,
            GlassifyError::PayloadTooLarge,
            GlassifyError::CorruptImage,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn generation_errors_map_to_500() {
        for err in [
            GlassifyError::CompositingFailed("boom".to_string()),
            GlassifyError::ExternalService("boom".to_string()),
            GlassifyError::GenerationFailed("boom".to_string()),
            GlassifyError::InternalServerError("boom".to_string()),
        ] {
            assert_eq!(
                err.into_response().status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }
}
