//! Upload validation
//!
//! Checks run in a fixed order and stop at the first failure: presence,
//! extension, size, then (after persisting) structural decodability.

use std::path::Path;

use tracing::debug;

use crate::constants::{ALLOWED_EXTENSIONS, MAX_UPLOAD_BYTES};
use crate::error::GlassifyError;

/// An upload as received from the multipart form, before any checks.
#[derive(Clone, Debug)]
pub struct PendingUpload {
    /// Declared filename, possibly empty.
    pub filename: String,
    /// Raw payload bytes.
    pub bytes: Vec<u8>,
}

/// An upload that passed the presence, extension and size checks.
#[derive(Clone, Debug)]
pub struct ValidUpload {
    /// Lowercased extension from the allowed set.
    pub extension: String,
    /// Raw payload bytes, still unverified as an image.
    pub bytes: Vec<u8>,
}

/// Extracts the lowercased extension if it's in the allowed set.
pub fn extension_if_allowed(filename: &str) -> Option<String> {
    let (_, extension) = filename.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// Validates the face/glasses pair, short-circuiting on the first failure.
pub fn validate_pair(
    face: Option<PendingUpload>,
    glasses: Option<PendingUpload>,
) -> Result<(ValidUpload, ValidUpload), GlassifyError> {
    let (Some(face), Some(glasses)) = (face, glasses) else {
        return Err(GlassifyError::MissingFile);
    };
    if face.filename.is_empty() || glasses.filename.is_empty() {
        return Err(GlassifyError::MissingFile);
    }

    let (Some(face_ext), Some(glasses_ext)) = (
        extension_if_allowed(&face.filename),
        extension_if_allowed(&glasses.filename),
    ) else {
        return Err(GlassifyError::UnsupportedFormat);
    };

    if face.bytes.len() > MAX_UPLOAD_BYTES || glasses.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(GlassifyError::PayloadTooLarge);
    }

    Ok((
        ValidUpload {
            extension: face_ext,
            bytes: face.bytes,
        },
        ValidUpload {
            extension: glasses_ext,
            bytes: glasses.bytes,
        },
    ))
}

/// Structural verification of a persisted upload: reads the header only,
/// not the full pixel data. Callers delete the file on failure.
pub fn verify_image(path: &Path) -> Result<(u32, u32), GlassifyError> {
    let reader = image::ImageReader::open(path)
        .map_err(|err| {
            debug!("Failed to open {} for verification: {}", path.display(), err);
            GlassifyError::CorruptImage
        })?
        .with_guessed_format()
        .map_err(|err| {
            debug!("Failed to sniff format of {}: {}", path.display(), err);
            GlassifyError::CorruptImage
        })?;
    reader.into_dimensions().map_err(|err| {
        debug!("Failed to verify {}: {}", path.display(), err);
        GlassifyError::CorruptImage
    })
}
