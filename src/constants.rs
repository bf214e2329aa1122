//! Shared constants for uploads, compositing and the Gemini API
//!

/// Upload extensions we accept, lowercase.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Maximum size of a single uploaded image (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Maximum size of the whole multipart request body. Large enough that an
/// oversized single file reaches the validator instead of being cut off by
/// axum's body limit.
pub const MAX_REQUEST_BYTES: usize = 32 * 1024 * 1024;

/// Glasses are resized to this fraction of the face width.
pub const GLASSES_WIDTH_RATIO: f64 = 0.6;

/// Glasses are anchored at this fraction of the face height.
pub const GLASSES_TOP_RATIO: f64 = 0.25;

/// JPEG quality for persisted results.
pub const JPEG_QUALITY: u8 = 95;

/// Credential value that means "not configured", same as an absent key.
pub const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Base URL for the Gemini generateContent API.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini model used for image fusion.
pub const GEMINI_MODEL: &str = "gemini-2.5-flash-image";

/// Timeout for the external generation call, in seconds.
pub const GEMINI_TIMEOUT_SECONDS: u64 = 30;

/// Fixed instructional prompt sent with both images.
pub const FUSION_PROMPT: &str = "\
You are an expert in image processing and augmented reality. Your task is to \
create a realistic image combining the face from the first image with the \
glasses from the second image.

Specific instructions:
1. Analyse the position and angle of the face in the first image
2. Place the glasses from the second image naturally on the face
3. Scale the glasses proportionally to the face
4. Keep lighting and shadows consistent
5. Make sure the glasses sit properly on the nose and ears
6. Preserve the quality and resolution of the original face image

Generate a final realistic image showing the person wearing the glasses \
naturally.";

/// URL prefix under which persisted results are served.
pub const RESULT_URL_PREFIX: &str = "/static/images";
