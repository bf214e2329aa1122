//! Gemini generateContent client
//!
//! Thin client for the external image-fusion call. The orchestrator treats
//! any error from here as a signal to fall back, never as a request failure.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose;
use serde::Deserialize;
use serde_json::json;

use crate::constants::{FUSION_PROMPT, GEMINI_API_BASE, GEMINI_MODEL, GEMINI_TIMEOUT_SECONDS};

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(rename = "inlineData", alias = "inline_data", default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

/// Client for the Gemini image-fusion call.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    api_key: String,
    api_base: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Builds a client with a bounded request timeout.
    pub fn new(api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GEMINI_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            api_key: api_key.to_string(),
            api_base: GEMINI_API_BASE.to_string(),
            client,
        })
    }

    /// Overrides the API base URL. Used by tests to point at an address
    /// that refuses connections.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Sends the fixed fusion prompt plus both images as inline parts and
    /// returns the first inline image from the response, decoded.
    pub async fn fuse_images(
        &self,
        face: &[u8],
        face_mime: &str,
        glasses: &[u8],
        glasses_mime: &str,
    ) -> Result<Vec<u8>> {
        let endpoint = format!(
            "{}/models/{}:generateContent",
            self.api_base, GEMINI_MODEL
        );
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {"text": FUSION_PROMPT},
                    {"inline_data": {
                        "mime_type": face_mime,
                        "data": general_purpose::STANDARD.encode(face),
                    }},
                    {"inline_data": {
                        "mime_type": glasses_mime,
                        "data": general_purpose::STANDARD.encode(glasses),
                    }},
                ],
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
            },
        });

        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("Request to generateContent failed")?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .context("Failed reading generateContent body")?;
        if !status.is_success() {
            return Err(anyhow!(
                "Gemini API error {status}: {}",
                String::from_utf8_lossy(&bytes)
            ));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_slice(&bytes).context("Failed to parse generateContent JSON")?;
        if let Some(err) = parsed.error {
            return Err(anyhow!("Gemini API returned error: {err}"));
        }

        let inline = parsed
            .candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .find_map(|part| part.inline_data.as_ref())
            .ok_or_else(|| anyhow!("Response contained no inline image data"))?;

        general_purpose::STANDARD
            .decode(&inline.data)
            .context("Failed to base64-decode generated image")
    }
}

/// Transport MIME type for an upload, from its normalized extension.
pub fn mime_for_extension(extension: &str) -> &'static str {
    if extension.eq_ignore_ascii_case("png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}
