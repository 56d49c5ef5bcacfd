//! Blocking client for the Gemini `generateContent` REST endpoint.
//!
//! Only the slice of the API needed for image generation is modelled:
//! text and inline-data parts, response modalities, and `imageConfig`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::generation::{
    GenerationRequest, GenerationResponse, ImageGenerationService, ResponsePart,
};

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns; a single user turn here.
    pub contents: Vec<Content>,
    /// Output modalities and image settings.
    pub generation_config: GenerationConfig,
}

/// A content turn holding ordered parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// `user` or `model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Ordered parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One part of a content turn. Exactly one payload field is set in practice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64 media payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    /// Set on intermediate reasoning parts.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub thought: bool,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    fn inline(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: STANDARD.encode(bytes),
            }),
            ..Self::default()
        }
    }
}

/// Base64 inline payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type of the decoded bytes.
    pub mime_type: String,
    /// Standard base64 encoding of the bytes.
    pub data: String,
}

/// Generation settings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Requested output kinds, `TEXT` and `IMAGE`.
    pub response_modalities: Vec<String>,
    /// Aspect ratio and resolution.
    pub image_config: ImageConfig,
}

/// Image output settings, forwarded without local validation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    /// e.g. `16:9`.
    pub aspect_ratio: String,
    /// e.g. `2K`.
    pub image_size: String,
}

/// Top-level `generateContent` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate completions. Absent when the prompt was blocked.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Safety feedback on the prompt.
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// A candidate completion.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content. Missing when generation stopped early.
    #[serde(default)]
    pub content: Option<Content>,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Prompt-level feedback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Set when the prompt was rejected.
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateContentRequest {
    /// Build the wire request for a generation, attaching the reference image
    /// after the prompt when one is present on disk.
    ///
    /// # Errors
    ///
    /// Fails if an existing reference image cannot be read or identified.
    pub fn from_generation(request: &GenerationRequest) -> Result<Self> {
        let mut parts = vec![Part::text(&request.prompt)];
        if let Some(reference) = request.load_reference_image()? {
            log::debug!(
                "Attaching reference image ({}, {} bytes)",
                reference.mime_type,
                reference.data.len()
            );
            parts.push(Part::inline(reference.mime_type, &reference.data));
        }

        Ok(Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
                image_config: ImageConfig {
                    aspect_ratio: request.aspect_ratio.clone(),
                    image_size: request.image_size.clone(),
                },
            },
        })
    }
}

impl GenerateContentResponse {
    /// Flatten the first candidate into ordered [`ResponsePart`]s.
    ///
    /// Inline data that is not valid base64 and reasoning-only images are
    /// skipped.
    #[must_use]
    pub fn into_generation_response(self) -> GenerationResponse {
        let Some(candidate) = self.candidates.into_iter().next() else {
            if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
                log::warn!("Prompt was blocked: {reason}");
            }
            return GenerationResponse::default();
        };
        if let Some(reason) = &candidate.finish_reason {
            log::debug!("Finish reason: {reason}");
        }

        let parts = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| {
                if let Some(text) = part.text {
                    return Some(ResponsePart::Text(text));
                }
                let inline = part.inline_data?;
                if part.thought {
                    log::debug!("Skipping intermediate {} image", inline.mime_type);
                    return None;
                }
                match STANDARD.decode(inline.data.as_bytes()) {
                    Ok(data) => Some(ResponsePart::Image {
                        mime_type: inline.mime_type,
                        data,
                    }),
                    Err(e) => {
                        log::warn!("Skipping undecodable {} part: {e}", inline.mime_type);
                        None
                    }
                }
            })
            .collect();

        GenerationResponse { parts }
    }
}

/// Turn a non-success response body into an [`Error::Api`].
fn api_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                trimmed.chars().take(500).collect()
            }
        });
    Error::Api { status, message }
}

/// Gemini-backed [`ImageGenerationService`].
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
    api_key: String,
}

impl GeminiClient {
    /// Create a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingApiKey`] when no key is configured, or
    /// [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    /// Model this client calls.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

impl ImageGenerationService for GeminiClient {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let body = GenerateContentRequest::from_generation(request)?;
        log::info!("Calling {}", self.config.model);

        let response = self
            .http
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
        Ok(parsed.into_generation_response())
    }
}
