//! Google Cloud Vision backend
//!
//! Sends the image to `images:annotate` with `DOCUMENT_TEXT_DETECTION` and
//! returns the aggregated full-text annotation.

use crate::config::Config;
use crate::engine::{ImageStream, TextExtractor};
use crate::error::OcrError;
use crate::raster;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use ureq::Agent;

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

const FEATURE_DOCUMENT_TEXT: &str = "DOCUMENT_TEXT_DETECTION";

pub struct CloudBackend {
    api_key: Option<String>,
    endpoint: String,
}

impl CloudBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.cloud.api_key.clone(),
            endpoint: config.cloud.endpoint.clone(),
        }
    }
}

impl TextExtractor for CloudBackend {
    fn name(&self) -> &'static str {
        "cloud"
    }

    fn extract(&self, image: ImageStream<'_>) -> Result<String, OcrError> {
        // Released when `client` goes out of scope, on every return path
        let client = VisionClient::connect(self.api_key.as_deref(), &self.endpoint)?;

        let image = VisionImage::from_bytes(&image.into_bytes()?)?;
        client.detect_document_text(&image)
    }
}

/// Image in the form the annotate API takes it
struct VisionImage {
    content: String,
}

impl VisionImage {
    fn from_bytes(bytes: &[u8]) -> Result<Self, OcrError> {
        let (format, (width, height)) = raster::probe(bytes)?;
        tracing::debug!(
            ?format,
            width,
            height,
            bytes = bytes.len(),
            "Prepared image for Cloud Vision"
        );

        Ok(Self {
            content: STANDARD.encode(bytes),
        })
    }
}

/// HTTP client bound to one endpoint and API key
struct VisionClient {
    agent: Agent,
    endpoint: String,
    api_key: String,
}

impl VisionClient {
    fn connect(api_key: Option<&str>, endpoint: &str) -> Result<Self, OcrError> {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self::with_agent(agent, api_key, endpoint)
    }

    fn with_agent(agent: Agent, api_key: Option<&str>, endpoint: &str) -> Result<Self, OcrError> {
        let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            OcrError::ClientInit(
                "Cloud Vision API key missing (set --api-key or WQH_API_KEY)".to_string(),
            )
        })?;

        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(OcrError::ClientInit(format!(
                "Invalid Cloud Vision endpoint: {}",
                endpoint
            )));
        }

        tracing::debug!(endpoint, "Opened Cloud Vision client");

        Ok(Self {
            agent,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn detect_document_text(&self, image: &VisionImage) -> Result<String, OcrError> {
        let request = AnnotateRequest {
            requests: [AnnotateImageRequest {
                image: ImageContent {
                    content: &image.content,
                },
                features: [Feature {
                    kind: FEATURE_DOCUMENT_TEXT,
                }],
            }],
        };

        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.as_str())
            .send_json(&request)
            .map_err(|e| OcrError::Backend(format!("Cloud Vision request failed: {}", e)))?;

        let status = response.status();
        let body = response.body_mut().read_to_string().map_err(|e| {
            OcrError::Backend(format!("Failed to read Cloud Vision response: {}", e))
        })?;

        if !status.is_success() {
            return Err(OcrError::Backend(describe_http_error(status.as_u16(), &body)));
        }

        parse_annotate_response(&body)
    }
}

impl Drop for VisionClient {
    fn drop(&mut self) {
        tracing::debug!(endpoint = %self.endpoint, "Closing Cloud Vision client");
    }
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: [AnnotateImageRequest<'a>; 1],
}

#[derive(Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent<'a>,
    features: [Feature; 1],
}

#[derive(Serialize)]
struct ImageContent<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

/// Pull the document text out of an annotate response body
///
/// A response without `fullTextAnnotation` means no text was found.
fn parse_annotate_response(body: &str) -> Result<String, OcrError> {
    let parsed: AnnotateResponse = serde_json::from_str(body)
        .map_err(|e| OcrError::Backend(format!("Malformed Cloud Vision response: {}", e)))?;

    let Some(first) = parsed.responses.into_iter().next() else {
        return Ok(String::new());
    };

    if let Some(status) = first.error {
        return Err(OcrError::Backend(format!(
            "Cloud Vision error {}: {}",
            status.code, status.message
        )));
    }

    Ok(first
        .full_text_annotation
        .map(|annotation| annotation.text)
        .unwrap_or_default())
}

fn describe_http_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!(
            "Cloud Vision returned HTTP {}: {}",
            status, envelope.error.message
        ),
        Err(_) => format!("Cloud Vision returned HTTP {}", status),
    }
}
