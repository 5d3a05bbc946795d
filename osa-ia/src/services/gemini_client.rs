//! Google Gemini API client
//!
//! Sends shelf images to the Gemini generateContent endpoint together with
//! the SKU catalog rendered into the detection prompt, and parses the reply
//! into a `DetectionReport`. Requests are rate limited to 1 per second and
//! carry token usage back for cost estimation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::{DetectionReport, SkuEntry};
use crate::services::cost_estimator::TokenUsage;
use crate::services::detection_parser;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const USER_AGENT: &str = "OSA/0.1.0 ( https://github.com/osa-tools/osa )";

/// Minimum interval between API requests (milliseconds)
pub const RATE_LIMIT_MS: u64 = 1000;

const DETECTION_PROMPT: &str = r#"You are analyzing a photo of a retail shelf display.

Below is the list of SKU items that may be present on this shelf. Where
given, FacingTouching is the expected number of product facings placed
side by side, and ShelfNo is the expected shelf position counted from the
bottom shelf upwards, with the bottom shelf as 1.

SKU items:
{sku_items}

Identify which of the listed SKU items are visible in the image. Use the
FacingTouching and ShelfNo hints to resolve products that look alike. Only
report names from the list above; never invent new product names.

Respond with JSON only, without explanations or Markdown fences, in exactly
this format:
{"sku_names": ["<name from the list>", "<name from the list>"]}
"#;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Google API key was rejected")]
    InvalidApiKey,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Gemini API rate limit exceeded, retry later")]
    RateLimited,

    #[error("Gemini API returned {status}: {message}")]
    ApiFailure { status: u16, message: String },

    #[error("Empty response from Gemini API")]
    EmptyResponse,
}

/// Enforces a minimum interval between requests
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Sleep until the minimum interval since the previous request has
    /// passed, then claim the current slot
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(instant) = *last {
            let elapsed = instant.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

/// Result of one detection request
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub report: DetectionReport,
    /// Token counts, absent when the API omitted usage metadata
    pub usage: Option<TokenUsage>,
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    rate_limiter: Arc<RateLimiter>,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, GeminiError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        })
    }

    /// Share a rate limiter across client instances
    ///
    /// Clients are rebuilt per request because the key and model live in
    /// settings; the shared limiter is what keeps the 1 req/s cadence
    /// across requests.
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Detect catalog products in a shelf image
    ///
    /// `mime_type` must be the sniffed type of `image`, not a caller claim.
    ///
    /// # Errors
    ///
    /// Network and API-level failures are returned as errors. A reply that
    /// arrives but cannot be parsed is NOT an error: it becomes a fallback
    /// report inside the outcome.
    pub async fn detect_products(
        &self,
        image: &[u8],
        mime_type: &str,
        catalog: &[SkuEntry],
    ) -> Result<DetectionOutcome, GeminiError> {
        self.rate_limiter.wait().await;

        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: render_detection_prompt(catalog),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: BASE64.encode(image),
                        },
                    },
                ],
            }],
        };

        debug!(
            model = %self.model,
            image_bytes = image.len(),
            catalog_items = catalog.len(),
            "Sending detection request"
        );

        let response = self.send_generate(&request).await?;
        let GenerateContentResponse {
            candidates,
            usage_metadata,
        } = response;

        let usage = usage_metadata.map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        });

        let text = extract_text(candidates).ok_or(GeminiError::EmptyResponse)?;
        let report = detection_parser::parse_detection(&text);

        info!(
            items = report.total_items_detected,
            parse_failed = report.error.is_some(),
            "Detection response received"
        );

        Ok(DetectionOutcome { report, usage })
    }

    /// Probe whether the configured key is accepted by the API
    ///
    /// Sends a minimal text-only request; any non-success reply (or
    /// network failure) counts as invalid.
    pub async fn validate_api_key(&self) -> bool {
        self.rate_limiter.wait().await;
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart::Text {
                    text: "Reply with the word OK.".to_string(),
                }],
            }],
        };
        match self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            GEMINI_BASE_URL, self.model
        )
    }

    async fn send_generate(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GeminiError::InvalidApiKey),
            StatusCode::NOT_FOUND => Err(GeminiError::ModelNotFound(self.model.clone())),
            StatusCode::TOO_MANY_REQUESTS => Err(GeminiError::RateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                // Key rejections surface as 400 INVALID_ARGUMENT
                if body.contains("API key not valid") {
                    return Err(GeminiError::InvalidApiKey);
                }
                let message: String = body.chars().take(300).collect();
                Err(GeminiError::ApiFailure {
                    status: status.as_u16(),
                    message,
                })
            }
            _ => Ok(response.json().await?),
        }
    }
}

/// Concatenated text parts of the first candidate, if any
fn extract_text(candidates: Vec<Candidate>) -> Option<String> {
    let content = candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Render the detection prompt with the catalog as a bullet list
///
/// `code`, `facing_touching`, and `shelf_no` are appended as a
/// parenthetical when present so the prompt's hint wording has data to
/// refer to.
pub fn render_detection_prompt(catalog: &[SkuEntry]) -> String {
    let mut lines = Vec::with_capacity(catalog.len());
    for entry in catalog {
        let mut hints = Vec::new();
        if let Some(code) = &entry.code {
            hints.push(format!("code: {code}"));
        }
        if let Some(facing) = entry.facing_touching {
            hints.push(format!("FacingTouching: {facing}"));
        }
        if let Some(shelf) = entry.shelf_no {
            hints.push(format!("ShelfNo: {shelf}"));
        }
        if hints.is_empty() {
            lines.push(format!("- {}", entry.name));
        } else {
            lines.push(format!("- {} ({})", entry.name, hints.join(", ")));
        }
    }
    DETECTION_PROMPT.replace("{sku_items}", &lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_renders_catalog_with_hints() {
        let catalog = vec![
            SkuEntry {
                name: "Coca-Cola bottles".to_string(),
                code: Some("C-01".to_string()),
                facing_touching: Some(4),
                shelf_no: Some(2),
            },
            SkuEntry::named("Water bottles"),
        ];
        let prompt = render_detection_prompt(&catalog);
        assert!(prompt.contains("- Coca-Cola bottles (code: C-01, FacingTouching: 4, ShelfNo: 2)"));
        assert!(prompt.contains("- Water bottles\n"));
        assert!(prompt.contains("\"sku_names\""));
        assert!(!prompt.contains("{sku_items}"));
    }

    #[test]
    fn test_request_body_wire_shape() {
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: "prompt".to_string(),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: "AAAA".to_string(),
                        },
                    },
                ],
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(
            value["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(value["contents"][0]["parts"][1]["inlineData"]["data"], "AAAA");
    }

    #[test]
    fn test_response_deserializes_camel_case() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"sku_names\": [\"Cola\"]}"}]}}
            ],
            "usageMetadata": {
                "promptTokenCount": 1200,
                "candidatesTokenCount": 40,
                "totalTokenCount": 1240
            }
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let usage = response.usage_metadata.as_ref().unwrap();
        assert_eq!(usage.prompt_token_count, 1200);
        assert_eq!(usage.candidates_token_count, 40);
        let text = extract_text(response.candidates).unwrap();
        assert!(text.contains("sku_names"));
    }

    #[test]
    fn test_extract_text_handles_empty_candidates() {
        assert!(extract_text(Vec::new()).is_none());

        let blank: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "   "}]}}]}"#,
        )
        .unwrap();
        assert!(extract_text(blank.candidates).is_none());
    }

    #[tokio::test]
    async fn test_rate_limiter_enforces_interval() {
        let limiter = RateLimiter::new(30);
        limiter.wait().await;
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
