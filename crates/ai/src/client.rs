// Gemini client
//
// Sends a single-turn prompt to the generateContent endpoint and returns
// the text of the first candidate. Blocking; call off the UI thread if
// latency matters.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vizdash_config::{AIConfig, AIProvider};

use crate::error::AnalysisError;

const API_KEY_HEADER: &str = "x-goog-api-key";
const USER_AGENT: &str = concat!("vizdash/", env!("CARGO_PKG_VERSION"));

/// Anything that turns a prompt into model text.
pub trait TextGenerator: Send + Sync {
    fn submit(&self, prompt: &str) -> Result<String, AnalysisError>;

    /// Model name shown next to results
    fn model(&self) -> &str;
}

// ============================================================================
// Gemini API types
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

pub struct GeminiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiClient {
    /// Build a client from resolved configuration. Fails when analysis is
    /// disabled or no key was found.
    pub fn from_config(config: &AIConfig) -> Result<Self, AnalysisError> {
        if config.provider != AIProvider::Gemini {
            return Err(AnalysisError::NotConfigured(format!(
                "provider is '{}'",
                config.provider.name()
            )));
        }
        let key = config
            .require_key()
            .map_err(|e| AnalysisError::NotConfigured(e.to_string()))?;
        Self::new(&config.endpoint, &config.model, key, config.timeout)
    }

    /// `endpoint` is the API base URL, e.g.
    /// "https://generativelanguage.googleapis.com".
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        if api_key.is_empty() {
            return Err(AnalysisError::NotConfigured("API key is empty".to_string()));
        }
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl TextGenerator for GeminiClient {
    fn submit(&self, prompt: &str) -> Result<String, AnalysisError> {
        let url = self.url();
        let request = GenerateRequest {
            contents: vec![RequestContent { parts: vec![RequestPart { text: prompt }] }],
        };

        tracing::debug!(%url, model = %self.model, prompt_chars = prompt.chars().count(), "generateContent");

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| AnalysisError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(status_error(status, &body));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            AnalysisError::Parse(format!("{} (body: {})", e, body.chars().take(200).collect::<String>()))
        })?;

        if let Some(usage) = &parsed.usage_metadata {
            tracing::info!(
                model = %self.model,
                prompt_tokens = ?usage.prompt_token_count,
                output_tokens = ?usage.candidates_token_count,
                "analysis complete"
            );
        }

        extract_text(parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Map a non-success status and its body to an error.
fn status_error(status: u16, body: &str) -> AnalysisError {
    let (message, api_status) = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(e) => (e.error.message, e.error.status),
        Err(_) => (body.chars().take(200).collect(), None),
    };

    // Gemini answers a malformed key with 400 INVALID_ARGUMENT
    let bad_key = status == 400 && body.contains("API_KEY_INVALID");

    match status {
        401 | 403 => AnalysisError::Auth(message),
        _ if bad_key => AnalysisError::Auth(message),
        429 => AnalysisError::Quota(message),
        _ => AnalysisError::Http {
            status,
            message: match api_status {
                Some(s) if !message.is_empty() => format!("{}: {}", s, message),
                Some(s) => s,
                None => message,
            },
        },
    }
}

/// Concatenated text parts of the first candidate.
fn extract_text(response: GenerateResponse) -> Result<String, AnalysisError> {
    let block_reason = response.prompt_feedback.and_then(|f| f.block_reason);

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(match block_reason {
            Some(reason) => AnalysisError::Blocked(reason),
            None => AnalysisError::Empty,
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                AnalysisError::Blocked(reason.to_string())
            }
            _ => AnalysisError::Empty,
        });
    }

    Ok(text)
}
