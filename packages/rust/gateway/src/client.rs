//! HTTP client for OpenAI-compatible chat-completion gateways.

use async_trait::async_trait;
use outreach_shared::{AppConfig, GatewayError, OutreachError, Result, resolve_api_key};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{Gateway, GatewayRequest};

/// User-Agent string for gateway requests.
const USER_AGENT: &str = concat!("Outreach/", env!("CARGO_PKG_VERSION"));

/// Service name reported in request metadata.
const SERVICE_NAME: &str = "sales_automation";

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Connection settings for [`HttpGateway`].
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Gateway root, e.g. `https://llm-gateway.truefoundry.com`.
    pub base_url: String,
    pub api_key: SecretString,
    /// Ask the gateway to keep its own request log.
    pub enable_request_logging: bool,
}

impl GatewaySettings {
    /// Build settings from config, reading the key from its env var.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(config)?;
        Ok(Self {
            base_url: config.gateway.base_url.clone(),
            api_key: SecretString::from(api_key),
            enable_request_logging: config.gateway.enable_request_logging,
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// HttpGateway
// ---------------------------------------------------------------------------

/// [`Gateway`] backed by `POST {base_url}/chat/completions`.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    logging_header: String,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self> {
        if settings.api_key.expose_secret().trim().is_empty() {
            return Err(OutreachError::config("gateway API key is empty"));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| OutreachError::config(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));
        let logging_header =
            serde_json::json!({ "enabled": settings.enable_request_logging }).to_string();

        Ok(Self {
            client,
            endpoint,
            api_key: settings.api_key,
            logging_header,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    #[instrument(skip_all, fields(step = request.step.as_str(), model = %request.model_id))]
    async fn call(&self, request: &GatewayRequest) -> std::result::Result<String, GatewayError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &request.model_id,
            messages,
            temperature: request.temperature,
            max_completion_tokens: request.max_completion_tokens,
            reasoning_effort: request.reasoning_effort.as_deref(),
        };

        let metadata = serde_json::json!({
            "service": SERVICE_NAME,
            "step": request.step.as_str(),
        })
        .to_string();

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .header("X-TFY-METADATA", metadata)
            .header("X-TFY-LOGGING-CONFIG", &self.logging_header)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e, request))?;

        let status = response.status();
        debug!(status = status.as_u16(), "gateway responded");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        let text = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e, request))?;

        extract_content(&text)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

fn classify_transport_error(err: &reqwest::Error, request: &GatewayRequest) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout {
            seconds: request.timeout.as_secs(),
        }
    } else {
        GatewayError::TransientServerError {
            status: err.status().map_or(0, |s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

fn classify_status(status: StatusCode, body: &str) -> GatewayError {
    let code = status.as_u16();
    let message = truncate(body.trim(), MAX_ERROR_BODY);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::AuthError {
            status: code,
            message,
        },
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            GatewayError::TransientServerError {
                status: code,
                message,
            }
        }
        s if s.is_server_error() => GatewayError::TransientServerError {
            status: code,
            message,
        },
        _ => GatewayError::Rejected {
            status: code,
            message,
        },
    }
}

fn extract_content(body: &str) -> std::result::Result<String, GatewayError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::MalformedResponse {
            message: format!("invalid JSON envelope: {e}"),
        })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GatewayError::MalformedResponse {
            message: "response has no choices[0].message.content".into(),
        })?;

    if content.trim().is_empty() {
        return Err(GatewayError::MalformedResponse {
            message: "completion content is empty".into(),
        });
    }
    Ok(content)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
