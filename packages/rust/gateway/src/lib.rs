//! Model gateway access for Outreach.
//!
//! A [`Gateway`] performs exactly one chat-completion request and classifies
//! any failure as a [`GatewayError`]. Retrying is layered on top by
//! [`RetryPolicy`], so the two can be tested separately.

mod client;
mod retry;

use std::time::Duration;

use async_trait::async_trait;
use outreach_shared::GatewayError;

pub use client::{GatewaySettings, HttpGateway};
pub use retry::{Attempted, RetryPolicy};

/// Sampling temperature sent with every request.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Completion token cap; reasoning models spend part of it thinking.
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 16_000;

/// Which pipeline stage issued a request. Sent to the gateway as metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Research,
    EmailGeneration,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::EmailGeneration => "email_generation",
        }
    }
}

/// One chat-completion request.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub step: Step,
    pub model_id: String,
    pub system: Option<String>,
    pub prompt: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_completion_tokens: u32,
    pub reasoning_effort: Option<String>,
}

impl GatewayRequest {
    pub fn new(
        step: Step,
        model_id: impl Into<String>,
        prompt: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            step,
            model_id: model_id.into(),
            system: None,
            prompt: prompt.into(),
            timeout,
            temperature: DEFAULT_TEMPERATURE,
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            reasoning_effort: Some("high".into()),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A single, unretried call to a model.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send `request` and return the raw completion text.
    async fn call(&self, request: &GatewayRequest) -> Result<String, GatewayError>;
}
