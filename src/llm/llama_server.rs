//! llama.cpp Server Provider
//!
//! This module implements the TextGenerator trait for a llama.cpp HTTP
//! server, typically running locally at http://localhost:8080. The server
//! keeps per-slot KV-cache state between requests, so `reset()` is a real
//! operation here: it erases slot 0 so a later completion cannot reuse a
//! cached prompt prefix from an unrelated stage.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GenParams, GenerationError, Result, TextGenerator};

/// Request timeout for completion calls
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// llama.cpp server provider
#[derive(Debug, Clone)]
pub struct LlamaServerProvider {
    /// Base URL for the server (typically http://localhost:8080)
    base_url: String,

    /// HTTP client for API requests
    client: Client,
}

impl LlamaServerProvider {
    /// Create a new llama.cpp server provider
    ///
    /// # Arguments
    /// * `base_url` - Base URL for the server (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GenerationError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn map_request_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout
        } else if e.is_connect() {
            GenerationError::Unavailable(format!(
                "Cannot connect to llama.cpp server at {}. Is it running?",
                self.base_url
            ))
        } else {
            GenerationError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl TextGenerator for LlamaServerProvider {
    fn name(&self) -> &str {
        "llama_server"
    }

    async fn complete(&self, prompt: &str, params: &GenParams) -> Result<String> {
        let request = CompletionRequest {
            prompt: prompt.to_string(),
            temperature: params.temperature,
            n_predict: params.max_tokens,
            cache_prompt: false,
        };

        tracing::debug!(
            "llama.cpp request: prompt_chars={}, temperature={}, n_predict={}",
            prompt.len(),
            params.temperature,
            params.max_tokens
        );

        let url = format!("{}/completion", self.base_url);
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        tracing::info!(
            "llama.cpp response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Unavailable(format!(
                "llama.cpp server error ({}): {}",
                status, error_text
            )));
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            GenerationError::Parse(format!("Failed to parse llama.cpp response: {}", e))
        })?;

        Ok(completion.content)
    }

    async fn reset(&self) -> Result<()> {
        let url = format!("{}/slots/0?action=erase", self.base_url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        // Older server builds do not expose the slots endpoint; a 404
        // means there is no slot state to erase.
        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(GenerationError::Unavailable(format!(
                "Slot erase failed ({})",
                response.status()
            )));
        }

        Ok(())
    }
}

/// llama.cpp /completion request format
#[derive(Debug, Serialize)]
struct CompletionRequest {
    prompt: String,
    temperature: f32,
    n_predict: u32,
    cache_prompt: bool,
}

/// llama.cpp /completion response format
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}
