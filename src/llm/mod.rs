//! Text-Generation Provider Abstraction Layer
//!
//! This module provides a common interface for the text-generation backends
//! the pipeline stages consume (llama.cpp server, Ollama). The
//! [`TextGenerator`] trait defines the contract — prompt in, text out, with
//! tunable temperature and length — and an explicit `reset` operation for
//! backends that keep sampling state between calls.
//!
//! Stages never call a generator directly; they open a [`GenSession`],
//! which resets the backend on acquire and on release so unrelated
//! completions cannot bleed context into each other.

use async_trait::async_trait;

pub mod llama_server;
pub mod ollama;

pub use llama_server::LlamaServerProvider;
pub use ollama::OllamaProvider;

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors that can occur during text generation
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Sampling parameters for a single completion call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenParams {
    /// Sampling temperature
    pub temperature: f32,

    /// Maximum number of tokens to generate
    pub max_tokens: u32,
}

impl GenParams {
    /// Create new generation parameters
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// Text-generation backend trait that all providers must implement
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the name of the provider (e.g., "llama_server", "ollama")
    fn name(&self) -> &str;

    /// Generate a completion for the given prompt
    ///
    /// # Arguments
    /// * `prompt` - Fully rendered prompt text
    /// * `params` - Sampling parameters for this call
    ///
    /// # Returns
    /// * `Ok(String)` - Raw generated text (unscrubbed)
    /// * `Err(GenerationError)` - If the backend fails to respond
    async fn complete(&self, prompt: &str, params: &GenParams) -> Result<String>;

    /// Reset any sampling or context state held by the backend.
    ///
    /// Stateless HTTP backends may leave this as the default no-op.
    async fn reset(&self) -> Result<()> {
        Ok(())
    }
}

/// A scoped generation session.
///
/// The backend is reset when the session begins and again when it
/// finishes, so completions made inside one session cannot observe
/// state left behind by another. Every pipeline stage opens its own
/// session.
pub struct GenSession<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> GenSession<'a> {
    /// Open a session, resetting the backend first.
    pub async fn begin(generator: &'a dyn TextGenerator) -> Result<GenSession<'a>> {
        generator.reset().await?;
        Ok(Self { generator })
    }

    /// Run one completion inside the session and scrub framework
    /// artifacts from the output.
    pub async fn complete(&self, prompt: &str, params: &GenParams) -> Result<String> {
        let raw = self.generator.complete(prompt, params).await?;
        Ok(scrub_artifacts(&raw))
    }

    /// Close the session, resetting the backend again.
    ///
    /// Must be called explicitly; `reset` is async and cannot run in Drop.
    pub async fn finish(self) -> Result<()> {
        self.generator.reset().await
    }
}

/// Strip generation-framework artifacts from raw completion text.
///
/// Handles instruction-close markers (`[/INST]`), triple-quote fences,
/// markdown code fences (with or without a language tag), and surrounding
/// quote characters. The result is trimmed.
pub fn scrub_artifacts(raw: &str) -> String {
    let mut text = raw.replace("[/INST]", "").replace("'''", "");

    // Markdown fences: drop the fence lines, keep the body
    if text.contains("```") {
        text = text
            .lines()
            .filter(|line| !line.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n");
        // Inline fences that share a line with content
        text = text.replace("```", "");
    }

    let trimmed = text.trim();

    // Surrounding quotes left by the model around the whole payload
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| {
            trimmed
                .strip_prefix('`')
                .and_then(|s| s.strip_suffix('`'))
        })
        .unwrap_or(trimmed);

    unquoted.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_params_creation() {
        let params = GenParams::new(0.5, 100);
        assert_eq!(params.temperature, 0.5);
        assert_eq!(params.max_tokens, 100);
    }

    #[test]
    fn test_scrub_inst_marker() {
        let raw = "select * from contacts [/INST]";
        assert_eq!(scrub_artifacts(raw), "select * from contacts");
    }

    #[test]
    fn test_scrub_triple_quotes() {
        let raw = "'''select id from contacts'''";
        assert_eq!(scrub_artifacts(raw), "select id from contacts");
    }

    #[test]
    fn test_scrub_code_fence_with_language_tag() {
        let raw = "```sql\nselect id from contacts\n```";
        assert_eq!(scrub_artifacts(raw), "select id from contacts");
    }

    #[test]
    fn test_scrub_fence_with_trailing_prose() {
        let raw = "```sql\nselect id from contacts\n```\nThis query lists ids.";
        let scrubbed = scrub_artifacts(raw);
        assert!(scrubbed.starts_with("select id from contacts"));
        assert!(!scrubbed.contains("```"));
    }

    #[test]
    fn test_scrub_surrounding_quotes() {
        let raw = "\"select id from contacts\"";
        assert_eq!(scrub_artifacts(raw), "select id from contacts");
    }

    #[test]
    fn test_scrub_plain_text_unchanged() {
        let raw = "  All contacts are friendly.  ";
        assert_eq!(scrub_artifacts(raw), "All contacts are friendly.");
    }

    struct CountingGenerator {
        resets: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        fn name(&self) -> &str {
            "counting"
        }

        async fn complete(&self, _prompt: &str, _params: &GenParams) -> Result<String> {
            Ok("'''ok'''".to_string())
        }

        async fn reset(&self) -> Result<()> {
            self.resets
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_session_resets_on_begin_and_finish() {
        let generator = CountingGenerator {
            resets: std::sync::atomic::AtomicUsize::new(0),
        };

        let session = GenSession::begin(&generator).await.unwrap();
        assert_eq!(generator.resets.load(std::sync::atomic::Ordering::SeqCst), 1);

        let out = session
            .complete("prompt", &GenParams::new(0.5, 10))
            .await
            .unwrap();
        assert_eq!(out, "ok");

        session.finish().await.unwrap();
        assert_eq!(generator.resets.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
