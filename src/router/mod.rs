//! Intent Router
//!
//! Classifies a user request into one path through the stage pipeline by
//! asking the generation backend for a label, then extracting the first
//! unambiguous label token from the raw output. Two routing policies exist
//! as configurable strategies: a three-way categorical vocabulary and a
//! binary new-data/elaborate vocabulary.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

use crate::errors::EngineError;
use crate::llm::{GenSession, TextGenerator};
use crate::memory::ConversationMemory;
use crate::prompts;

/// The closed set of pipeline routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Full query-synthesis-and-report path
    Report,

    /// Elaborate on the previous answer without new data
    Analysis,

    /// Query-synthesis-and-execute followed by elaboration
    General,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Report => write!(f, "report"),
            Intent::Analysis => write!(f, "analysis"),
            Intent::General => write!(f, "general"),
        }
    }
}

impl Intent {
    /// Parse an intent name as used in configuration
    pub fn from_config_name(name: &str) -> Option<Intent> {
        match name.to_ascii_lowercase().as_str() {
            "report" => Some(Intent::Report),
            "analysis" => Some(Intent::Analysis),
            "general" => Some(Intent::General),
            _ => None,
        }
    }
}

/// Routing policy selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutePolicy {
    /// Labels: report / analysis / general
    Categorical,

    /// Labels: 0 (new data request) / 1 (explain further)
    Binary,
}

/// Router over a configured policy
pub struct IntentRouter {
    policy: RoutePolicy,
}

impl IntentRouter {
    /// Create a router for the given policy
    pub fn new(policy: RoutePolicy) -> Self {
        Self { policy }
    }

    /// The configured policy
    pub fn policy(&self) -> RoutePolicy {
        self.policy
    }

    /// Classify a question into an [`Intent`].
    ///
    /// Binary policy rule: an empty chat history always routes to the new
    /// data request path, without consulting the model output.
    pub async fn classify(
        &self,
        generator: &dyn TextGenerator,
        question: &str,
        memory: &ConversationMemory,
        prior_answer: Option<&str>,
    ) -> Result<Intent, EngineError> {
        if self.policy == RoutePolicy::Binary && memory.is_empty() {
            debug!("Chat history empty; forcing new data request");
            return Ok(Intent::Report);
        }

        let prompt = match self.policy {
            RoutePolicy::Categorical => prompts::categorical_route(question),
            RoutePolicy::Binary => prompts::binary_route(
                question,
                prior_answer.unwrap_or_default(),
                &memory.render_as_text(),
            ),
        };

        let session = GenSession::begin(generator).await?;
        let raw = session.complete(&prompt, &prompts::params::ROUTING).await?;
        session.finish().await?;

        debug!("Classifier output: {:?}", raw);

        let intent = match self.policy {
            RoutePolicy::Categorical => extract_categorical_label(&raw),
            RoutePolicy::Binary => extract_binary_label(&raw),
        };

        intent.ok_or(EngineError::ClassificationAmbiguous { raw })
    }
}

/// Extract the first categorical label token from raw classifier output.
///
/// The output may contain extraneous prose or markup; the earliest
/// word-boundary match of a valid label wins.
pub fn extract_categorical_label(raw: &str) -> Option<Intent> {
    static LABEL_RE: OnceLock<Regex> = OnceLock::new();
    let re = LABEL_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(report|analysis|general)\b").expect("label regex is valid")
    });

    let label = re.find(raw)?.as_str().to_ascii_lowercase();
    match label.as_str() {
        "report" => Some(Intent::Report),
        "analysis" => Some(Intent::Analysis),
        "general" => Some(Intent::General),
        _ => None,
    }
}

/// Extract the first binary label digit from raw classifier output and
/// map it onto the closed intent set: 0 = new data request, 1 = explain
/// further.
pub fn extract_binary_label(raw: &str) -> Option<Intent> {
    for ch in raw.chars() {
        match ch {
            '0' => return Some(Intent::Report),
            '1' => return Some(Intent::Analysis),
            _ => {}
        }
    }
    None
}
