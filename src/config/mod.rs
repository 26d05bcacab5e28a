//! Configuration management
//!
//! This module handles loading, validation, and management of the
//! Tidewatch configuration. Configuration is stored in TOML format at
//! ~/.tidewatch/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **generator**: Text-generation backend selection and settings
//! - **store**: Contact database path
//! - **router**: Routing policy and ambiguity fallback
//! - **memory**: Conversation memory cap and state-file path

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::EngineError;
use crate::router::{Intent, RoutePolicy};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Generation backend configuration
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Query store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Router configuration
    #[serde(default)]
    pub router: RouterConfig,

    /// Memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Backend selection (llama_server or ollama)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// llama.cpp server settings
    #[serde(default)]
    pub llama_server: LlamaServerConfig,

    /// Ollama settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// llama.cpp server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlamaServerConfig {
    /// Base URL for the llama.cpp server
    #[serde(default = "default_llama_base_url")]
    pub base_url: String,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Query store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the contact database (supports ~ expansion)
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
}

/// Router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Routing policy (categorical or binary)
    #[serde(default = "default_policy")]
    pub policy: RoutePolicy,

    /// Route applied when classification is ambiguous. Empty string
    /// disables the fallback and surfaces the ambiguity to the caller.
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

/// Memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum conversation records retained
    #[serde(default = "default_max_turn_records")]
    pub max_turn_records: usize,

    /// Persisted session-state file path (supports ~ expansion)
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.tidewatch")
}

fn default_provider() -> String {
    "llama_server".to_string()
}

fn default_llama_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("~/.tidewatch/contacts.db")
}

fn default_policy() -> RoutePolicy {
    RoutePolicy::Categorical
}

fn default_fallback() -> String {
    "report".to_string()
}

fn default_max_turn_records() -> usize {
    10
}

fn default_state_file() -> PathBuf {
    PathBuf::from("~/.tidewatch/session_state.json")
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            llama_server: LlamaServerConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for LlamaServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_llama_base_url(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            fallback: default_fallback(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_turn_records: default_max_turn_records(),
            state_file: default_state_file(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            generator: GeneratorConfig::default(),
            store: StoreConfig::default(),
            router: RouterConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    /// (~/.tidewatch/config.toml), creating a default file if absent.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create the default configuration and save it to `path`
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Config::default();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.tidewatch/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".tidewatch").join("config.toml"))
    }

    /// Validate required fields and expand ~ in paths
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["llama_server", "ollama"];
        if !valid_providers.contains(&self.generator.provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid generator provider '{}'. Must be one of: {}",
                self.generator.provider,
                valid_providers.join(", ")
            )));
        }

        if !self.router.fallback.is_empty() && self.fallback_intent().is_none() {
            return Err(EngineError::Config(format!(
                "Invalid fallback route '{}'. Must be report, analysis, general, or empty",
                self.router.fallback
            )));
        }

        if self.memory.max_turn_records == 0 {
            return Err(EngineError::Config(
                "max_turn_records must be at least 1".to_string(),
            ));
        }

        self.core.data_dir = expand_tilde(&self.core.data_dir);
        self.store.database = expand_tilde(&self.store.database);
        self.memory.state_file = expand_tilde(&self.memory.state_file);

        Ok(())
    }

    /// The fallback intent, if one is configured
    pub fn fallback_intent(&self) -> Option<Intent> {
        if self.router.fallback.is_empty() {
            None
        } else {
            Intent::from_config_name(&self.router.fallback)
        }
    }
}

/// Expand a leading ~ to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_str().unwrap_or("");
    if let Some(rest) = path_str.strip_prefix("~/") {
        dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}
