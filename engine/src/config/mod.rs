//! Configuration management
//!
//! This module handles loading, validation, and management of the Mibu configuration.
//! Configuration is stored in TOML format at ~/.mibu/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory, database file name
//! - **server**: HTTP bind address and CORS
//! - **user**: The default account commands act on
//! - **llm**: OpenAI-compatible chat endpoint used for classification and vision
//! - **speech**: Whisper transcription and ElevenLabs voice settings
//! - **travel**: Directions API, monthly quota and cache lifetime
//!
//! API keys are never part of the file. They are resolved at call time by
//! [`crate::secrets::SecretManager`] from the environment or the OS keychain.
//!
//! # Examples
//!
//! ```no_run
//! use mibu_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Listening on {}:{}", config.server.host, config.server.port);
//! println!("Model: {}", config.llm.model);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use sdk::types::TravelMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Default account
    #[serde(default)]
    pub user: UserConfig,

    /// Language model settings
    #[serde(default)]
    pub llm: LLMConfig,

    /// Speech services
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Travel-time service
    #[serde(default)]
    pub travel: TravelConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// SQLite file name inside the data directory
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow cross-origin requests from any origin
    #[serde(default = "default_true")]
    pub permissive_cors: bool,
}

/// Default user configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub default_id: String,

    #[serde(default = "default_user_email")]
    pub default_email: String,

    #[serde(default = "default_user_name")]
    pub default_name: String,
}

/// Language model configuration
///
/// Any OpenAI-compatible chat completions endpoint works (xAI, OpenAI, a
/// local Ollama's `/v1`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Base URL for the chat completions API
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model used for classification and briefings
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Model used for receipt images
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Name of the secret holding the API key
    #[serde(default = "default_llm_api_key_name")]
    pub api_key_name: String,

    #[serde(default = "default_classify_temperature")]
    pub classify_temperature: f64,

    #[serde(default = "default_vision_temperature")]
    pub vision_temperature: f64,

    #[serde(default = "default_briefing_temperature")]
    pub briefing_temperature: f64,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    // Note: API key stored in environment or OS keychain, not in config
}

/// Speech configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_whisper_base_url")]
    pub whisper_base_url: String,

    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,

    /// Spoken language hint (ISO 639-1)
    #[serde(default = "default_whisper_language")]
    pub language: String,

    #[serde(default = "default_elevenlabs_base_url")]
    pub elevenlabs_base_url: String,

    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default = "default_voice_model")]
    pub voice_model: String,

    #[serde(default = "default_stability")]
    pub stability: f64,

    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f64,
}

/// Travel-time configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelConfig {
    /// Base URL for the SerpApi search endpoint
    #[serde(default = "default_travel_base_url")]
    pub base_url: String,

    /// Directions API calls allowed per calendar month
    #[serde(default = "default_monthly_quota")]
    pub monthly_quota: u32,

    /// How long a cached duration stays valid
    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: i64,

    /// Duration used whenever the real lookup is unavailable
    #[serde(default = "default_fallback_minutes")]
    pub fallback_minutes: u32,

    #[serde(default)]
    pub default_mode: TravelMode,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.mibu")
}

fn default_database_file() -> String {
    "mibu.db".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_user_id() -> String {
    "mock-user-1".to_string()
}

fn default_user_email() -> String {
    "user@example.com".to_string()
}

fn default_user_name() -> String {
    "Demo User".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.x.ai/v1".to_string()
}

fn default_llm_model() -> String {
    "grok-4-latest".to_string()
}

fn default_vision_model() -> String {
    "grok-2-vision-1212".to_string()
}

fn default_llm_api_key_name() -> String {
    "GROK_API_KEY".to_string()
}

fn default_classify_temperature() -> f64 {
    0.3
}

fn default_vision_temperature() -> f64 {
    0.1
}

fn default_briefing_temperature() -> f64 {
    0.7
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_whisper_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_whisper_model() -> String {
    "whisper-1".to_string()
}

fn default_whisper_language() -> String {
    "de".to_string()
}

fn default_elevenlabs_base_url() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn default_voice_id() -> String {
    // "Adam" (American, deep, narration)
    "pNInz6obpgDQGcFmaJgB".to_string()
}

fn default_voice_model() -> String {
    "eleven_monolingual_v1".to_string()
}

fn default_stability() -> f64 {
    0.5
}

fn default_similarity_boost() -> f64 {
    0.75
}

fn default_travel_base_url() -> String {
    "https://serpapi.com".to_string()
}

fn default_monthly_quota() -> u32 {
    250
}

fn default_cache_ttl_days() -> i64 {
    7
}

fn default_fallback_minutes() -> u32 {
    15
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
            database_file: default_database_file(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            permissive_cors: true,
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            default_id: default_user_id(),
            default_email: default_user_email(),
            default_name: default_user_name(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            vision_model: default_vision_model(),
            api_key_name: default_llm_api_key_name(),
            classify_temperature: default_classify_temperature(),
            vision_temperature: default_vision_temperature(),
            briefing_temperature: default_briefing_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            whisper_base_url: default_whisper_base_url(),
            whisper_model: default_whisper_model(),
            language: default_whisper_language(),
            elevenlabs_base_url: default_elevenlabs_base_url(),
            voice_id: default_voice_id(),
            voice_model: default_voice_model(),
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
        }
    }
}

impl Default for TravelConfig {
    fn default() -> Self {
        Self {
            base_url: default_travel_base_url(),
            monthly_quota: default_monthly_quota(),
            cache_ttl_days: default_cache_ttl_days(),
            fallback_minutes: default_fallback_minutes(),
            default_mode: TravelMode::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            server: ServerConfig::default(),
            user: UserConfig::default(),
            llm: LLMConfig::default(),
            speech: SpeechConfig::default(),
            travel: TravelConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.mibu/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
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

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let default = Self::default();
        let toml_string = toml::to_string_pretty(&default)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {}", path.display());

        let mut config = default;
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.mibu/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".mibu").join("config.toml"))
    }

    /// Full path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.core.data_dir.join(&self.core.database_file)
    }

    /// Validate values and expand ~ in the data directory
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.core.database_file.trim().is_empty() {
            return Err(EngineError::Config(
                "database_file must not be empty".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(EngineError::Config("server port must not be 0".to_string()));
        }

        for (name, value) in [
            ("classify_temperature", self.llm.classify_temperature),
            ("vision_temperature", self.llm.vision_temperature),
            ("briefing_temperature", self.llm.briefing_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(EngineError::Config(format!(
                    "{} must be between 0.0 and 2.0",
                    name
                )));
            }
        }

        for (name, value) in [
            ("stability", self.speech.stability),
            ("similarity_boost", self.speech.similarity_boost),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::Config(format!(
                    "{} must be between 0.0 and 1.0",
                    name
                )));
            }
        }

        if self.travel.cache_ttl_days < 0 {
            return Err(EngineError::Config(
                "cache_ttl_days must not be negative".to_string(),
            ));
        }

        if self.user.default_id.trim().is_empty() || self.user.default_email.trim().is_empty() {
            return Err(EngineError::Config(
                "default user id and email must be set".to_string(),
            ));
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
