use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// Application configuration module
/// This module holds the configuration the CLI assembles for a run:
/// the chosen backend, its credentials, and the engine's scheduling
/// settings.
/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: DeepL
    #[default]
    DeepL,
    // @provider: Google Cloud Translation
    Google,
    // @provider: DeepSeek (OpenAI-compatible chat)
    DeepSeek,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::DeepL => "DeepL",
            Self::Google => "Google Translate",
            Self::DeepSeek => "DeepSeek",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::DeepL => "deepl".to_string(),
            Self::Google => "google".to_string(),
            Self::DeepSeek => "deepseek".to_string(),
        }
    }

    /// Environment variable holding this provider's API key
    pub fn credential_var(&self) -> &'static str {
        match self {
            Self::DeepL => "DEEPL_API_KEY",
            Self::Google => "GOOGLE_API_KEY",
            Self::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "deepl" => Ok(Self::DeepL),
            "google" => Ok(Self::Google),
            "deepseek" => Ok(Self::DeepSeek),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Log level configuration
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to the log crate's level filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Selected translation backend
    pub provider: TranslationProvider,

    /// Target language code (ISO or POSIX locale)
    pub target_language: String,

    /// API key for the selected backend
    #[serde(default, skip_serializing)]
    pub api_key: String,

    /// Custom endpoint override, empty means the backend default
    #[serde(default)]
    pub endpoint: String,

    /// Segments per batch request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Parallel workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Delay between backend requests, in seconds
    #[serde(default = "default_delay_secs")]
    pub inter_request_delay_secs: f64,

    /// Whether the translation cache is used
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Whether to resume from a previous checkpoint
    #[serde(default)]
    pub resume: bool,

    /// Custom database path, None means the user data directory
    #[serde(default)]
    pub storage_path: Option<PathBuf>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_batch_size() -> usize {
    1
}

fn default_workers() -> usize {
    1
}

fn default_delay_secs() -> f64 {
    0.5
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            target_language: "es".to_string(),
            api_key: String::new(),
            endpoint: String::new(),
            batch_size: default_batch_size(),
            workers: default_workers(),
            inter_request_delay_secs: default_delay_secs(),
            cache_enabled: default_cache_enabled(),
            resume: false,
            storage_path: None,
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// The inter-request delay as a Duration
    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.inter_request_delay_secs.max(0.0))
    }
}
