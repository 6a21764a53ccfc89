/*!
 * Error types for the traduki application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when calling a translation backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Batch translation requested from a backend that cannot batch
    #[error("Backend does not support batch translation")]
    BatchUnsupported,

    /// Batch response did not line up with the request
    #[error("Batch response mismatch: sent {sent} segments, received {received}")]
    BatchMismatch {
        /// Number of segments sent
        sent: usize,
        /// Number of segments received
        received: usize,
    },
}

impl ProviderError {
    /// Whether retrying this error can possibly succeed.
    ///
    /// Rate limits, connection problems and server-side (5xx) failures are
    /// transient; authentication failures, malformed requests and protocol
    /// mismatches are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::ParseError(_)
            | Self::AuthenticationError(_)
            | Self::BatchUnsupported
            | Self::BatchMismatch { .. } => false,
        }
    }
}

/// Errors that can occur while translating a single unit
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Placeholder markers drifted during translation
    #[error("Placeholder mismatch: expected {expected} markers, found {found}")]
    PlaceholderMismatch {
        /// Number of tokens extracted from the source
        expected: usize,
        /// Number of markers found in the translated text
        found: usize,
        /// Best-effort rendition with the original literals appended,
        /// kept for the log only and never written into a catalog
        degraded: String,
    },
}

/// Errors in job configuration that prevent a job from starting
#[derive(Error, Debug)]
pub enum ConfigError {
    /// API credential for the selected backend is missing
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// Batch and parallel dispatch were both requested
    #[error(
        "Batch dispatch (batch size {batch_size}) cannot be combined with {workers} parallel workers"
    )]
    BatchParallelConflict {
        /// Configured batch size
        batch_size: usize,
        /// Configured worker count
        workers: usize,
    },

    /// A numeric setting was outside its valid range
    #[error("Invalid value for {setting}: {value}")]
    InvalidValue {
        /// Name of the offending setting
        setting: &'static str,
        /// The rejected value
        value: String,
    },

    /// The target language code could not be recognized
    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),
}

/// Errors that can occur while reading or writing catalog files
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Error reading or writing the file
    #[error("Catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed catalog syntax
    #[error("Malformed catalog at line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from catalog processing
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error in job configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
