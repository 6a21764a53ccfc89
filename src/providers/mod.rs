/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported backends:
 * - DeepL: dedicated translation API with native tag handling
 * - Google: Cloud Translation v2 API
 * - DeepSeek: OpenAI-compatible chat completion API
 */

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::ProviderError;

/// Static description of what a backend can do.
///
/// Built once per adapter and never mutated at runtime; the scheduling
/// engine picks its dispatch strategy from this.
#[derive(Debug, Clone, Copy)]
pub struct ProviderCapability {
    /// Whether the backend accepts multiple segments per request
    pub supports_batch: bool,
    /// Largest number of segments per batch request
    pub max_batch_size: usize,
    /// Suggested pause between requests to stay under rate limits
    pub rate_limit_hint: Duration,
    /// Whether the backend preserves embedded markup natively.
    ///
    /// Backends without this receive placeholder-isolated text and must
    /// not reorder or duplicate the markers.
    pub preserves_markup: bool,
}

/// Common trait for all translation backends
///
/// This trait defines the interface that all provider implementations must
/// follow, allowing them to be used interchangeably by the scheduling engine.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Stable identity used to scope cache entries.
    ///
    /// Different backends produce different, non-interchangeable
    /// translations, so this string is part of every cache key.
    fn identity(&self) -> String;

    /// The backend's static capability descriptor
    fn capability(&self) -> ProviderCapability;

    /// Translate a single text into `target_lang`
    async fn translate_one(&self, text: &str, target_lang: &str)
    -> Result<String, ProviderError>;

    /// Translate several texts in one request, preserving input order.
    ///
    /// Only meaningful when `capability().supports_batch` is set; the
    /// default refuses. A batch fails atomically - callers that need
    /// partial results split the batch and retry per segment.
    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let _ = (texts, target_lang);
        Err(ProviderError::BatchUnsupported)
    }

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

/// Resolve a configured endpoint override, validating that a non-empty
/// override is a well-formed URL
pub(crate) fn resolve_endpoint(
    configured: String,
    default: &str,
) -> Result<String, crate::errors::ConfigError> {
    if configured.is_empty() {
        return Ok(default.to_string());
    }

    url::Url::parse(&configured).map_err(|_| crate::errors::ConfigError::InvalidValue {
        setting: "endpoint",
        value: configured.clone(),
    })?;

    Ok(configured)
}

/// Map an unsuccessful HTTP response to the error taxonomy
pub(crate) fn status_error(status: reqwest::StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(body),
        429 => ProviderError::RateLimitExceeded(body),
        code => ProviderError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

pub mod deepl;
pub mod deepseek;
pub mod google;

pub use deepl::DeepL;
pub use deepseek::DeepSeek;
pub use google::GoogleTranslate;
