use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Provider, ProviderCapability, resolve_endpoint, status_error};
use crate::errors::{ConfigError, ProviderError};

/// Default Cloud Translation v2 endpoint
const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com";

/// Google Cloud Translation client
#[derive(Debug)]
pub struct GoogleTranslate {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL
    endpoint: String,
}

/// Translate request body
#[derive(Debug, Serialize)]
struct GoogleRequest<'a> {
    /// Segments to translate
    q: &'a [String],
    /// Target language code
    target: String,
    /// Plain text - placeholders are handled on our side
    format: &'static str,
}

/// Top-level response wrapper
#[derive(Debug, Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Debug, Deserialize)]
struct GoogleData {
    /// One result per input segment, in request order
    translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Deserialize)]
struct GoogleTranslation {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl GoogleTranslate {
    /// Create a new Google Translate client.
    ///
    /// An empty API key is a configuration error surfaced before any
    /// job starts.
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("GOOGLE_API_KEY".to_string()));
        }

        let endpoint = resolve_endpoint(endpoint.into(), DEFAULT_ENDPOINT)?;

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            api_key,
            endpoint,
        })
    }

    /// Issue a translate request for one or more segments
    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let api_url = format!(
            "{}/language/translate/v2",
            self.endpoint.trim_end_matches('/')
        );

        let request = GoogleRequest {
            q: texts,
            target: target_lang.to_lowercase(),
            format: "text",
        };

        let response = self
            .client
            .post(&api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ProviderError::ConnectionError(format!("Google Translate request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Google Translate API error ({}): {}", status, error_text);
            return Err(status_error(status, error_text));
        }

        let parsed = response
            .json::<GoogleResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Google Translate response: {}", e)))?;

        if parsed.data.translations.len() != texts.len() {
            return Err(ProviderError::BatchMismatch {
                sent: texts.len(),
                received: parsed.data.translations.len(),
            });
        }

        Ok(parsed
            .data
            .translations
            .into_iter()
            .map(|t| t.translated_text)
            .collect())
    }
}

#[async_trait]
impl Provider for GoogleTranslate {
    fn identity(&self) -> String {
        "google".to_string()
    }

    fn capability(&self) -> ProviderCapability {
        ProviderCapability {
            supports_batch: true,
            max_batch_size: 128,
            rate_limit_hint: Duration::from_millis(200),
            // Plain-text mime type, placeholders isolated on our side
            preserves_markup: false,
        }
    }

    async fn translate_one(
        &self,
        text: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError> {
        let texts = [text.to_string()];
        let mut results = self.translate(&texts, target_lang).await?;
        Ok(results.remove(0))
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Result<Vec<String>, ProviderError> {
        self.translate(texts, target_lang).await
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let api_url = format!(
            "{}/language/translate/v2/languages",
            self.endpoint.trim_end_matches('/')
        );

        let response = self
            .client
            .get(&api_url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                ProviderError::ConnectionError(format!("Google Translate request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(status_error(status, error_text));
        }

        Ok(())
    }
}
