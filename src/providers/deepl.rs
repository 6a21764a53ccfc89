use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};

use super::{Provider, ProviderCapability, resolve_endpoint, status_error};
use crate::errors::{ConfigError, ProviderError};

/// Default public API endpoint
const DEFAULT_ENDPOINT: &str = "https://api.deepl.com";

/// DeepL client for interacting with the DeepL translation API
#[derive(Debug)]
pub struct DeepL {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL
    endpoint: String,
}

/// DeepL translate request
#[derive(Debug, Serialize)]
struct DeepLRequest<'a> {
    /// Segments to translate
    text: &'a [String],
    /// Target language code, uppercased per the DeepL convention
    target_lang: String,
    /// Keep whitespace and punctuation of the source
    preserve_formatting: bool,
    /// Treat embedded tags as HTML and carry them through
    tag_handling: &'static str,
}

/// DeepL translate response
#[derive(Debug, Deserialize)]
struct DeepLResponse {
    /// One result per input segment, in request order
    translations: Vec<DeepLTranslation>,
}

/// Individual translation in a DeepL response
#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    /// The translated text
    text: String,
}

impl DeepL {
    /// Create a new DeepL client.
    ///
    /// An empty API key is a configuration error surfaced before any
    /// job starts.
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("DEEPL_API_KEY".to_string()));
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
        let api_url = format!("{}/v2/translate", self.endpoint.trim_end_matches('/'));

        let request = DeepLRequest {
            text: texts,
            target_lang: target_lang.to_uppercase(),
            preserve_formatting: true,
            tag_handling: "html",
        };

        let response = self
            .client
            .post(&api_url)
            .header(
                header::AUTHORIZATION,
                format!("DeepL-Auth-Key {}", self.api_key),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("DeepL request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("DeepL API error ({}): {}", status, error_text);
            return Err(status_error(status, error_text));
        }

        let parsed = response
            .json::<DeepLResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("DeepL response: {}", e)))?;

        if parsed.translations.len() != texts.len() {
            return Err(ProviderError::BatchMismatch {
                sent: texts.len(),
                received: parsed.translations.len(),
            });
        }

        Ok(parsed.translations.into_iter().map(|t| t.text).collect())
    }
}

#[async_trait]
impl Provider for DeepL {
    fn identity(&self) -> String {
        "deepl".to_string()
    }

    fn capability(&self) -> ProviderCapability {
        ProviderCapability {
            supports_batch: true,
            max_batch_size: 50,
            rate_limit_hint: Duration::from_millis(500),
            // DeepL carries HTML tags through natively, so it receives
            // un-isolated text
            preserves_markup: true,
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
        let api_url = format!("{}/v2/usage", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .get(&api_url)
            .header(
                header::AUTHORIZATION,
                format!("DeepL-Auth-Key {}", self.api_key),
            )
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("DeepL request failed: {}", e)))?;

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
