use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};

use super::{Provider, ProviderCapability, resolve_endpoint, status_error};
use crate::errors::{ConfigError, ProviderError};

/// Default DeepSeek endpoint (OpenAI-compatible)
const DEFAULT_ENDPOINT: &str = "https://api.deepseek.com";

/// Default chat model
const DEFAULT_MODEL: &str = "deepseek-chat";

/// Recommended temperature for translation tasks
const TRANSLATION_TEMPERATURE: f32 = 1.3;

/// DeepSeek client speaking the OpenAI-compatible chat completion API
#[derive(Debug)]
pub struct DeepSeek {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL
    endpoint: String,
    /// Chat model name
    model: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    /// The model to use
    model: String,
    /// The messages for the conversation
    messages: Vec<ChatMessage>,
    /// Temperature for generation
    temperature: f32,
    /// Whether to stream the response
    stream: bool,
}

/// Chat message format
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    role: String,
    /// Content of the message
    content: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    /// Completion choices
    choices: Vec<ChatChoice>,
}

/// Individual completion choice
#[derive(Debug, Deserialize)]
struct ChatChoice {
    /// The completion message
    message: ChatMessage,
}

impl DeepSeek {
    /// Create a new DeepSeek client.
    ///
    /// An empty API key is a configuration error surfaced before any
    /// job starts.
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential(
                "DEEPSEEK_API_KEY".to_string(),
            ));
        }

        let endpoint = resolve_endpoint(endpoint.into(), DEFAULT_ENDPOINT)?;

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            api_key,
            endpoint,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// System prompt shared by single and batch requests
    fn system_prompt() -> String {
        "You are a professional translator. Translate text while preserving \
         any markers of the form \u{27e6}N\u{27e7}, HTML tags, variables and \
         placeholders exactly as they appear. Do not modify the structure of \
         the text or any technical elements. Only respond with the translated \
         text, without any explanations or notes."
            .to_string()
    }

    /// Send a chat completion and extract the assistant text
    async fn complete(&self, user_content: String) -> Result<String, ProviderError> {
        let api_url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Self::system_prompt(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_content,
                },
            ],
            temperature: TRANSLATION_TEMPERATURE,
            stream: false,
        };

        let response = self
            .client
            .post(&api_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ProviderError::ConnectionError(format!("DeepSeek request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("DeepSeek API error ({}): {}", status, error_text);
            return Err(status_error(status, error_text));
        }

        let parsed = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("DeepSeek response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::ParseError("DeepSeek returned no choices".to_string()))
    }
}

/// Combine batch segments into one prompt body delimited by segment markers.
///
/// A chat backend has no native batch call, so segments travel in one
/// prompt fenced by `<<SEG_n>>` markers and are split back out of the
/// response. The final `<<END>>` marker bounds the last segment.
fn combine_segments(texts: &[String]) -> String {
    let mut combined = String::new();
    for (idx, text) in texts.iter().enumerate() {
        combined.push_str(&format!("<<SEG_{}>>\n", idx));
        combined.push_str(text);
        combined.push('\n');
    }
    combined.push_str("<<END>>");
    combined
}

/// Split a marker-fenced response back into per-segment texts.
///
/// Every segment marker must survive in order; anything else means the
/// model mangled the protocol and the whole batch fails atomically.
fn split_segments(response: &str, count: usize) -> Result<Vec<String>, ProviderError> {
    let mut segments = Vec::with_capacity(count);
    let mut cursor = 0;

    for idx in 0..count {
        let start_marker = format!("<<SEG_{}>>", idx);
        let end_marker = if idx == count - 1 {
            "<<END>>".to_string()
        } else {
            format!("<<SEG_{}>>", idx + 1)
        };

        let start = response[cursor..]
            .find(&start_marker)
            .map(|pos| cursor + pos + start_marker.len())
            .ok_or(ProviderError::BatchMismatch {
                sent: count,
                received: idx,
            })?;

        let end = response[start..]
            .find(&end_marker)
            .map(|pos| start + pos)
            .ok_or(ProviderError::BatchMismatch {
                sent: count,
                received: idx,
            })?;

        segments.push(response[start..end].trim().to_string());
        cursor = end;
    }

    Ok(segments)
}

#[async_trait]
impl Provider for DeepSeek {
    fn identity(&self) -> String {
        format!("deepseek:{}", self.model)
    }

    fn capability(&self) -> ProviderCapability {
        ProviderCapability {
            supports_batch: true,
            max_batch_size: 20,
            rate_limit_hint: Duration::from_secs(1),
            // Chat models routinely rewrite tags, so text arrives isolated
            preserves_markup: false,
        }
    }

    async fn translate_one(
        &self,
        text: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError> {
        let prompt = format!("Translate this text to {}: {}", target_lang, text);
        let translated = self.complete(prompt).await?;
        Ok(translated.trim().to_string())
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Result<Vec<String>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = format!(
            "Translate every segment below to {}. Keep each <<SEG_n>> marker \
             and the final <<END>> marker exactly where they are, on their own \
             lines, and translate only the text between them.\n\n{}",
            target_lang,
            combine_segments(texts)
        );

        let response = self.complete(prompt).await?;
        split_segments(&response, texts.len())
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.translate_one("Hello", "es").await.map(|_| ())
    }
}
