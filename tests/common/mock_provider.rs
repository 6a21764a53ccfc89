/*!
 * Mock provider implementation for testing
 *
 * Provides a scriptable Provider implementation so tests exercise the
 * engine without external API calls. Translations are deterministic
 * ("[lang] text"), markers pass through untouched unless the mock is told
 * to mangle them, and failures can be injected per text or per batch.
 */

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use traduki::errors::ProviderError;
use traduki::providers::{Provider, ProviderCapability};

/// Marker substring that makes the mock fail a text permanently
pub const POISON: &str = "__POISON__";

/// Tracks every call the engine makes
#[derive(Debug, Default)]
pub struct CallLog {
    /// Texts sent through translate_one
    pub single_calls: Vec<String>,
    /// Payload lists sent through translate_batch
    pub batch_calls: Vec<Vec<String>>,
}

impl CallLog {
    /// Total number of backend requests issued
    pub fn request_count(&self) -> usize {
        self.single_calls.len() + self.batch_calls.len()
    }
}

/// Scripted failure behavior
#[derive(Debug, Default)]
struct Behavior {
    /// Every batch call fails permanently
    fail_batches: bool,
    /// The next N single calls fail transiently before succeeding
    transient_failures: u32,
    /// Translations for texts containing this substring lose their markers
    mangle_markers_in: Option<String>,
}

/// Mock implementation of a translation backend
#[derive(Debug)]
pub struct MockProvider {
    capability: ProviderCapability,
    calls: Arc<Mutex<CallLog>>,
    behavior: Arc<Mutex<Behavior>>,
}

impl MockProvider {
    /// A batching backend that requires placeholder isolation
    pub fn new() -> Self {
        Self {
            capability: ProviderCapability {
                supports_batch: true,
                max_batch_size: 10,
                rate_limit_hint: Duration::ZERO,
                preserves_markup: false,
            },
            calls: Arc::new(Mutex::new(CallLog::default())),
            behavior: Arc::new(Mutex::new(Behavior::default())),
        }
    }

    /// A backend without batch support
    pub fn without_batch() -> Self {
        let mut mock = Self::new();
        mock.capability.supports_batch = false;
        mock.capability.max_batch_size = 1;
        mock
    }

    /// A backend that preserves markup natively
    pub fn with_native_markup() -> Self {
        let mut mock = Self::new();
        mock.capability.preserves_markup = true;
        mock
    }

    /// Make every batch call fail permanently
    pub fn fail_batches(self) -> Self {
        self.behavior.lock().unwrap().fail_batches = true;
        self
    }

    /// Make the next `n` single calls fail transiently
    pub fn with_transient_failures(self, n: u32) -> Self {
        self.behavior.lock().unwrap().transient_failures = n;
        self
    }

    /// Drop markers from translations of texts containing `needle`
    pub fn mangle_markers_in(self, needle: impl Into<String>) -> Self {
        self.behavior.lock().unwrap().mangle_markers_in = Some(needle.into());
        self
    }

    /// Shared handle to the call log
    pub fn calls(&self) -> Arc<Mutex<CallLog>> {
        self.calls.clone()
    }

    /// Deterministic pseudo-translation keeping the payload intact
    fn translate(&self, text: &str, target_lang: &str) -> String {
        let behavior = self.behavior.lock().unwrap();
        if let Some(needle) = &behavior.mangle_markers_in {
            if text.contains(needle) {
                // Strip markers the way a careless backend would
                let mangled: String = text
                    .chars()
                    .filter(|c| *c != '\u{27e6}' && *c != '\u{27e7}' && !c.is_ascii_digit())
                    .collect();
                return format!("[{}] {}", target_lang, mangled);
            }
        }
        format!("[{}] {}", target_lang, text)
    }

    /// Failure injection shared by single and batch paths
    fn check_failures(&self, text: &str) -> Result<(), ProviderError> {
        let mut behavior = self.behavior.lock().unwrap();
        if behavior.transient_failures > 0 {
            behavior.transient_failures -= 1;
            return Err(ProviderError::ConnectionError("injected".to_string()));
        }
        if text.contains(POISON) {
            return Err(ProviderError::AuthenticationError(
                "poisoned text".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn identity(&self) -> String {
        "mock".to_string()
    }

    fn capability(&self) -> ProviderCapability {
        self.capability
    }

    async fn translate_one(
        &self,
        text: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .single_calls
            .push(text.to_string());

        self.check_failures(text)?;
        Ok(self.translate(text, target_lang))
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Result<Vec<String>, ProviderError> {
        self.calls.lock().unwrap().batch_calls.push(texts.to_vec());

        if self.behavior.lock().unwrap().fail_batches {
            return Err(ProviderError::ApiError {
                status_code: 400,
                message: "injected batch failure".to_string(),
            });
        }
        for text in texts {
            self.check_failures(text)?;
        }

        Ok(texts
            .iter()
            .map(|t| self.translate(t, target_lang))
            .collect())
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
