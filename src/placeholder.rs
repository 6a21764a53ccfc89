/*!
 * Placeholder isolation for translated text.
 *
 * Catalog strings embed markup spans and format variables that a backend
 * must not translate or reorder. Before a string is sent to a backend that
 * cannot preserve them natively, each such span is swapped for a neutral
 * ordinal marker; after translation the markers are swapped back for the
 * original literals.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::TranslationError;

/// Combined token pattern: markup spans and format variables.
///
/// A single alternation keeps the scan single-pass and leftmost-first, so
/// extraction order always matches source order. Covers HTML-style tags,
/// positional printf variables (`%1$s`), plain printf variables (`%s`, `%d`)
/// and brace-indexed variables (`{0}`).
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<[^<>]+>|%\d+\$[sd]|%[sd]|\{\d+\}").unwrap()
});

/// Marker pattern matching what `isolate` emits
static MARKER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"⟦\d+⟧").unwrap());

/// Codec that swaps markup and format tokens for ordinal markers
pub struct PlaceholderCodec;

impl PlaceholderCodec {
    /// Extract markup and format tokens from `text`.
    ///
    /// Returns the stripped text with each token replaced by an ordinal
    /// marker (`⟦0⟧`, `⟦1⟧`, ...) plus the removed literals in source order.
    pub fn isolate(text: &str) -> (String, Vec<String>) {
        let mut tokens = Vec::new();
        let stripped = TOKEN_REGEX.replace_all(text, |caps: &regex::Captures<'_>| {
            let marker = format!("\u{27e6}{}\u{27e7}", tokens.len());
            tokens.push(caps[0].to_string());
            marker
        });

        (stripped.into_owned(), tokens)
    }

    /// Re-insert extracted tokens into translated text.
    ///
    /// The Nth marker found in `translated`, scanning left to right, is
    /// replaced with the Nth entry of `tokens` regardless of the digits the
    /// backend echoed back. A marker count that differs from the token count
    /// means the backend dropped or duplicated markers; in that case no
    /// substitution happens at all and the error carries a degraded
    /// rendition (translated text plus the original literals) for the log.
    pub fn restore(translated: &str, tokens: &[String]) -> Result<String, TranslationError> {
        let markers: Vec<_> = MARKER_REGEX.find_iter(translated).collect();

        if markers.len() != tokens.len() {
            return Err(TranslationError::PlaceholderMismatch {
                expected: tokens.len(),
                found: markers.len(),
                degraded: degrade(translated, tokens),
            });
        }

        let mut result = String::with_capacity(translated.len());
        let mut cursor = 0;
        for (marker, token) in markers.iter().zip(tokens) {
            result.push_str(&translated[cursor..marker.start()]);
            result.push_str(token);
            cursor = marker.end();
        }
        result.push_str(&translated[cursor..]);

        Ok(result)
    }

    /// Number of markers present in a text
    pub fn marker_count(text: &str) -> usize {
        MARKER_REGEX.find_iter(text).count()
    }
}

/// Fallback rendition for a mismatched restore: the translated text as
/// received, with the original literals appended so nothing is lost.
fn degrade(translated: &str, tokens: &[String]) -> String {
    if tokens.is_empty() {
        return translated.to_string();
    }
    format!("{} [{}]", translated, tokens.join(" "))
}
