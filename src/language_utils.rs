use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for locale and ISO language code handling
///
/// Catalog locales arrive in several shapes: bare ISO 639-1 codes ("es"),
/// POSIX locales ("es_ES"), or BCP-47-ish tags ("pt-BR"). Backends want a
/// plain language code, so everything is normalized down to ISO 639-1
/// before it reaches a provider.
/// Validate a target language, accepting ISO 639-1/639-3 codes and
/// region-qualified locales
pub fn validate_language_code(code: &str) -> Result<()> {
    let base = base_language(code);

    if base.len() == 2 && Language::from_639_1(&base).is_some() {
        return Ok(());
    }
    if base.len() == 3 && Language::from_639_3(&base).is_some() {
        return Ok(());
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Normalize a locale to the bare language code a backend expects.
///
/// "es_ES" and "es-ES" become "es"; bare codes pass through lowercased.
/// ISO 639-3 codes are mapped down to their 639-1 equivalent when one
/// exists ("spa" -> "es").
pub fn normalize_for_backend(code: &str) -> Result<String> {
    let base = base_language(code);

    if base.len() == 2 {
        if Language::from_639_1(&base).is_some() {
            return Ok(base);
        }
    } else if base.len() == 3 {
        if let Some(lang) = Language::from_639_3(&base) {
            if let Some(part1) = lang.to_639_1() {
                return Ok(part1.to_string());
            }
            return Ok(base);
        }
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// English name of a language, for log messages
pub fn get_language_name(code: &str) -> Option<&'static str> {
    let base = base_language(code);
    let lang = if base.len() == 2 {
        Language::from_639_1(&base)
    } else {
        Language::from_639_3(&base)
    };
    lang.map(|l| l.to_name())
}

/// Strip a region qualifier and lowercase: "pt-BR" / "pt_BR" -> "pt"
fn base_language(code: &str) -> String {
    code.trim()
        .split(['_', '-'])
        .next()
        .unwrap_or("")
        .to_lowercase()
}
