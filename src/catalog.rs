use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use sha2::{Digest, Sha256};

use crate::errors::CatalogError;

// @module: PO catalog parsing and serialization

/// Translation status of a single catalog unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// Unit awaiting translation
    Pending,
    /// Unit has been translated
    Translated,
    /// Translation failed, unit kept untranslated for manual review
    Failed,
}

// @struct: Single catalog entry
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    // @field: Source text (msgid)
    pub source_text: String,

    // @field: Translated text (msgstr), empty until translated
    pub target_text: String,

    // @field: Optional disambiguation context (msgctxt)
    pub context: Option<String>,

    // @field: Comment lines preceding the entry, preserved verbatim
    pub comments: Vec<String>,

    // @field: Translation status
    pub status: UnitStatus,
}

impl TranslationUnit {
    /// Create a new pending unit
    pub fn new(source_text: impl Into<String>) -> Self {
        TranslationUnit {
            source_text: source_text.into(),
            target_text: String::new(),
            context: None,
            comments: Vec::new(),
            status: UnitStatus::Pending,
        }
    }

    /// Create a unit with a disambiguation context
    pub fn with_context(source_text: impl Into<String>, context: impl Into<String>) -> Self {
        TranslationUnit {
            context: Some(context.into()),
            ..Self::new(source_text)
        }
    }

    /// Whether this unit still needs a translation.
    ///
    /// The header entry (empty msgid) never needs one.
    pub fn needs_translation(&self) -> bool {
        !self.source_text.is_empty() && self.target_text.is_empty()
    }
}

impl fmt::Display for TranslationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for comment in &self.comments {
            writeln!(f, "{}", comment)?;
        }
        if let Some(ctx) = &self.context {
            writeln!(f, "msgctxt {}", format_po_string(ctx))?;
        }
        writeln!(f, "msgid {}", format_po_string(&self.source_text))?;
        writeln!(f, "msgstr {}", format_po_string(&self.target_text))
    }
}

/// Ordered collection of translation units from one catalog file
#[derive(Debug)]
pub struct Catalog {
    /// Source filename
    pub source_file: PathBuf,

    /// List of translation units, in file order
    pub units: Vec<TranslationUnit>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new(source_file: PathBuf) -> Self {
        Catalog {
            source_file,
            units: Vec::new(),
        }
    }

    /// Load and parse a catalog from a PO file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {:?}", path))?;

        let units = Self::parse(&content)?;
        debug!("Parsed {} units from {:?}", units.len(), path);

        Ok(Catalog {
            source_file: path.to_path_buf(),
            units,
        })
    }

    /// Parse PO file content into translation units
    pub fn parse(content: &str) -> Result<Vec<TranslationUnit>, CatalogError> {
        #[derive(PartialEq)]
        enum Field {
            None,
            Context,
            Source,
            Target,
        }

        let mut units = Vec::new();
        let mut comments: Vec<String> = Vec::new();
        let mut context: Option<String> = None;
        let mut source: Option<String> = None;
        let mut target = String::new();
        let mut field = Field::None;

        let mut flush = |comments: &mut Vec<String>,
                         context: &mut Option<String>,
                         source: &mut Option<String>,
                         target: &mut String| {
            if let Some(msgid) = source.take() {
                let translated = !target.is_empty();
                units.push(TranslationUnit {
                    source_text: msgid,
                    target_text: std::mem::take(target),
                    context: context.take(),
                    comments: std::mem::take(comments),
                    status: if translated {
                        UnitStatus::Translated
                    } else {
                        UnitStatus::Pending
                    },
                });
            }
        };

        for (lineno, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            let lineno = lineno + 1;

            if line.is_empty() {
                flush(&mut comments, &mut context, &mut source, &mut target);
                field = Field::None;
            } else if line.starts_with('#') {
                flush(&mut comments, &mut context, &mut source, &mut target);
                comments.push(raw_line.to_string());
                field = Field::None;
            } else if let Some(rest) = line.strip_prefix("msgctxt") {
                flush(&mut comments, &mut context, &mut source, &mut target);
                context = Some(parse_po_string(rest.trim(), lineno)?);
                field = Field::Context;
            } else if let Some(rest) = line.strip_prefix("msgid") {
                if field != Field::Context {
                    flush(&mut comments, &mut context, &mut source, &mut target);
                }
                source = Some(parse_po_string(rest.trim(), lineno)?);
                field = Field::Source;
            } else if let Some(rest) = line.strip_prefix("msgstr") {
                if source.is_none() {
                    return Err(CatalogError::Parse {
                        line: lineno,
                        message: "msgstr without a preceding msgid".to_string(),
                    });
                }
                target = parse_po_string(rest.trim(), lineno)?;
                field = Field::Target;
            } else if line.starts_with('"') {
                // Continuation of the previous string field
                let fragment = parse_po_string(line, lineno)?;
                match field {
                    Field::Context => {
                        if let Some(ctx) = context.as_mut() {
                            ctx.push_str(&fragment);
                        }
                    }
                    Field::Source => {
                        if let Some(src) = source.as_mut() {
                            src.push_str(&fragment);
                        }
                    }
                    Field::Target => target.push_str(&fragment),
                    Field::None => {
                        return Err(CatalogError::Parse {
                            line: lineno,
                            message: "string continuation outside an entry".to_string(),
                        });
                    }
                }
            } else {
                return Err(CatalogError::Parse {
                    line: lineno,
                    message: format!("unrecognized line: {}", line),
                });
            }
        }

        flush(&mut comments, &mut context, &mut source, &mut target);

        Ok(units)
    }

    /// Write the catalog to a PO file
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_string())
            .with_context(|| format!("Failed to write catalog file: {:?}", path))?;
        debug!("Wrote {} units to {:?}", self.units.len(), path);
        Ok(())
    }

    /// Indices of units that still need a translation, in file order
    pub fn untranslated_indices(&self) -> Vec<usize> {
        self.units
            .iter()
            .enumerate()
            .filter(|(_, u)| u.needs_translation())
            .map(|(i, _)| i)
            .collect()
    }

    /// Content fingerprint over all source texts, in order.
    ///
    /// Used to validate that a progress checkpoint still applies to this
    /// catalog: any change to source texts yields a different fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for unit in &self.units {
            hasher.update(unit.source_text.as_bytes());
            hasher.update([0x1f]);
            if let Some(ctx) = &unit.context {
                hasher.update(ctx.as_bytes());
            }
            hasher.update([0x1e]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Number of units in the catalog
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the catalog has no units
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, unit) in self.units.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", unit)?;
        }
        Ok(())
    }
}

/// Parse a quoted PO string, unescaping the gettext escape sequences
fn parse_po_string(raw: &str, line: usize) -> Result<String, CatalogError> {
    let raw = raw.trim();
    if raw.len() < 2 || !raw.starts_with('"') || !raw.ends_with('"') {
        return Err(CatalogError::Parse {
            line,
            message: format!("expected a quoted string, found: {}", raw),
        });
    }

    let inner = &raw[1..raw.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('"') => result.push('"'),
                Some('\\') => result.push('\\'),
                Some(other) => {
                    // Unknown escape, keep it as-is
                    result.push('\\');
                    result.push(other);
                }
                None => {
                    return Err(CatalogError::Parse {
                        line,
                        message: "trailing backslash in string".to_string(),
                    });
                }
            }
        } else {
            result.push(c);
        }
    }

    Ok(result)
}

/// Format a string as one or more quoted PO lines
fn format_po_string(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t");

    // Multi-line strings use the empty-first-line convention
    if text.contains('\n') {
        let mut out = String::from("\"\"");
        for part in escaped.split_inclusive("\\n") {
            out.push_str("\n\"");
            out.push_str(part);
            out.push('"');
        }
        out
    } else {
        format!("\"{}\"", escaped)
    }
}
