// ABOUTME: Placeholder catalog for the decksmith application
// ABOUTME: Defines the set of template tokens a deck variant requires

use crate::errors::{DeckError, Result};
use std::fs;
use std::path::Path;

/// Normalize a raw placeholder token to the canonical `{{Name}}` form.
///
/// Users paste tokens with anything from one to three braces per side and
/// stray whitespace around the name; all of `{Title}`, `{{{ Title }}}` and
/// `{{Title}}` normalize to `{{Title}}`.
pub fn normalize_token(raw: &str) -> String {
    let inner = raw
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim();
    format!("{{{{{}}}}}", inner)
}

/// An ordered, fixed set of placeholder tokens for one template variant.
///
/// Order only matters for reporting: missing tokens are listed in catalog
/// order. Every key is stored in normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderCatalog {
    keys: Vec<String>,
}

impl PlaceholderCatalog {
    /// Build a catalog from raw tokens, normalizing each one.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys = Vec::new();
        for token in tokens {
            let key = normalize_token(token.as_ref());
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Self { keys }
    }

    /// Load a catalog from a file with one token per line.
    /// Blank lines and lines starting with '#' are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(DeckError::FileReadError)?;
        let tokens: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        if tokens.is_empty() {
            return Err(DeckError::ValidationError(format!(
                "Catalog file contains no tokens: {:?}",
                path
            )));
        }

        Ok(Self::new(tokens))
    }

    /// The built-in lesson-deck template catalog.
    pub fn lesson_deck() -> Self {
        let mut tokens = vec!["{{Title}}".to_string(), "{{Subtitle}}".to_string()];
        for lesson in 1..=4 {
            tokens.push(format!("{{{{Lesson {} Title}}}}", lesson));
            tokens.push(format!("{{{{Lesson {} Subtitle}}}}", lesson));
            tokens.push(format!("{{{{Lesson {} Explainer 1}}}}", lesson));
            tokens.push(format!("{{{{Lesson {} Explainer 2}}}}", lesson));
            tokens.push(format!("{{{{Lesson {} List Title}}}}", lesson));
            tokens.push(format!("{{{{Lesson {} List Point 1}}}}", lesson));
            tokens.push(format!("{{{{Lesson {} List Point 2}}}}", lesson));
            tokens.push(format!("{{{{Lesson {} List Point 3}}}}", lesson));
            tokens.push(format!("{{{{Lesson {} Case Title}}}}", lesson));
            tokens.push(format!("{{{{Lesson {} Case Description}}}}", lesson));
        }
        tokens.push("{{Activity Title}}".to_string());
        tokens.push("{{Activity Instructions}}".to_string());
        Self::new(tokens)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
