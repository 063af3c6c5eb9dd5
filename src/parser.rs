// ABOUTME: Content parser for the decksmith application
// ABOUTME: Turns pasted free-form text into a placeholder-to-value mapping

use crate::catalog::{PlaceholderCatalog, normalize_token};
use log::debug;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Result of one parse pass: the resolved mapping plus the catalog keys the
/// text never supplied, in catalog order.
///
/// A key mapped to an empty string counts as found, not missing — the token
/// line itself matched even though no value followed it.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub mapping: HashMap<String, String>,
    pub missing: Vec<String>,
}

impl ParseResult {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// One line that opened with a recognized placeholder token.
struct TokenLine {
    index: usize,
    key: String,
    inline: String,
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // One-or-more opening braces, the token name, one-or-more closing braces,
    // optionally followed by inline content on the same line.
    PATTERN.get_or_init(|| Regex::new(r"^(\{+[^}]+\}+)\s*(.*)$").unwrap())
}

/// Parse pasted content into a mapping over `catalog`.
///
/// Each logical entry begins with a line whose leading token normalizes to a
/// catalog key; the value is the trimmed inline remainder of that line, or the
/// first following non-blank line when the remainder is empty. Lines that do
/// not open with a recognized token are ignored — pasted text routinely
/// contains prose and example markers. Duplicate tokens resolve to the last
/// occurrence. This never fails; completeness is reported through `missing`.
pub fn parse(raw_text: &str, catalog: &PlaceholderCatalog) -> ParseResult {
    let lines: Vec<&str> = raw_text.lines().map(str::trim).collect();

    // First pass: one record per line that opens with a catalog token.
    let mut token_lines = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let Some(captures) = token_pattern().captures(line) else {
            continue;
        };
        let key = normalize_token(&captures[1]);
        if !catalog.contains(&key) {
            debug!("Ignoring unrecognized token on line {}: {}", index + 1, key);
            continue;
        }
        token_lines.push(TokenLine {
            index,
            key,
            inline: captures[2].trim().to_string(),
        });
    }

    // Second pass: resolve each token's value by bounded lookahead. Later
    // occurrences of the same token overwrite earlier ones.
    let mut mapping = HashMap::new();
    for record in token_lines {
        let value = if record.inline.is_empty() {
            next_non_blank(&lines, record.index)
        } else {
            record.inline
        };
        mapping.insert(record.key, value);
    }

    let missing = catalog
        .keys()
        .iter()
        .filter(|key| !mapping.contains_key(*key))
        .cloned()
        .collect();

    ParseResult { mapping, missing }
}

/// First non-blank line after `index`, or an empty string when none follows.
fn next_non_blank(lines: &[&str], index: usize) -> String {
    lines
        .iter()
        .skip(index + 1)
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
        .unwrap_or_default()
}
