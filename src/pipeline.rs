// ABOUTME: Deck generation pipeline for the decksmith application
// ABOUTME: Gates on parse completeness, then provisions, substitutes and publishes

use crate::catalog::PlaceholderCatalog;
use crate::drive::DriveClient;
use crate::errors::{DeckError, Result};
use crate::parser;
use crate::slides::SlidesClient;
use chrono::Utc;
use log::{info, warn};
use std::collections::HashMap;

/// The remote operations the pipeline needs, seamed out so tests can verify
/// ordering and gating without touching the network.
pub trait DeckOps {
    fn copy_template(&self, template_id: &str, title: &str) -> Result<String>;
    fn move_to_folder(&self, file_id: &str, folder_id: &str) -> Result<()>;
    fn replace_text(&self, presentation_id: &str, mapping: &HashMap<String, String>) -> Result<()>;
    fn grant_public_read(&self, file_id: &str) -> Result<()>;
    fn view_url(&self, file_id: &str) -> Result<String>;
}

/// Production implementation backed by the Drive and Slides clients.
pub struct GoogleDeckOps {
    pub drive: DriveClient,
    pub slides: SlidesClient,
}

impl DeckOps for GoogleDeckOps {
    fn copy_template(&self, template_id: &str, title: &str) -> Result<String> {
        self.drive.copy_file(template_id, title)
    }

    fn move_to_folder(&self, file_id: &str, folder_id: &str) -> Result<()> {
        self.drive.move_file(file_id, folder_id)
    }

    fn replace_text(&self, presentation_id: &str, mapping: &HashMap<String, String>) -> Result<()> {
        self.slides.batch_replace_text(presentation_id, mapping)
    }

    fn grant_public_read(&self, file_id: &str) -> Result<()> {
        self.drive.grant_public_read(file_id)
    }

    fn view_url(&self, file_id: &str) -> Result<String> {
        self.drive.web_view_link(file_id)
    }
}

/// Caller-supplied knobs for one generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub template_id: String,
    pub folder_id: Option<String>,
    pub title: Option<String>,
    pub topic: Option<String>,
}

/// Outcome of a successful generation run.
#[derive(Debug, Clone)]
pub struct DeckSummary {
    pub presentation_id: String,
    pub share_url: String,
    pub title: String,
}

/// Copy the template under `title` and, when a destination folder is given,
/// relocate the copy as a second independent call.
///
/// Relocation is a filing nicety: if it fails the copy is never rolled back —
/// the failure is downgraded to a warning and the new deck's ID is returned.
pub fn provision(
    ops: &impl DeckOps,
    template_id: &str,
    title: &str,
    folder_id: Option<&str>,
) -> Result<String> {
    let file_id = ops.copy_template(template_id, title)?;

    if let Some(folder_id) = folder_id {
        if let Err(e) = ops.move_to_folder(&file_id, folder_id) {
            warn!(
                "Could not move deck {} into folder {}: {}. The deck was still created.",
                file_id, folder_id, e
            );
        }
    }

    Ok(file_id)
}

/// Grant public read access, then fetch and return the share URL. A failed
/// grant propagates — a deck must never be reported shareable when it is not.
pub fn publish(ops: &impl DeckOps, file_id: &str) -> Result<String> {
    ops.grant_public_read(file_id)?;
    ops.view_url(file_id)
}

/// Run the whole pipeline: parse, gate on completeness, provision,
/// substitute, publish.
///
/// When any catalog key is missing the run aborts before the first remote
/// call, with the missing keys listed in catalog order.
pub fn generate_deck(
    ops: &impl DeckOps,
    catalog: &PlaceholderCatalog,
    raw_text: &str,
    options: &GenerateOptions,
) -> Result<DeckSummary> {
    let parsed = parser::parse(raw_text, catalog);
    if !parsed.is_complete() {
        return Err(DeckError::MissingPlaceholders(parsed.missing));
    }

    let title = deck_title(&parsed.mapping, options);
    info!("Generating deck {:?} from template {}", title, options.template_id);

    let presentation_id = provision(
        ops,
        &options.template_id,
        &title,
        options.folder_id.as_deref(),
    )?;
    ops.replace_text(&presentation_id, &parsed.mapping)?;
    let share_url = publish(ops, &presentation_id)?;

    Ok(DeckSummary {
        presentation_id,
        share_url,
        title,
    })
}

/// Derive the deck title: an explicit title wins, then the parsed `{{Title}}`
/// value, then the topic, each suffixed with today's date; otherwise a
/// timestamped fallback.
fn deck_title(mapping: &HashMap<String, String>, options: &GenerateOptions) -> String {
    if let Some(title) = options.title.as_deref() {
        let title = title.trim();
        if !title.is_empty() {
            return title.to_string();
        }
    }

    let now = Utc::now();
    if let Some(value) = mapping.get("{{Title}}").map(|v| v.trim()) {
        if !value.is_empty() {
            return format!("{} | {}", value, now.format("%Y-%m-%d"));
        }
    }
    if let Some(topic) = options.topic.as_deref().map(str::trim) {
        if !topic.is_empty() {
            return format!("{} | {}", topic, now.format("%Y-%m-%d"));
        }
    }
    format!("Lesson Deck {}", now.format("%Y-%m-%d %H:%M:%S"))
}
