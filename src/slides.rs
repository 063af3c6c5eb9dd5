// ABOUTME: Google Slides client for the decksmith application
// ABOUTME: Performs batch text substitution and thumbnail descriptor requests

use crate::errors::Result;
use crate::export::{ThumbnailSize, ThumbnailSource};
use crate::net;
use log::info;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

const SLIDES_API_BASE: &str = "https://slides.googleapis.com/v1";

#[derive(Debug, Deserialize)]
struct PresentationPages {
    #[serde(default)]
    slides: Vec<PageRef>,
}

#[derive(Debug, Deserialize)]
struct PageRef {
    #[serde(rename = "objectId")]
    object_id: String,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    #[serde(rename = "contentUrl")]
    content_url: String,
}

/// Blocking client for the Slides v1 REST API.
pub struct SlidesClient {
    http: Client,
    token: String,
}

impl SlidesClient {
    pub fn new(token: String) -> Result<Self> {
        Ok(Self {
            http: net::build_client(None)?,
            token,
        })
    }

    /// Replace every placeholder in `mapping` throughout the presentation as
    /// one atomic batch request. Matching is exact and case-sensitive —
    /// placeholder tokens are chosen to never collide with real content.
    pub fn batch_replace_text(
        &self,
        presentation_id: &str,
        mapping: &HashMap<String, String>,
    ) -> Result<()> {
        let mut keys: Vec<&String> = mapping.keys().collect();
        keys.sort();

        let requests: Vec<serde_json::Value> = keys
            .into_iter()
            .map(|key| {
                json!({
                    "replaceAllText": {
                        "containsText": { "text": key, "matchCase": true },
                        "replaceText": &mapping[key],
                    }
                })
            })
            .collect();

        info!(
            "Submitting batch substitution of {} placeholders to {}",
            requests.len(),
            presentation_id
        );
        let response = self
            .http
            .post(format!(
                "{}/presentations/{}:batchUpdate",
                SLIDES_API_BASE, presentation_id
            ))
            .bearer_auth(&self.token)
            .json(&json!({ "requests": requests }))
            .send()?;

        net::require_success("batch substitution", response)?;
        Ok(())
    }

    /// Object IDs of every slide, in document order.
    pub fn slide_object_ids(&self, presentation_id: &str) -> Result<Vec<String>> {
        let response = self
            .http
            .get(format!(
                "{}/presentations/{}",
                SLIDES_API_BASE, presentation_id
            ))
            .bearer_auth(&self.token)
            .query(&[("fields", "slides.objectId")])
            .send()?;

        let response = net::require_success("presentation fetch", response)?;
        let pages: PresentationPages = response.json()?;
        Ok(pages.slides.into_iter().map(|p| p.object_id).collect())
    }

    /// Request a thumbnail descriptor for one slide; the returned URL is
    /// short-lived and must be fetched with bearer auth.
    pub fn thumbnail_content_url(
        &self,
        presentation_id: &str,
        page_id: &str,
        size: ThumbnailSize,
    ) -> Result<String> {
        let response = self
            .http
            .get(format!(
                "{}/presentations/{}/pages/{}/thumbnail",
                SLIDES_API_BASE, presentation_id, page_id
            ))
            .bearer_auth(&self.token)
            .query(&[
                ("thumbnailProperties.thumbnailSize", size.api_name()),
                ("thumbnailProperties.mimeType", "PNG"),
            ])
            .send()?;

        let response = net::require_success("thumbnail descriptor", response)?;
        let thumbnail: Thumbnail = response.json()?;
        Ok(thumbnail.content_url)
    }
}

impl ThumbnailSource for SlidesClient {
    fn slide_ids(&self, presentation_id: &str) -> Result<Vec<String>> {
        self.slide_object_ids(presentation_id)
    }

    fn thumbnail_url(
        &self,
        presentation_id: &str,
        page_id: &str,
        size: ThumbnailSize,
    ) -> Result<String> {
        self.thumbnail_content_url(presentation_id, page_id, size)
    }
}
