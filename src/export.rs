// ABOUTME: Thumbnail export module for the decksmith application
// ABOUTME: Downloads slide images with size fallback and bundles them into a ZIP

use crate::errors::{DeckError, Result};
use crate::net;
use log::{info, warn};
use reqwest::blocking::Client;
use std::fmt;
use std::io::{Cursor, Write};
use std::time::Duration;
use zip::{ZipWriter, write::FileOptions};

/// Rendered image sizes the Slides API can produce, largest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailSize {
    Large,
    Medium,
    Small,
}

impl ThumbnailSize {
    pub fn api_name(&self) -> &'static str {
        match self {
            ThumbnailSize::Large => "LARGE",
            ThumbnailSize::Medium => "MEDIUM",
            ThumbnailSize::Small => "SMALL",
        }
    }
}

/// Fallback order for thumbnail rendering. Each slide is attempted at these
/// sizes in order; the first success wins.
pub const SIZE_PREFERENCE: [ThumbnailSize; 3] = [
    ThumbnailSize::Large,
    ThumbnailSize::Medium,
    ThumbnailSize::Small,
];

const MAX_DOWNLOAD_ATTEMPTS: u32 = 3;

/// A failed image download. `status` is present for HTTP status failures and
/// absent for transport-level ones; the two are handled differently.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "status {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Source of slide enumeration and thumbnail descriptors — implemented by the
/// real Slides client, faked in tests.
pub trait ThumbnailSource {
    fn slide_ids(&self, presentation_id: &str) -> Result<Vec<String>>;
    fn thumbnail_url(
        &self,
        presentation_id: &str,
        page_id: &str,
        size: ThumbnailSize,
    ) -> Result<String>;
}

/// Downloads raw image bytes from a short-lived thumbnail URL.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchFailure>;
}

/// Real fetcher: authenticated GET with a fixed per-request deadline. Each
/// retry gets a fresh deadline.
pub struct HttpImageFetcher {
    http: Client,
    token: String,
}

impl HttpImageFetcher {
    pub fn new(token: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: net::build_client(Some(timeout))?,
            token,
        })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| FetchFailure {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure {
                status: Some(status.as_u16()),
                message: response
                    .text()
                    .unwrap_or_else(|_| "<unreadable response body>".to_string()),
            });
        }

        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| FetchFailure {
                status: None,
                message: e.to_string(),
            })
    }
}

/// Export one PNG per slide into an in-memory deflate-compressed ZIP.
///
/// Entries are named `slide_NN.png` with 1-based zero-padded indices in
/// document order. Any unrecovered failure aborts the whole export — callers
/// get either a complete archive or an error, never a partial one.
pub fn export_thumbnails(
    source: &impl ThumbnailSource,
    fetcher: &impl ImageFetcher,
    presentation_id: &str,
) -> Result<Vec<u8>> {
    let slide_ids = source.slide_ids(presentation_id)?;
    info!(
        "Exporting thumbnails for {} slides of {}",
        slide_ids.len(),
        presentation_id
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (index, page_id) in slide_ids.iter().enumerate() {
        let slide_num = index + 1;
        let bytes = fetch_slide_image(source, fetcher, presentation_id, page_id)?;
        zip.start_file(format!("slide_{:02}.png", slide_num), FileOptions::default())?;
        zip.write_all(&bytes)
            .map_err(DeckError::FileReadError)?;
        info!("Archived slide {} ({} bytes)", slide_num, bytes.len());
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Obtain one slide's image, walking the size preference order.
///
/// A descriptor failure or a transport-level download failure falls through
/// to the next smaller size; an HTTP status failure from the download — or a
/// transient one that survived all retries — aborts immediately. When the
/// smallest size fails too, the error propagates.
fn fetch_slide_image(
    source: &impl ThumbnailSource,
    fetcher: &impl ImageFetcher,
    presentation_id: &str,
    page_id: &str,
) -> Result<Vec<u8>> {
    for (i, size) in SIZE_PREFERENCE.iter().enumerate() {
        let is_last = i + 1 == SIZE_PREFERENCE.len();

        let url = match source.thumbnail_url(presentation_id, page_id, *size) {
            Ok(url) => url,
            Err(e) => {
                if is_last {
                    return Err(e);
                }
                warn!(
                    "Thumbnail descriptor at {} failed for page {}: {}; trying a smaller size",
                    size.api_name(),
                    page_id,
                    e
                );
                continue;
            }
        };

        match fetch_with_retry(fetcher, &url) {
            Ok(bytes) => return Ok(bytes),
            Err(failure) => {
                if let Some(status) = failure.status {
                    return Err(DeckError::ApiError {
                        operation: "thumbnail download",
                        status,
                        message: failure.message,
                    });
                }
                if is_last {
                    return Err(DeckError::DownloadError(failure.message));
                }
                warn!(
                    "Thumbnail download at {} failed for page {}: {}; trying a smaller size",
                    size.api_name(),
                    page_id,
                    failure
                );
            }
        }
    }

    Err(DeckError::DownloadError(
        "No thumbnail sizes left to try".to_string(),
    ))
}

/// Download with a bounded number of attempts, retrying immediately on
/// server-side (>= 500) statuses only.
fn fetch_with_retry(
    fetcher: &impl ImageFetcher,
    url: &str,
) -> std::result::Result<Vec<u8>, FetchFailure> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match fetcher.fetch(url) {
            Ok(bytes) => return Ok(bytes),
            Err(failure) => {
                let transient = matches!(failure.status, Some(status) if status >= 500);
                if transient && attempt < MAX_DOWNLOAD_ATTEMPTS {
                    info!(
                        "Download attempt {} failed ({}), retrying",
                        attempt, failure
                    );
                    continue;
                }
                return Err(failure);
            }
        }
    }
}
