// ABOUTME: Google Drive client for the decksmith application
// ABOUTME: Copies, relocates, shares and inspects deck files

use crate::errors::Result;
use crate::net;
use log::info;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

#[derive(Debug, Deserialize)]
struct FileId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FileLink {
    #[serde(rename = "webViewLink")]
    web_view_link: String,
}

/// Blocking client for the Drive v3 REST API. Every call sets
/// `supportsAllDrives` so templates living in shared drives work too.
pub struct DriveClient {
    http: Client,
    token: String,
}

impl DriveClient {
    pub fn new(token: String) -> Result<Self> {
        Ok(Self {
            http: net::build_client(None)?,
            token,
        })
    }

    /// Copy `template_id` under a new title and return the new file's ID.
    pub fn copy_file(&self, template_id: &str, title: &str) -> Result<String> {
        info!("Copying template {} as {:?}", template_id, title);
        let response = self
            .http
            .post(format!("{}/files/{}/copy", DRIVE_API_BASE, template_id))
            .bearer_auth(&self.token)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .json(&json!({ "name": title }))
            .send()?;

        let response = net::require_success("template copy", response)?;
        let file: FileId = response.json()?;
        Ok(file.id)
    }

    /// Move `file_id` into `folder_id` by adding the folder as a parent.
    pub fn move_file(&self, file_id: &str, folder_id: &str) -> Result<()> {
        info!("Moving file {} into folder {}", file_id, folder_id);
        let response = self
            .http
            .patch(format!("{}/files/{}", DRIVE_API_BASE, file_id))
            .bearer_auth(&self.token)
            .query(&[
                ("addParents", folder_id),
                ("fields", "id"),
                ("supportsAllDrives", "true"),
            ])
            .json(&json!({}))
            .send()?;

        net::require_success("file move", response)?;
        Ok(())
    }

    /// Grant "anyone with the link may read" on `file_id`.
    pub fn grant_public_read(&self, file_id: &str) -> Result<()> {
        info!("Granting public read access on {}", file_id);
        let response = self
            .http
            .post(format!("{}/files/{}/permissions", DRIVE_API_BASE, file_id))
            .bearer_auth(&self.token)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()?;

        net::require_success("permission grant", response)?;
        Ok(())
    }

    /// Fetch the canonical view URL for `file_id`.
    pub fn web_view_link(&self, file_id: &str) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/files/{}", DRIVE_API_BASE, file_id))
            .bearer_auth(&self.token)
            .query(&[("fields", "webViewLink"), ("supportsAllDrives", "true")])
            .send()?;

        let response = net::require_success("metadata fetch", response)?;
        let file: FileLink = response.json()?;
        Ok(file.web_view_link)
    }
}
