// ABOUTME: Library module for the decksmith program.
// ABOUTME: Contains core functionality for parsing content and stamping Google Slides decks.

// Reexport modules
pub mod auth;
pub mod catalog;
pub mod config;
pub mod drive;
pub mod errors;
pub mod export;
pub mod parser;
pub mod pipeline;
pub mod slides;
pub mod utils;

mod net;

// Reexport common types and functions
pub use auth::{Authenticator, ClientSecrets, FileTokenStore, StoredToken, TokenStore};
pub use catalog::{PlaceholderCatalog, normalize_token};
pub use config::Config;
pub use drive::DriveClient;
pub use errors::{DeckError, Result};
pub use export::{HttpImageFetcher, ThumbnailSize, export_thumbnails};
pub use parser::{ParseResult, parse};
pub use pipeline::{DeckOps, DeckSummary, GenerateOptions, GoogleDeckOps, generate_deck};
pub use slides::SlidesClient;

#[cfg(test)]
mod tests;
