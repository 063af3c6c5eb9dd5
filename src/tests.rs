use super::*;
use crate::export::{FetchFailure, ImageFetcher, SIZE_PREFERENCE, ThumbnailSource};
use crate::pipeline::{provision, publish};
use chrono::{Duration as ChronoDuration, Utc};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Cursor, Read};

fn small_catalog() -> PlaceholderCatalog {
    PlaceholderCatalog::new(["{{Title}}", "{{Subtitle}}", "{{Body}}"])
}

// --- catalog -------------------------------------------------------------

#[test]
fn test_normalize_token_brace_counts() {
    assert_eq!(normalize_token("{Title}"), "{{Title}}");
    assert_eq!(normalize_token("{{Title}}"), "{{Title}}");
    assert_eq!(normalize_token("{{{Title}}}"), "{{Title}}");
    assert_eq!(normalize_token("{{ Title }}"), "{{Title}}");
    assert_eq!(normalize_token("  {{{ Lesson 1 Title }}}  "), "{{Lesson 1 Title}}");
}

#[test]
fn test_lesson_deck_catalog_shape() {
    let catalog = PlaceholderCatalog::lesson_deck();
    assert_eq!(catalog.len(), 44);
    assert_eq!(catalog.keys()[0], "{{Title}}");
    assert_eq!(catalog.keys()[1], "{{Subtitle}}");
    assert!(catalog.contains("{{Lesson 3 List Point 2}}"));
    assert!(catalog.contains("{{Activity Instructions}}"));
    assert!(!catalog.contains("{{Lesson 5 Title}}"));
}

#[test]
fn test_catalog_from_file_skips_comments_and_normalizes() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("catalog.txt");
    std::fs::write(&path, "# deck tokens\n{Title}\n\n{{Body}}\n").expect("write catalog");

    let catalog = PlaceholderCatalog::from_file(&path).expect("load catalog");
    assert_eq!(catalog.keys(), &["{{Title}}".to_string(), "{{Body}}".to_string()]);
}

#[test]
fn test_catalog_from_empty_file_is_an_error() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("catalog.txt");
    std::fs::write(&path, "# nothing here\n\n").expect("write catalog");

    assert!(PlaceholderCatalog::from_file(&path).is_err());
}

// --- parser --------------------------------------------------------------

#[test]
fn test_parse_round_trip_completeness() {
    let catalog = small_catalog();
    let text = "{{Title}} Knowing Yourself\n{{Subtitle}} Why it matters\n{{Body}} The details.\n";

    let result = parse(text, &catalog);
    assert!(result.missing.is_empty());
    assert_eq!(result.mapping["{{Title}}"], "Knowing Yourself");
    assert_eq!(result.mapping["{{Subtitle}}"], "Why it matters");
    assert_eq!(result.mapping["{{Body}}"], "The details.");
}

#[test]
fn test_parse_brace_normalization() {
    let catalog = small_catalog();
    for token in ["{Title}", "{{Title}}", "{{{Title}}}", "{{ Title }}"] {
        let text = format!("{} Knowing Yourself\n{{{{Subtitle}}}} s\n{{{{Body}}}} b\n", token);
        let result = parse(&text, &catalog);
        assert!(result.missing.is_empty(), "token form {:?} was not recognized", token);
        assert_eq!(result.mapping["{{Title}}"], "Knowing Yourself");
    }
}

#[test]
fn test_parse_missing_detection_preserves_catalog_order() {
    let catalog = PlaceholderCatalog::new(["{{A}}", "{{B}}", "{{C}}", "{{D}}"]);
    let text = "{{C}} gamma\nsome prose in between\n{{A}} alpha\n";

    let result = parse(text, &catalog);
    assert_eq!(result.missing, vec!["{{B}}".to_string(), "{{D}}".to_string()]);
    assert_eq!(result.mapping.len(), 2);
}

#[test]
fn test_parse_next_line_fallback_skips_blanks() {
    let catalog = small_catalog();
    let text = "{{Title}}\n\n\nKnowing Yourself\n{{Subtitle}} s\n{{Body}} b\n";

    let result = parse(text, &catalog);
    assert!(result.missing.is_empty());
    assert_eq!(result.mapping["{{Title}}"], "Knowing Yourself");
}

#[test]
fn test_parse_last_occurrence_wins() {
    let catalog = small_catalog();
    let text = "{{Title}} First pass\n{{Subtitle}} s\n{{Body}} b\n{{Title}} Second pass\n";

    let result = parse(text, &catalog);
    assert_eq!(result.mapping["{{Title}}"], "Second pass");
}

#[test]
fn test_parse_empty_value_is_found_not_missing() {
    let catalog = small_catalog();
    // {{Body}} opens the last line: no inline text and nothing after it.
    let text = "{{Title}} t\n{{Subtitle}} s\n{{Body}}";

    let result = parse(text, &catalog);
    assert!(result.missing.is_empty());
    assert_eq!(result.mapping["{{Body}}"], "");
}

#[test]
fn test_parse_ignores_prose_and_unknown_tokens() {
    let catalog = small_catalog();
    let text = "Here is the deck content you asked for:\n{{Nonsense}} ignored\n{{Title}} t\n{{Subtitle}} s\n{{Body}} b\n";

    let result = parse(text, &catalog);
    assert!(result.missing.is_empty());
    assert!(!result.mapping.contains_key("{{Nonsense}}"));
    assert_eq!(result.mapping.len(), 3);
}

#[test]
fn test_parse_inline_value_is_trimmed() {
    let catalog = small_catalog();
    let text = "{{Title}}    spaced out   \n{{Subtitle}} s\n{{Body}} b\n";

    let result = parse(text, &catalog);
    assert_eq!(result.mapping["{{Title}}"], "spaced out");
}

// --- auth ----------------------------------------------------------------

#[test]
fn test_stored_token_expiry() {
    let fresh = StoredToken {
        access_token: "a".to_string(),
        refresh_token: None,
        expiry: Utc::now() + ChronoDuration::hours(1),
    };
    assert!(!fresh.is_expired());

    let stale = StoredToken {
        access_token: "a".to_string(),
        refresh_token: None,
        expiry: Utc::now() - ChronoDuration::hours(1),
    };
    assert!(stale.is_expired());

    // Tokens inside the leeway window count as expired.
    let nearly = StoredToken {
        access_token: "a".to_string(),
        refresh_token: None,
        expiry: Utc::now() + ChronoDuration::seconds(10),
    };
    assert!(nearly.is_expired());
}

#[test]
fn test_file_token_store_round_trip() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let store = FileTokenStore::new(dir.path().join("token.json"));

    assert!(store.load().expect("load").is_none());

    let token = StoredToken {
        access_token: "access".to_string(),
        refresh_token: Some("refresh".to_string()),
        expiry: Utc::now() + ChronoDuration::hours(1),
    };
    store.save(&token).expect("save");

    let loaded = store.load().expect("load").expect("token present");
    assert_eq!(loaded.access_token, "access");
    assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
}

#[test]
fn test_file_token_store_treats_corrupt_file_as_absent() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("token.json");
    std::fs::write(&path, "not json at all").expect("write token");

    let store = FileTokenStore::new(path);
    assert!(store.load().expect("load").is_none());
}

// --- export --------------------------------------------------------------

fn server_failure() -> FetchFailure {
    FetchFailure {
        status: Some(503),
        message: "upstream hiccup".to_string(),
    }
}

fn client_failure() -> FetchFailure {
    FetchFailure {
        status: Some(404),
        message: "gone".to_string(),
    }
}

fn transport_failure() -> FetchFailure {
    FetchFailure {
        status: None,
        message: "connection reset".to_string(),
    }
}

struct ScriptedSource {
    ids: Vec<String>,
    fail_descriptors: bool,
    requested_sizes: RefCell<Vec<ThumbnailSize>>,
}

impl ScriptedSource {
    fn with_slides(count: usize) -> Self {
        Self {
            ids: (1..=count).map(|i| format!("page-{}", i)).collect(),
            fail_descriptors: false,
            requested_sizes: RefCell::new(Vec::new()),
        }
    }

    fn failing_descriptors(count: usize) -> Self {
        Self {
            fail_descriptors: true,
            ..Self::with_slides(count)
        }
    }
}

impl ThumbnailSource for ScriptedSource {
    fn slide_ids(&self, _presentation_id: &str) -> Result<Vec<String>> {
        Ok(self.ids.clone())
    }

    fn thumbnail_url(
        &self,
        _presentation_id: &str,
        page_id: &str,
        size: ThumbnailSize,
    ) -> Result<String> {
        self.requested_sizes.borrow_mut().push(size);
        if self.fail_descriptors {
            return Err(DeckError::ApiError {
                operation: "thumbnail descriptor",
                status: 400,
                message: format!("no rendering for {}", page_id),
            });
        }
        Ok(format!("https://img.test/{}/{}", page_id, size.api_name()))
    }
}

struct ScriptedFetcher {
    responses: RefCell<VecDeque<std::result::Result<Vec<u8>, FetchFailure>>>,
    calls: RefCell<usize>,
}

impl ScriptedFetcher {
    fn new(
        responses: impl IntoIterator<Item = std::result::Result<Vec<u8>, FetchFailure>>,
    ) -> Self {
        Self {
            responses: RefCell::new(responses.into_iter().collect()),
            calls: RefCell::new(0),
        }
    }

    fn call_count(&self) -> usize {
        *self.calls.borrow()
    }
}

impl ImageFetcher for ScriptedFetcher {
    fn fetch(&self, _url: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
        *self.calls.borrow_mut() += 1;
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(transport_failure()))
    }
}

#[test]
fn test_export_retries_through_server_errors_without_size_fallback() {
    let source = ScriptedSource::with_slides(1);
    let fetcher = ScriptedFetcher::new([
        Err(server_failure()),
        Err(server_failure()),
        Ok(b"png-bytes".to_vec()),
    ]);

    let archive = export_thumbnails(&source, &fetcher, "deck-1").expect("export succeeds");
    assert_eq!(fetcher.call_count(), 3);
    // Only the large size was ever asked for.
    assert_eq!(&*source.requested_sizes.borrow(), &[ThumbnailSize::Large]);

    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("readable archive");
    let mut entry = zip.by_name("slide_01.png").expect("entry present");
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).expect("read entry");
    assert_eq!(bytes, b"png-bytes");
}

#[test]
fn test_export_aborts_when_every_size_fails() {
    let source = ScriptedSource::failing_descriptors(1);
    let fetcher = ScriptedFetcher::new(Vec::new());

    let result = export_thumbnails(&source, &fetcher, "deck-1");
    assert!(result.is_err());
    // All three sizes were attempted before giving up.
    assert_eq!(source.requested_sizes.borrow().len(), SIZE_PREFERENCE.len());
    assert_eq!(fetcher.call_count(), 0);
}

#[test]
fn test_export_client_error_aborts_immediately() {
    let source = ScriptedSource::with_slides(1);
    let fetcher = ScriptedFetcher::new([Err(client_failure())]);

    let result = export_thumbnails(&source, &fetcher, "deck-1");
    match result {
        Err(DeckError::ApiError { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected ApiError, got {:?}", other.map(|v| v.len())),
    }
    // No retry and no smaller size.
    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(&*source.requested_sizes.borrow(), &[ThumbnailSize::Large]);
}

#[test]
fn test_export_exhausted_retries_abort_without_fallback() {
    let source = ScriptedSource::with_slides(1);
    let fetcher = ScriptedFetcher::new([
        Err(server_failure()),
        Err(server_failure()),
        Err(server_failure()),
    ]);

    let result = export_thumbnails(&source, &fetcher, "deck-1");
    match result {
        Err(DeckError::ApiError { status, .. }) => assert_eq!(status, 503),
        other => panic!("expected ApiError, got {:?}", other.map(|v| v.len())),
    }
    assert_eq!(fetcher.call_count(), 3);
    assert_eq!(&*source.requested_sizes.borrow(), &[ThumbnailSize::Large]);
}

#[test]
fn test_export_transport_error_falls_back_to_smaller_size() {
    let source = ScriptedSource::with_slides(1);
    let fetcher = ScriptedFetcher::new([Err(transport_failure()), Ok(b"medium".to_vec())]);

    let archive = export_thumbnails(&source, &fetcher, "deck-1").expect("export succeeds");
    assert_eq!(
        &*source.requested_sizes.borrow(),
        &[ThumbnailSize::Large, ThumbnailSize::Medium]
    );

    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("readable archive");
    assert!(zip.by_name("slide_01.png").is_ok());
}

#[test]
fn test_export_names_entries_sequentially() {
    let source = ScriptedSource::with_slides(3);
    let fetcher = ScriptedFetcher::new([
        Ok(b"one".to_vec()),
        Ok(b"two".to_vec()),
        Ok(b"three".to_vec()),
    ]);

    let archive = export_thumbnails(&source, &fetcher, "deck-1").expect("export succeeds");
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("readable archive");
    let names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).expect("entry").name().to_string())
        .collect();
    assert_eq!(names, vec!["slide_01.png", "slide_02.png", "slide_03.png"]);
}

// --- pipeline ------------------------------------------------------------

#[derive(Default)]
struct FakeDeckOps {
    calls: RefCell<Vec<String>>,
    fail_move: bool,
    fail_grant: bool,
}

impl DeckOps for FakeDeckOps {
    fn copy_template(&self, template_id: &str, title: &str) -> Result<String> {
        self.calls
            .borrow_mut()
            .push(format!("copy:{}:{}", template_id, title));
        Ok("deck-123".to_string())
    }

    fn move_to_folder(&self, file_id: &str, folder_id: &str) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(format!("move:{}:{}", file_id, folder_id));
        if self.fail_move {
            return Err(DeckError::ApiError {
                operation: "file move",
                status: 403,
                message: "folder is off limits".to_string(),
            });
        }
        Ok(())
    }

    fn replace_text(
        &self,
        presentation_id: &str,
        mapping: &std::collections::HashMap<String, String>,
    ) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(format!("replace:{}:{}", presentation_id, mapping.len()));
        Ok(())
    }

    fn grant_public_read(&self, file_id: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("grant:{}", file_id));
        if self.fail_grant {
            return Err(DeckError::ApiError {
                operation: "permission grant",
                status: 403,
                message: "cannot share".to_string(),
            });
        }
        Ok(())
    }

    fn view_url(&self, file_id: &str) -> Result<String> {
        self.calls.borrow_mut().push(format!("url:{}", file_id));
        Ok(format!("https://docs.test/{}", file_id))
    }
}

fn generate_options() -> GenerateOptions {
    GenerateOptions {
        template_id: "template-1".to_string(),
        folder_id: Some("folder-1".to_string()),
        title: None,
        topic: None,
    }
}

#[test]
fn test_generate_gates_on_missing_placeholders() {
    let ops = FakeDeckOps::default();
    let catalog = small_catalog();
    let text = "{{Title}} t\n"; // Subtitle and Body never supplied

    let result = generate_deck(&ops, &catalog, text, &generate_options());
    match result {
        Err(DeckError::MissingPlaceholders(missing)) => {
            assert_eq!(missing, vec!["{{Subtitle}}".to_string(), "{{Body}}".to_string()]);
        }
        other => panic!("expected MissingPlaceholders, got {:?}", other.map(|s| s.share_url)),
    }
    // The invariant: nothing remote happened.
    assert!(ops.calls.borrow().is_empty());
}

#[test]
fn test_generate_runs_steps_in_order() {
    let ops = FakeDeckOps::default();
    let catalog = small_catalog();
    let text = "{{Title}} Knowing Yourself\n{{Subtitle}} s\n{{Body}} b\n";

    let summary = generate_deck(&ops, &catalog, text, &generate_options()).expect("run succeeds");
    assert_eq!(summary.presentation_id, "deck-123");
    assert_eq!(summary.share_url, "https://docs.test/deck-123");
    assert!(summary.title.starts_with("Knowing Yourself | "));

    let calls = ops.calls.borrow();
    assert_eq!(calls.len(), 5);
    assert!(calls[0].starts_with("copy:template-1:"));
    assert_eq!(calls[1], "move:deck-123:folder-1");
    assert_eq!(calls[2], "replace:deck-123:3");
    assert_eq!(calls[3], "grant:deck-123");
    assert_eq!(calls[4], "url:deck-123");
}

#[test]
fn test_provision_survives_relocation_failure() {
    let ops = FakeDeckOps {
        fail_move: true,
        ..FakeDeckOps::default()
    };

    let file_id =
        provision(&ops, "template-1", "My Deck", Some("folder-1")).expect("copy is kept");
    assert_eq!(file_id, "deck-123");

    let calls = ops.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].starts_with("move:"));
}

#[test]
fn test_provision_skips_move_without_folder() {
    let ops = FakeDeckOps::default();
    provision(&ops, "template-1", "My Deck", None).expect("provision succeeds");
    assert_eq!(ops.calls.borrow().len(), 1);
}

#[test]
fn test_publish_grant_failure_yields_no_url() {
    let ops = FakeDeckOps {
        fail_grant: true,
        ..FakeDeckOps::default()
    };

    assert!(publish(&ops, "deck-123").is_err());
    let calls = ops.calls.borrow();
    assert_eq!(calls.len(), 1, "view URL must not be fetched after a failed grant");
}

#[test]
fn test_generate_prefers_explicit_title() {
    let ops = FakeDeckOps::default();
    let catalog = small_catalog();
    let text = "{{Title}} Knowing Yourself\n{{Subtitle}} s\n{{Body}} b\n";
    let options = GenerateOptions {
        title: Some("Handpicked Title".to_string()),
        ..generate_options()
    };

    let summary = generate_deck(&ops, &catalog, text, &options).expect("run succeeds");
    assert_eq!(summary.title, "Handpicked Title");
}
