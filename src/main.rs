// ABOUTME: Main entry point for the decksmith program.
// ABOUTME: Provides CLI interface and executes commands from the library.

use clap::{Args, Parser, Subcommand};
use decksmith::{
    Authenticator, ClientSecrets, Config, DeckError, DriveClient, FileTokenStore, GenerateOptions,
    GoogleDeckOps, HttpImageFetcher, PlaceholderCatalog, SlidesClient,
};
use std::fs;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a shareable deck from pasted lesson content
    Generate(GenerateArgs),

    /// Parse content and report missing placeholders, without remote calls
    Check(CheckArgs),

    /// Export slide thumbnails of an existing presentation as a ZIP
    ExportImages(ExportImagesArgs),

    /// Print the active placeholder catalog
    Placeholders(PlaceholdersArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Path to the pasted content file; reads stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Template presentation ID (overrides DECKSMITH_TEMPLATE_ID)
    #[arg(long)]
    template_id: Option<String>,

    /// Destination Drive folder ID (overrides DECKSMITH_FOLDER_ID)
    #[arg(long)]
    folder_id: Option<String>,

    /// Explicit deck title; derived from content when omitted
    #[arg(long)]
    title: Option<String>,

    /// Topic used as a title fallback when the content has no {{Title}}
    #[arg(long)]
    topic: Option<String>,

    /// Custom placeholder catalog file, one token per line
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Also export slide thumbnails of the new deck to this ZIP path
    #[arg(long)]
    images: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    /// Path to the pasted content file; reads stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Custom placeholder catalog file, one token per line
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(Args)]
struct ExportImagesArgs {
    /// ID of the presentation to export
    #[arg(long)]
    presentation_id: String,

    /// Output ZIP path
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct PlaceholdersArgs {
    /// Custom placeholder catalog file, one token per line
    #[arg(long)]
    catalog: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Generate(args)) => run_generate(args),
        Some(Commands::Check(args)) => run_check(args),
        Some(Commands::ExportImages(args)) => run_export_images(args),
        Some(Commands::Placeholders(args)) => run_placeholders(args),
        None => {
            println!("No command specified. Use --help for usage information.");
            Ok(())
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_generate(args: &GenerateArgs) -> decksmith::Result<()> {
    let config = Config::from_env();
    let raw_text = read_input(&args.input)?;
    let catalog = load_catalog(&args.catalog)?;

    let template_id = args
        .template_id
        .clone()
        .or_else(|| config.template_id.clone())
        .ok_or_else(|| {
            DeckError::ConfigError(
                "No template ID given. Pass --template-id or set DECKSMITH_TEMPLATE_ID."
                    .to_string(),
            )
        })?;

    let options = GenerateOptions {
        template_id,
        folder_id: args.folder_id.clone().or_else(|| config.folder_id.clone()),
        title: args.title.clone(),
        topic: args.topic.clone(),
    };

    let token = access_token(&config)?;
    let ops = GoogleDeckOps {
        drive: DriveClient::new(token.clone())?,
        slides: SlidesClient::new(token.clone())?,
    };

    let summary = decksmith::generate_deck(&ops, &catalog, &raw_text, &options)?;
    println!("Deck created: {}", summary.title);
    println!("Share link: {}", summary.share_url);

    if let Some(images_path) = &args.images {
        let fetcher = HttpImageFetcher::new(token, config.download_timeout())?;
        let archive = decksmith::export_thumbnails(&ops.slides, &fetcher, &summary.presentation_id)?;
        write_archive(images_path, &archive)?;
        println!("Slide images written to {:?}", images_path);
    }

    Ok(())
}

fn run_check(args: &CheckArgs) -> decksmith::Result<()> {
    let raw_text = read_input(&args.input)?;
    let catalog = load_catalog(&args.catalog)?;

    let parsed = decksmith::parse(&raw_text, &catalog);
    println!(
        "Matched {} of {} placeholders.",
        catalog.len() - parsed.missing.len(),
        catalog.len()
    );

    if parsed.is_complete() {
        println!("All placeholders present.");
        Ok(())
    } else {
        for key in &parsed.missing {
            println!("missing: {}", key);
        }
        Err(DeckError::MissingPlaceholders(parsed.missing))
    }
}

fn run_export_images(args: &ExportImagesArgs) -> decksmith::Result<()> {
    let config = Config::from_env();
    let token = access_token(&config)?;

    let slides = SlidesClient::new(token.clone())?;
    let fetcher = HttpImageFetcher::new(token, config.download_timeout())?;
    let archive = decksmith::export_thumbnails(&slides, &fetcher, &args.presentation_id)?;
    write_archive(&args.output, &archive)?;
    println!("Slide images written to {:?}", args.output);

    Ok(())
}

fn run_placeholders(args: &PlaceholdersArgs) -> decksmith::Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    for key in catalog.keys() {
        println!("{}", key);
    }
    Ok(())
}

/// Read pasted content from a file, or from stdin when no path is given.
fn read_input(path: &Option<PathBuf>) -> decksmith::Result<String> {
    match path {
        Some(path) => {
            decksmith::utils::validate_file_exists(path)?;
            fs::read_to_string(path).map_err(DeckError::FileReadError)
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(DeckError::FileReadError)?;
            Ok(buffer)
        }
    }
}

fn load_catalog(path: &Option<PathBuf>) -> decksmith::Result<PlaceholderCatalog> {
    match path {
        Some(path) => PlaceholderCatalog::from_file(path),
        None => Ok(PlaceholderCatalog::lesson_deck()),
    }
}

fn access_token(config: &Config) -> decksmith::Result<String> {
    decksmith::utils::validate_file_exists(&config.client_secrets_path)?;
    let secrets = ClientSecrets::from_file(&config.client_secrets_path)?;
    let store = FileTokenStore::new(config.token_path.clone());
    let authenticator = Authenticator::new(secrets, store)?;
    authenticator.access_token()
}

fn write_archive(path: &PathBuf, archive: &[u8]) -> decksmith::Result<()> {
    decksmith::utils::ensure_parent_directory_exists(path)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            decksmith::utils::validate_directory_writable(parent)?;
        }
    }
    fs::write(path, archive).map_err(DeckError::FileReadError)
}
