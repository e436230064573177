use anyhow::Result;
use clap::{ Parser, Subcommand };
use serde_json::{ Map, Value };
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod client;
mod config;
mod embedding;
mod engine;
mod error;
mod media;
mod models;
mod render;
mod samples;
mod server;
mod session;
mod shell;
mod store;

use client::SearchClient;
use config::Config;
use embedding::FastEmbedder;
use engine::SearchEngine;
use session::{ run_image_drop, run_text_search, SearchMode, SearchSession, SearchStatus };
use store::Store;

#[derive(Parser)]
#[command(name = "mmsearch")]
#[command(version)]
#[command(about = "Multimodal search engine: text and image similarity search", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, env = "MMSEARCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Search service base URL (overrides the config file)
    #[arg(short, long, global = true)]
    url: Option<String>,

    /// Database directory (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP search service
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Query a running search service
    #[command(subcommand)]
    Search(SearchCommand),

    /// Add documents to a running search service
    #[command(subcommand)]
    Index(IndexCommand),

    /// Index every supported file under a directory straight into the local database
    IndexDir {
        path: PathBuf,
    },

    /// Load the bundled sample captions into the local database
    Seed,

    /// Interactive tabbed search
    Shell,
}

#[derive(Subcommand)]
enum SearchCommand {
    /// Search with a text query
    Text {
        query: String,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
    /// Search with an image file (.png, .jpg, .jpeg)
    Image {
        path: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum IndexCommand {
    Text {
        text: String,

        /// Metadata as a JSON object
        #[arg(short, long)]
        metadata: Option<String>,
    },
    Image {
        path: PathBuf,

        #[arg(short, long)]
        metadata: Option<String>,
    },
}

fn parse_metadata(raw: Option<&str>) -> Result<Option<Map<String, Value>>> {
    match raw {
        Some(raw) => {
            let parsed: Map<String, Value> = serde_json
                ::from_str(raw)
                .map_err(|e| anyhow::anyhow!("metadata must be a JSON object: {}", e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

async fn open_engine(config: &Config) -> Result<SearchEngine> {
    let store = Store::open(&config.db_path).await?;
    info!("Loading embedding models...");
    let embedder = FastEmbedder::new()?;
    Ok(SearchEngine::new(store, Arc::new(embedder), config.top_k))
}

async fn run_search(client: &SearchClient, command: SearchCommand) -> Result<()> {
    let mut session = SearchSession::new();
    let json = match command {
        SearchCommand::Text { query, json } => {
            session.set_query(query);
            if !run_text_search(&mut session, client).await {
                anyhow::bail!("query must not be empty");
            }
            json
        }
        SearchCommand::Image { path, json } => {
            session.set_mode(SearchMode::Image);
            run_image_drop(&mut session, client, &[path]).await?;
            json
        }
    };

    if let SearchStatus::Failed(message) = session.status() {
        anyhow::bail!("Search failed: {}", message);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(session.results())?);
    } else if let Some(rendered) = render::render_results(session.results()) {
        print!("{}", rendered);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "mmsearch=debug,info" } else { "info" };
    tracing_subscriber
        ::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter))
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.service_url = url;
    }
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    config.validate()?;

    let timeout = Duration::from_secs(config.request_timeout_secs);

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.host.clone());
            let port = port.unwrap_or(config.port);
            let engine = open_engine(&config).await?;
            server::run_server(engine, &host, port, config.max_upload_bytes).await?;
        }
        Commands::Search(command) => {
            let client = SearchClient::new(&config.service_url, timeout)?;
            run_search(&client, command).await?;
        }
        Commands::Index(command) => {
            let client = SearchClient::new(&config.service_url, timeout)?;
            let response = match command {
                IndexCommand::Text { text, metadata } => {
                    client.index_text(&text, parse_metadata(metadata.as_deref())?).await?
                }
                IndexCommand::Image { path, metadata } => {
                    if !media::is_accepted_image(&path) {
                        anyhow::bail!("{} is not a .png, .jpg or .jpeg image", path.display());
                    }
                    client.index_image(&path, parse_metadata(metadata.as_deref())?).await?
                }
            };
            println!("{} ({})", response.message, response.id);
        }
        Commands::IndexDir { path } => {
            let engine = open_engine(&config).await?;
            println!("Indexing files from {}...", path.display());
            let report = engine.index_directory(path).await?;
            println!(
                "Indexing complete! texts: {}, images: {}, skipped: {}, failed: {}",
                report.texts,
                report.images,
                report.skipped,
                report.failed
            );
        }
        Commands::Seed => {
            let engine = open_engine(&config).await?;
            let count = samples::seed(&engine).await?;
            println!("Sample data indexing complete! {} documents added.", count);
        }
        Commands::Shell => {
            let client = SearchClient::new(&config.service_url, timeout)?;
            shell::run_shell(client).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_search_subcommands() {
        let cli = Cli::try_parse_from(["mmsearch", "--url", "http://example:9000", "search", "text", "red car"]).unwrap();
        assert_eq!(cli.url.as_deref(), Some("http://example:9000"));
        assert!(matches!(cli.command, Commands::Search(SearchCommand::Text { ref query, json: false }) if query == "red car"));

        let cli = Cli::try_parse_from(["mmsearch", "search", "image", "cat.png", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Search(SearchCommand::Image { json: true, .. })));
    }

    #[test]
    fn metadata_must_be_an_object() {
        assert!(parse_metadata(Some(r#"{"source": "cli"}"#)).unwrap().is_some());
        assert!(parse_metadata(Some("[1, 2]")).is_err());
        assert!(parse_metadata(None).unwrap().is_none());
    }
}
