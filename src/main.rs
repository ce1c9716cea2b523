use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use folio_rag::config::Config;
use folio_rag::embedder::Embedder;
use folio_rag::embedder::mock::MockEmbedder;
use folio_rag::embedder::openai::OpenAiEmbedder;
use folio_rag::generator::Generator;
use folio_rag::generator::mock::MockGenerator;
use folio_rag::generator::openai::OpenAiGenerator;
use folio_rag::indexer::loader;
use folio_rag::mcp::server::{McpContext, McpServer};
use folio_rag::session::{self, RagSession};

/// Answer questions about a personal knowledge base with retrieval-augmented generation.
#[derive(Parser, Debug)]
#[command(name = "folio-rag", version)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, global = true, default_value = folio_rag::config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Use the deterministic mock models instead of the OpenAI API
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve,
    /// Serve the MCP `ask` tool on stdio
    Mcp,
    /// Build and persist the vector index
    Index {
        /// Rebuild even if a valid index artifact exists
        #[arg(long)]
        force: bool,
    },
    /// Answer a single question and print the result as JSON
    Ask { question: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = dotenvy::dotenv().ok();

    // Logs go to stderr so the MCP stdio transport stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    config.apply_env_overrides()?;
    config.validate()?;

    let (embedder, generator) = models(&config, cli.offline)?;
    info!(
        data_path = %config.data_path,
        pdf = loader::pdf_support_enabled(),
        "corpus settings"
    );

    match cli.command {
        Command::Serve => {
            let session = Arc::new(RagSession::new(config, embedder, generator)?);
            folio_rag::server::serve(session).await?;
        }
        Command::Mcp => {
            let session = Arc::new(RagSession::new(config, embedder, generator)?);
            McpServer::new(McpContext { session }).start().await?;
        }
        Command::Index { force } => {
            let path = Path::new(&config.index_path);
            if !force && let Some(index) = session::restore_compatible(path, embedder.as_ref())? {
                info!(
                    chunks = index.len(),
                    built_at = %index.built_at(),
                    "index artifact is up to date, use --force to rebuild"
                );
                return Ok(());
            }
            let index = session::rebuild_index(&config, embedder.as_ref())
                .await
                .context("failed to build the vector index")?;
            info!(chunks = index.len(), path = %path.display(), "index written");
        }
        Command::Ask { question } => {
            let session = RagSession::new(config, embedder, generator)?;
            session.initialize().await?;
            let answer = session.answer(&question).await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
    }

    Ok(())
}

fn models(config: &Config, offline: bool) -> Result<(Arc<dyn Embedder>, Arc<dyn Generator>)> {
    if offline {
        info!("Using offline mock models");
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::default());
        let generator: Arc<dyn Generator> = Arc::new(MockGenerator::echo());
        return Ok((embedder, generator));
    }

    let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::new(
        config.openai.api_key.clone(),
        config.openai.base_url.clone(),
        config.embedding.model.clone(),
        config.embedding.dimensions,
    )
    .context("OPENAI_API_KEY is required unless --offline is set")?);

    let generator: Arc<dyn Generator> = Arc::new(OpenAiGenerator::new(
        config.openai.api_key.clone(),
        config.openai.base_url.clone(),
        config.generation.model.clone(),
        config.generation.temperature,
    )?);

    Ok((embedder, generator))
}
