//! websearch-relay CLI
//!
//! Usage:
//!   websearch-relay search "rust async programming" --num-results 5
//!   websearch-relay fetch https://www.rust-lang.org/ 2000
//!   websearch-relay --config relay.json search "tokio broadcast"

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use websearch_relay::tools::{FetchPageArgs, WebSearchArgs};
use websearch_relay::{Toolkit, ToolkitConfig};

#[derive(Parser)]
#[command(name = "websearch-relay")]
#[command(about = "Browser-driven web search with engine failover and page extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(long, short, env = "WEBSEARCH_RELAY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Run the browser with a visible window
    #[arg(long, global = true)]
    headed: bool,

    /// Increase verbosity (-v debug, -vv trace). Default is info.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the web with engine failover
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(long, short)]
        num_results: Option<usize>,
    },
    /// Fetch a page and print its readable text
    Fetch {
        /// Absolute http(s) URL
        url: String,

        /// Maximum characters of content (default 5000)
        max_length: Option<usize>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    // stdout carries the JSON answer
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ToolkitConfig> {
    let Some(path) = path else {
        return Ok(ToolkitConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    ToolkitConfig::from_json_str(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    if cli.headed {
        config.browser.headless = false;
    }

    let toolkit = Toolkit::new(config).context("failed to build toolkit")?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            ctrl_c_cancel.cancel();
        }
    });

    let result = run(&toolkit, cli.command, &cancel).await;
    toolkit.shutdown().await;

    let output = result?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(toolkit: &Toolkit, command: Commands, cancel: &CancellationToken) -> Result<serde_json::Value> {
    match command {
        Commands::Search { query, num_results } => {
            let response = toolkit
                .web_search_tool()
                .search(WebSearchArgs { query, num_results }, cancel)
                .await;
            Ok(serde_json::to_value(response)?)
        }
        Commands::Fetch { url, max_length } => {
            let page = toolkit
                .fetch_page_tool()
                .fetch(FetchPageArgs { url: url.clone(), max_length }, cancel)
                .await
                .with_context(|| format!("failed to fetch {url}"))?;
            Ok(serde_json::to_value(page)?)
        }
    }
}
