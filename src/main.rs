//! Server entry point for bookstream.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use url::Url;

use bookstream::api::WebBookProvider;
use bookstream::assets::AssetCatalog;
use bookstream::counter::{DownloadCounter, SqliteDownloadCounter};
use bookstream::fetch::RetryPolicy;
use bookstream::notify::{Notifier, TelegramNotifier};
use bookstream::server::{AppState, serve};
use bookstream::session::{SessionConfig, SessionDeps, SessionRegistry};

mod cli;

use cli::Args;

#[actix_web::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Bookstream starting");

    // Asset failure is fatal before any session can start.
    let assets = AssetCatalog::load(&args.assets_dir)
        .with_context(|| format!("failed to load preface assets from {}", args.assets_dir.display()))?;

    let base = Url::parse(&args.api_base).context("invalid API base URL")?;

    let counter: Option<Arc<dyn DownloadCounter>> = match &args.counter_db {
        Some(path) => {
            let counter = SqliteDownloadCounter::new(path)
                .await
                .context("failed to open download counter database")?;
            Some(Arc::new(counter))
        }
        None => {
            debug!("download counter disabled");
            None
        }
    };

    let notifier: Option<Arc<dyn Notifier>> =
        match (args.telegram_bot_token, args.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some(Arc::new(TelegramNotifier::new(token, chat_id))),
            _ => {
                debug!("completion notifications disabled");
                None
            }
        };

    let state = AppState {
        deps: SessionDeps {
            api: Arc::new(WebBookProvider::new(base, RetryPolicy::default())),
            assets: Arc::new(assets),
            counter,
            notifier,
        },
        registry: Arc::new(SessionRegistry::new()),
        config: SessionConfig::default(),
    };

    info!(bind = %args.bind, port = args.port, "listening");
    serve(state, &args.bind, args.port)
        .await
        .context("HTTP server failed")
}
