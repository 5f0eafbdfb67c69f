//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use bookstream::api::DEFAULT_API_BASE;

/// Stream book chapters over SSE with human-paced fetching.
///
/// Bookstream exposes a download endpoint that walks a book's chapters
/// one at a time, pacing its upstream requests like a human reader, and
/// streams each chapter back as server-sent events.
#[derive(Parser, Debug)]
#[command(name = "bookstream")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Address to bind the HTTP server to
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 7880)]
    pub port: u16,

    /// Base URL of the upstream book API
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Directory holding the preface style/script assets
    #[arg(long, default_value = "assets")]
    pub assets_dir: PathBuf,

    /// SQLite file for the download counter (omit to disable counting)
    #[arg(long)]
    pub counter_db: Option<PathBuf>,

    /// Telegram bot token for completion notifications
    #[arg(long)]
    pub telegram_bot_token: Option<String>,

    /// Telegram chat id for completion notifications
    #[arg(long)]
    pub telegram_chat_id: Option<String>,
}
