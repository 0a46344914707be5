//! # News Relay
//!
//! An interactive tool that searches the Guardian content API, stages the
//! matching articles in a local JSON file, and on confirmation streams them
//! one by one to an AWS Kinesis data stream.
//!
//! ## Usage
//!
//! ```sh
//! news_relay --stream-name news-articles --region eu-west-2
//! ```
//!
//! ## Flow
//!
//! 1. **Startup**: resolve configuration, raise the stream's retention window
//! 2. **Search**: prompt for a query and start date, fetch up to 10 articles
//! 3. **Stage**: append each article to the staging file
//! 4. **Publish**: on confirmation, push every staged record and settle the file
//!
//! Steps 2–4 repeat until the user declines another search.

use clap::Parser;
use std::error::Error;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod console;
mod dates;
mod models;
mod publisher;
mod search;
mod session;
mod staging;
mod stream;
mod utils;

use cli::Cli;
use config::AppConfig;
use console::StdConsole;
use search::SearchClient;
use session::Session;
use staging::JsonFileStore;
use stream::{KinesisStream, configure_retention};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    // Logs go to stderr so they stay out of the interactive prompts.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_relay starting up");

    let args = Cli::parse();
    let config = AppConfig::load(&args)?;

    let stream = KinesisStream::connect(&config.aws).await;
    if let Err(e) = configure_retention(&stream, &config.stream_name, config.retention_hours).await {
        error!(stream = %config.stream_name, error = %e, "Could not configure stream retention");
        return Err(e.into());
    }

    let store = JsonFileStore::open(&config.staging_file).await?;
    info!(path = %store.path().display(), "Staging store ready");
    let search = SearchClient::new(&config)?;

    let mut console = StdConsole;
    Session::new(&config, &mut console, &search, &store, &stream)
        .run()
        .await?;

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Exiting");
    Ok(())
}
