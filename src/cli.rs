//! Command-line interface definitions.
//!
//! Every option can also come from an environment variable. Values left unset
//! here fall back to the `.env` file, then the YAML config file, then the
//! built-in defaults (see [`crate::config`]).

use crate::publisher::DeliveryPolicy;
use clap::Parser;

/// Search the Guardian, stage the results locally, and stream them to Kinesis.
///
/// # Examples
///
/// ```sh
/// # Credentials and stream name from the environment / .env
/// news_relay
///
/// # Explicit stream and staging file
/// news_relay --stream-name news-articles --staging-file ./pending.json
///
/// # Keep records that failed to publish for the next run
/// news_relay --delivery retain-failed
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "NEWS_RELAY_CONFIG")]
    pub config: Option<String>,

    /// Path to the .env file read for missing settings
    #[arg(long, default_value = ".env")]
    pub env_file: String,

    /// Guardian content API key
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Search endpoint URL
    #[arg(long, env = "SEARCH_URL")]
    pub search_url: Option<String>,

    /// Kinesis stream receiving published records
    #[arg(short, long, env = "STREAM_NAME")]
    pub stream_name: Option<String>,

    /// AWS region of the stream
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// AWS access key id (falls back to the default credential chain)
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub aws_access_key_id: Option<String>,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_access_key: Option<String>,

    /// Local file holding records pending publication
    #[arg(long, env = "STAGING_FILE")]
    pub staging_file: Option<String>,

    /// Stream retention window set at startup, in hours
    #[arg(long)]
    pub retention_hours: Option<i32>,

    /// Search request timeout, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Number of articles requested per search
    #[arg(long, env = "PAGE_SIZE")]
    pub page_size: Option<u32>,

    /// What to do with records that fail to publish
    #[arg(long, value_enum)]
    pub delivery: Option<DeliveryPolicy>,
}
