//! Runtime configuration.
//!
//! Settings are resolved once at startup into an [`AppConfig`] that is passed
//! by reference to every component. Precedence, highest first:
//!
//! 1. command-line flags and their environment variables ([`Cli`])
//! 2. the `.env` file (keys are also accepted in lower case, e.g.
//!    `stream_name`, `region_name`, `aws_access_key_id`)
//! 3. the optional YAML config file
//! 4. built-in defaults
//!
//! A missing API key or stream name is logged but not rejected; the search
//! API or the stream reports the failure when the value is first used.

use crate::cli::Cli;
use crate::publisher::DeliveryPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_SEARCH_URL: &str = "https://content.guardianapis.com/search";
pub const DEFAULT_STAGING_FILE: &str = "data.json";
pub const DEFAULT_RETENTION_HOURS: i32 = 72;
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Connection settings for the event stream service.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AwsSettings {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// Shape of the optional YAML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub search_url: Option<String>,
    pub stream_name: Option<String>,
    pub aws: AwsSettings,
    pub staging_file: Option<String>,
    pub retention_hours: Option<i32>,
    pub request_timeout_secs: Option<u64>,
    pub page_size: Option<u32>,
    pub delivery: Option<DeliveryPolicy>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
        let config: FileConfig = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {e}", path.display()))?;
        Ok(config)
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub search_url: String,
    pub stream_name: String,
    pub aws: AwsSettings,
    pub staging_file: PathBuf,
    pub retention_hours: i32,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub delivery: DeliveryPolicy,
}

impl AppConfig {
    /// Resolve configuration from the CLI, the `.env` file, and the config file.
    pub fn load(cli: &Cli) -> Result<Self, Box<dyn Error>> {
        let dotenv = read_env_file(Path::new(&cli.env_file));
        let file = match &cli.config {
            Some(path) => {
                let file = FileConfig::load(Path::new(path))?;
                info!(config_path = %path, "Loaded configuration file");
                file
            }
            None => FileConfig::default(),
        };
        Self::from_sources(cli, &dotenv, file)
    }

    pub fn from_sources(
        cli: &Cli,
        dotenv: &HashMap<String, String>,
        file: FileConfig,
    ) -> Result<Self, Box<dyn Error>> {
        let lookup = |keys: &[&str]| keys.iter().find_map(|k| dotenv.get(*k).cloned());

        let api_key = cli
            .api_key
            .clone()
            .or_else(|| lookup(&["API_KEY"]))
            .or(file.api_key)
            .unwrap_or_default();
        let search_url = cli
            .search_url
            .clone()
            .or_else(|| lookup(&["SEARCH_URL"]))
            .or(file.search_url)
            .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string());
        Url::parse(&search_url).map_err(|e| format!("Invalid search URL {search_url:?}: {e}"))?;

        let stream_name = cli
            .stream_name
            .clone()
            .or_else(|| lookup(&["STREAM_NAME", "stream_name"]))
            .or(file.stream_name)
            .unwrap_or_default();

        let aws = AwsSettings {
            region: cli
                .region
                .clone()
                .or_else(|| lookup(&["AWS_REGION", "region_name"]))
                .or(file.aws.region),
            access_key_id: cli
                .aws_access_key_id
                .clone()
                .or_else(|| lookup(&["AWS_ACCESS_KEY_ID", "aws_access_key_id"]))
                .or(file.aws.access_key_id),
            secret_access_key: cli
                .aws_secret_access_key
                .clone()
                .or_else(|| lookup(&["AWS_SECRET_ACCESS_KEY", "aws_secret_access_key"]))
                .or(file.aws.secret_access_key),
        };

        let staging_file = cli
            .staging_file
            .clone()
            .or_else(|| lookup(&["STAGING_FILE"]))
            .or(file.staging_file)
            .unwrap_or_else(|| DEFAULT_STAGING_FILE.to_string());

        let config = Self {
            api_key,
            search_url,
            stream_name,
            aws,
            staging_file: PathBuf::from(staging_file),
            retention_hours: cli
                .retention_hours
                .or(file.retention_hours)
                .unwrap_or(DEFAULT_RETENTION_HOURS),
            request_timeout: Duration::from_secs(
                cli.timeout_secs
                    .or(file.request_timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            page_size: cli
                .page_size
                .or_else(|| lookup(&["PAGE_SIZE"]).and_then(|v| v.parse().ok()))
                .or(file.page_size)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            delivery: cli.delivery.or(file.delivery).unwrap_or_default(),
        };

        if config.api_key.is_empty() {
            warn!("No API key configured; searches will be rejected by the API");
        }
        if config.stream_name.is_empty() {
            warn!("No stream name configured; stream calls will fail");
        }
        debug!(
            search_url = %config.search_url,
            stream_name = %config.stream_name,
            staging_file = %config.staging_file.display(),
            retention_hours = config.retention_hours,
            delivery = ?config.delivery,
            "Resolved configuration"
        );
        Ok(config)
    }
}

/// Parse `KEY=value` lines. Blank lines and `#` comments are skipped and
/// surrounding quotes are stripped from values.
pub fn parse_env_file(content: &str) -> HashMap<String, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Read a `.env` file; a missing or unreadable file yields no settings.
pub fn read_env_file(path: &Path) -> HashMap<String, String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let vars = parse_env_file(&content);
            debug!(path = %path.display(), count = vars.len(), "Read .env file");
            vars
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No .env file loaded");
            HashMap::new()
        }
    }
}
