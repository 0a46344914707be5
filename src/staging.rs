//! Local staging store for records awaiting publication.
//!
//! The store is a durable queue with append, read-all, clear, and replace
//! operations. [`JsonFileStore`] keeps the queue as a single pretty-printed
//! JSON array on disk; tests use an in-process `MemoryStore`. Callers only see
//! the [`StagingStore`] trait.
//!
//! Access is single-threaded. Each file mutation is a full read-modify-write
//! of the array; writes are not atomic across crashes.

use crate::models::ArticleRecord;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("staging file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("staging file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("staging file {0} does not contain a JSON array")]
    NotAnArray(PathBuf),
    #[error("failed to encode staged records: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What happened to a record passed to [`StagingStore::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Stored,
    /// The backing data was not an array; nothing was written.
    Skipped,
}

pub trait StagingStore {
    async fn append(&self, record: &ArticleRecord) -> Result<AppendOutcome, StagingError>;
    async fn read_all(&self) -> Result<Vec<ArticleRecord>, StagingError>;
    async fn clear(&self) -> Result<(), StagingError>;
    /// Overwrite the queue with exactly `records`.
    async fn replace(&self, records: &[ArticleRecord]) -> Result<(), StagingError>;
}

/// Staging store backed by one JSON file holding an array of records.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store at `path`, creating the file as `[]` if it is absent.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StagingError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        match fs::try_exists(&store.path).await {
            Ok(true) => debug!("Using existing staging file"),
            Ok(false) => {
                store.write_value(&Value::Array(Vec::new())).await?;
                info!("Initialized empty staging file");
            }
            Err(e) => return Err(store.io_error(e)),
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StagingError {
        StagingError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Read the raw JSON value; a missing file reads as an empty array.
    async fn read_value(&self) -> Result<Value, StagingError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Value::Array(Vec::new())),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_str(&content).map_err(|source| StagingError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_value<T: Serialize>(&self, value: &T) -> Result<(), StagingError> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        value.serialize(&mut ser)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
        }
        fs::write(&self.path, buf).await.map_err(|e| self.io_error(e))
    }
}

impl StagingStore for JsonFileStore {
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn append(&self, record: &ArticleRecord) -> Result<AppendOutcome, StagingError> {
        let mut existing = self.read_value().await?;
        let Some(items) = existing.as_array_mut() else {
            warn!("Staging file does not hold a JSON array; record not staged");
            println!("Unexpected data format in the JSON file.");
            return Ok(AppendOutcome::Skipped);
        };
        items.push(serde_json::to_value(record)?);
        self.write_value(&existing).await?;
        debug!(staged = existing.as_array().map_or(0, Vec::len), "Record staged");
        Ok(AppendOutcome::Stored)
    }

    async fn read_all(&self) -> Result<Vec<ArticleRecord>, StagingError> {
        match self.read_value().await? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| {
                    serde_json::from_value(item).map_err(|source| StagingError::Parse {
                        path: self.path.clone(),
                        source,
                    })
                })
                .collect(),
            _ => Err(StagingError::NotAnArray(self.path.clone())),
        }
    }

    async fn clear(&self) -> Result<(), StagingError> {
        self.write_value(&Value::Array(Vec::new())).await?;
        info!(path = %self.path.display(), "Staging file cleared");
        Ok(())
    }

    async fn replace(&self, records: &[ArticleRecord]) -> Result<(), StagingError> {
        self.write_value(&records).await?;
        info!(path = %self.path.display(), remaining = records.len(), "Staging file rewritten");
        Ok(())
    }
}

/// In-process staging store.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: std::cell::RefCell<Vec<ArticleRecord>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl StagingStore for MemoryStore {
    async fn append(&self, record: &ArticleRecord) -> Result<AppendOutcome, StagingError> {
        self.records.borrow_mut().push(record.clone());
        Ok(AppendOutcome::Stored)
    }

    async fn read_all(&self) -> Result<Vec<ArticleRecord>, StagingError> {
        Ok(self.records.borrow().clone())
    }

    async fn clear(&self) -> Result<(), StagingError> {
        self.records.borrow_mut().clear();
        Ok(())
    }

    async fn replace(&self, records: &[ArticleRecord]) -> Result<(), StagingError> {
        *self.records.borrow_mut() = records.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(title: &str) -> ArticleRecord {
        ArticleRecord {
            web_title: title.to_string(),
            web_publication_date: "2024-01-01T00:00:00Z".to_string(),
            web_url: format!("https://example.com/{title}"),
        }
    }

    #[tokio::test]
    async fn test_open_initializes_empty_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_keeps_existing_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, serde_json::to_string(&vec![record("kept")]).unwrap()).unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.read_all().await.unwrap(), vec![record("kept")]);
    }

    #[tokio::test]
    async fn test_append_is_cumulative_and_ordered() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("data.json")).await.unwrap();

        assert_eq!(store.append(&record("r1")).await.unwrap(), AppendOutcome::Stored);
        assert_eq!(store.append(&record("r2")).await.unwrap(), AppendOutcome::Stored);

        assert_eq!(store.read_all().await.unwrap(), vec![record("r1"), record("r2")]);
    }

    #[tokio::test]
    async fn test_append_to_missing_file_creates_it() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data.json");
        let store = JsonFileStore { path: path.clone() };

        store.append(&record("first")).await.unwrap();
        assert!(path.exists());
        assert_eq!(store.read_all().await.unwrap(), vec![record("first")]);
    }

    #[tokio::test]
    async fn test_file_is_pretty_printed_with_api_keys() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("data.json")).await.unwrap();
        store.append(&record("pretty")).await.unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("[\n    {\n        \""));
        assert!(content.contains("\n        \"webTitle\": \"pretty\""));
        assert!(content.contains("\"webPublicationDate\""));
        assert!(content.contains("\"webUrl\""));
    }

    #[tokio::test]
    async fn test_append_skips_non_array_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"not": "an array"}"#).unwrap();
        let store = JsonFileStore::open(&path).await.unwrap();

        assert_eq!(store.append(&record("lost")).await.unwrap(), AppendOutcome::Skipped);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"not": "an array"}"#);
        assert!(matches!(store.read_all().await, Err(StagingError::NotAnArray(_))));
    }

    #[tokio::test]
    async fn test_append_reports_unparseable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "[{").unwrap();
        let store = JsonFileStore::open(&path).await.unwrap();

        assert!(matches!(
            store.append(&record("x")).await,
            Err(StagingError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_clear_and_replace() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("data.json")).await.unwrap();
        store.append(&record("a")).await.unwrap();
        store.append(&record("b")).await.unwrap();

        store.replace(&[record("b")]).await.unwrap();
        assert_eq!(store.read_all().await.unwrap(), vec![record("b")]);

        store.clear().await.unwrap();
        assert!(store.read_all().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_memory_store_matches_file_semantics() {
        let store = MemoryStore::new();
        store.append(&record("r1")).await.unwrap();
        store.append(&record("r2")).await.unwrap();
        assert_eq!(store.read_all().await.unwrap(), vec![record("r1"), record("r2")]);

        store.replace(&[record("r2")]).await.unwrap();
        assert_eq!(store.read_all().await.unwrap(), vec![record("r2")]);

        store.clear().await.unwrap();
        assert!(store.read_all().await.unwrap().is_empty());
    }
}
