//! Event stream client.
//!
//! [`EventStream`] is the seam between the publisher and the managed stream
//! service. [`KinesisStream`] implements it over `aws-sdk-kinesis`; tests use
//! an in-memory fake.

use crate::config::AwsSettings;
use crate::models::PublishReceipt;
use aws_config::BehaviorVersion;
use aws_sdk_kinesis::config::{Credentials, Region};
use aws_sdk_kinesis::error::DisplayErrorContext;
use aws_sdk_kinesis::primitives::Blob;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to set retention on stream {stream}: {message}")]
    Retention { stream: String, message: String },
    #[error("failed to put record on stream {stream}: {message}")]
    PutRecord { stream: String, message: String },
}

/// Operations consumed from the managed event stream.
pub trait EventStream {
    /// Raise the stream's retention window to `hours`.
    async fn increase_retention(&self, stream: &str, hours: i32) -> Result<(), StreamError>;

    /// Push one opaque payload under `partition_key`.
    async fn put_record(
        &self,
        stream: &str,
        payload: Vec<u8>,
        partition_key: &str,
    ) -> Result<PublishReceipt, StreamError>;
}

/// [`EventStream`] backed by an AWS Kinesis data stream.
#[derive(Clone)]
pub struct KinesisStream {
    client: aws_sdk_kinesis::Client,
}

impl fmt::Debug for KinesisStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KinesisStream").finish_non_exhaustive()
    }
}

impl KinesisStream {
    /// Build a client from explicit settings.
    ///
    /// Region and static credentials are used when present; anything left
    /// unset falls back to the SDK's default provider chain.
    #[instrument(level = "info", skip_all, fields(region = ?settings.region))]
    pub async fn connect(settings: &AwsSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        match (&settings.access_key_id, &settings.secret_access_key) {
            (Some(key_id), Some(secret)) => {
                debug!("Using static credentials from configuration");
                loader = loader.credentials_provider(Credentials::new(
                    key_id.clone(),
                    secret.clone(),
                    None,
                    None,
                    "news_relay",
                ));
            }
            (None, None) => debug!("Using default AWS credential chain"),
            _ => warn!("Only one of access key id / secret access key configured; using default credential chain"),
        }
        let sdk_config = loader.load().await;
        info!("Kinesis client ready");
        Self {
            client: aws_sdk_kinesis::Client::new(&sdk_config),
        }
    }
}

impl EventStream for KinesisStream {
    #[instrument(level = "info", skip(self))]
    async fn increase_retention(&self, stream: &str, hours: i32) -> Result<(), StreamError> {
        self.client
            .increase_stream_retention_period()
            .stream_name(stream)
            .retention_period_hours(hours)
            .send()
            .await
            .map_err(|e| StreamError::Retention {
                stream: stream.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self, payload), fields(bytes = payload.len()))]
    async fn put_record(
        &self,
        stream: &str,
        payload: Vec<u8>,
        partition_key: &str,
    ) -> Result<PublishReceipt, StreamError> {
        let output = self
            .client
            .put_record()
            .stream_name(stream)
            .data(Blob::new(payload))
            .partition_key(partition_key)
            .send()
            .await
            .map_err(|e| StreamError::PutRecord {
                stream: stream.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(PublishReceipt {
            sequence_number: output.sequence_number().to_string(),
            shard_id: output.shard_id().to_string(),
        })
    }
}

/// Set the destination stream's retention window once at startup.
///
/// Errors are returned to the caller, which treats them as fatal.
#[instrument(level = "info", skip(stream))]
pub async fn configure_retention<S: EventStream>(
    stream: &S,
    stream_name: &str,
    hours: i32,
) -> Result<(), StreamError> {
    let t0 = Instant::now();
    stream.increase_retention(stream_name, hours).await?;
    info!(
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Stream retention window configured"
    );
    Ok(())
}

#[cfg(test)]
pub mod fake {
    //! In-memory [`EventStream`] for tests.

    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    #[derive(Debug, Default)]
    pub struct FakeStream {
        /// (stream, payload, partition key) for every accepted record.
        pub records: RefCell<Vec<(String, Vec<u8>, String)>>,
        pub retention: RefCell<Option<(String, i32)>>,
        /// Zero-based put indices that fail.
        pub fail_on: HashSet<usize>,
        pub fail_retention: bool,
        puts: RefCell<usize>,
    }

    impl FakeStream {
        pub fn failing_on(indices: impl IntoIterator<Item = usize>) -> Self {
            Self {
                fail_on: indices.into_iter().collect(),
                ..Self::default()
            }
        }

        pub fn failing_retention() -> Self {
            Self {
                fail_retention: true,
                ..Self::default()
            }
        }
    }

    impl EventStream for FakeStream {
        async fn increase_retention(&self, stream: &str, hours: i32) -> Result<(), StreamError> {
            if self.fail_retention {
                return Err(StreamError::Retention {
                    stream: stream.to_string(),
                    message: "ResourceNotFoundException".to_string(),
                });
            }
            *self.retention.borrow_mut() = Some((stream.to_string(), hours));
            Ok(())
        }

        async fn put_record(
            &self,
            stream: &str,
            payload: Vec<u8>,
            partition_key: &str,
        ) -> Result<PublishReceipt, StreamError> {
            let index = {
                let mut puts = self.puts.borrow_mut();
                let index = *puts;
                *puts += 1;
                index
            };
            if self.fail_on.contains(&index) {
                return Err(StreamError::PutRecord {
                    stream: stream.to_string(),
                    message: "ProvisionedThroughputExceededException".to_string(),
                });
            }
            self.records
                .borrow_mut()
                .push((stream.to_string(), payload, partition_key.to_string()));
            Ok(PublishReceipt {
                sequence_number: format!("{}", 1000 + index),
                shard_id: "shardId-000000000000".to_string(),
            })
        }
    }
}
