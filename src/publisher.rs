//! Sequential publishing of staged records to the event stream.
//!
//! Records are pushed one at a time in staged order. A failed push is logged
//! and the loop moves on; nothing is retried within a run. Once every record
//! has been attempted the staging store is updated according to the
//! configured [`DeliveryPolicy`].

use crate::models::{ArticleRecord, PublishReport};
use crate::staging::{StagingError, StagingStore};
use crate::stream::EventStream;
use chrono::Utc;
use clap::ValueEnum;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

/// What happens to the staging store after a publish run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryPolicy {
    /// Clear every staged record, delivered or not (at-most-once).
    #[default]
    BestEffort,
    /// Keep the records whose push failed for the next run.
    RetainFailed,
}

/// Partition key derived from the current wall-clock time,
/// rendered as `<unix seconds>.<microseconds>`.
pub fn partition_key() -> String {
    let now = Utc::now();
    format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())
}

/// Push every record in `records` to `stream_name`, in order.
///
/// Never fails: per-record errors are collected in the report.
#[instrument(level = "info", skip(stream, records), fields(count = records.len()))]
pub async fn publish_records<S: EventStream>(
    stream: &S,
    stream_name: &str,
    records: &[ArticleRecord],
) -> PublishReport {
    let mut report = PublishReport::default();

    for (i, record) in records.iter().enumerate() {
        report.attempted += 1;
        let payload = match serde_json::to_vec(record) {
            Ok(payload) => payload,
            Err(e) => {
                error!(index = i, error = %e, "Failed to encode record");
                report.failed.push(record.clone());
                continue;
            }
        };

        match stream.put_record(stream_name, payload, &partition_key()).await {
            Ok(receipt) => {
                info!(
                    index = i,
                    sequence_number = %receipt.sequence_number,
                    shard_id = %receipt.shard_id,
                    "Record published"
                );
                report.receipts.push(receipt);
            }
            Err(e) => {
                warn!(index = i, title = %record.web_title, error = %e, "Record publish failed");
                println!("Error uploading to Kinesis: {e}");
                report.failed.push(record.clone());
            }
        }
    }

    info!(
        attempted = report.attempted,
        published = report.receipts.len(),
        failed = report.failed.len(),
        "Publish run complete"
    );
    report
}

/// Publish everything currently staged, then settle the store per `policy`.
pub async fn publish_staged<St, S>(
    store: &St,
    stream: &S,
    stream_name: &str,
    policy: DeliveryPolicy,
) -> Result<PublishReport, StagingError>
where
    St: StagingStore,
    S: EventStream,
{
    let records = store.read_all().await?;
    let report = publish_records(stream, stream_name, &records).await;

    match policy {
        DeliveryPolicy::BestEffort => {
            if !report.failed.is_empty() {
                warn!(
                    dropped = report.failed.len(),
                    "Clearing staging store with undelivered records"
                );
            }
            store.clear().await?;
        }
        DeliveryPolicy::RetainFailed => store.replace(&report.failed).await?,
    }
    Ok(report)
}
