//! Outcome ingestion.
//!
//! Every send attempt produces one [`OutcomeRecord`]. Sinks are best-effort:
//! [`IngestionSink::ingest`] has no error channel, so a broken store can
//! never change whether a message counts as delivered.

mod kusto;
mod records;
mod schema;

pub use kusto::KustoSink;
pub use records::{EmailOutcome, OutcomeRecord, SmsOutcome};
pub use schema::{ColumnType, TableSchema, EMAIL_TABLE, SMS_TABLE};

use async_trait::async_trait;
use http::StatusCode;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("ingestion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("store rejected request with {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IngestionSink: Send + Sync {
    /// Append a record. Failures are logged by the sink.
    async fn ingest(&self, record: OutcomeRecord);

    /// Create or merge the destination tables. Called once at startup.
    async fn ensure_schema(&self) -> Result<(), IngestError>;
}

/// Writes records to the log. Used when no analytical store is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl IngestionSink for LogSink {
    async fn ingest(&self, record: OutcomeRecord) {
        match record.to_json() {
            Ok(json) => info!(
                channel = record.channel(),
                status_code = record.status_code(),
                record = %json,
                "Outcome recorded"
            ),
            Err(e) => info!(channel = record.channel(), error = %e, "Outcome not serializable"),
        }
    }

    async fn ensure_schema(&self) -> Result<(), IngestError> {
        Ok(())
    }
}
