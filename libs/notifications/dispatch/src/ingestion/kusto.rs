//! Azure Data Explorer (Kusto) REST sink.

use super::schema::{TableSchema, EMAIL_TABLE, SMS_TABLE};
use super::{IngestError, IngestionSink, OutcomeRecord};
use crate::config::KustoConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, info};

pub struct KustoSink {
    client: Client,
    config: KustoConfig,
}

#[derive(Serialize)]
struct ManagementRequest<'a> {
    db: &'a str,
    csl: &'a str,
}

impl KustoSink {
    pub fn new(mut config: KustoConfig) -> Self {
        config.cluster_url = config.cluster_url.trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn execute(&self, command: &str) -> Result<(), IngestError> {
        let response = self
            .client
            .post(format!("{}/v1/rest/mgmt", self.config.cluster_url))
            .bearer_auth(&self.config.access_token)
            .json(&ManagementRequest {
                db: &self.config.database,
                csl: command,
            })
            .send()
            .await?;

        check(response).await
    }

    async fn stream(&self, schema: &TableSchema, json: String) -> Result<(), IngestError> {
        let response = self
            .client
            .post(format!(
                "{}/v1/rest/ingest/{}/{}",
                self.config.cluster_url, self.config.database, schema.table
            ))
            .query(&[("streamFormat", "Json"), ("mappingName", schema.mapping)])
            .bearer_auth(&self.config.access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(json)
            .send()
            .await?;

        check(response).await
    }

    async fn try_ingest(&self, record: &OutcomeRecord) -> Result<(), IngestError> {
        let schema = match record {
            OutcomeRecord::Email(_) => &EMAIL_TABLE,
            OutcomeRecord::Sms(_) => &SMS_TABLE,
        };
        self.stream(schema, record.to_json()?).await
    }
}

async fn check(response: reqwest::Response) -> Result<(), IngestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(IngestError::Rejected { status, body })
}

#[async_trait]
impl IngestionSink for KustoSink {
    async fn ingest(&self, record: OutcomeRecord) {
        match self.try_ingest(&record).await {
            Ok(()) => debug!(channel = record.channel(), "Outcome ingested"),
            Err(e) => error!(channel = record.channel(), error = %e, "Failed to ingest data"),
        }
    }

    async fn ensure_schema(&self) -> Result<(), IngestError> {
        for schema in [&EMAIL_TABLE, &SMS_TABLE] {
            self.execute(&schema.create_merge_command()).await?;
            self.execute(&schema.mapping_command()).await?;
            info!(table = schema.table, mapping = schema.mapping, "Table schema reconciled");
        }
        Ok(())
    }
}
