use crate::error::{ClientError, SinkError};
use crate::record::LogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use std::time::Duration;

/// Route of the single-record ingestion endpoint, relative to the base URL.
pub const SINGLE_PATH: &str = "api/v1/logingestion";

/// Route of the batch ingestion endpoint, relative to the base URL.
pub const BATCH_PATH: &str = "api/v1/logingestion/batch";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SingleResponse {
    id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchResponse {
    #[serde(default)]
    count: Option<usize>,
    ids: Vec<i64>,
}

/// [`LogSink`] that posts records as JSON to the LogCenter ingestion API.
#[derive(Clone)]
pub struct HttpSink {
    client: Client,
    single_url: Url,
    batch_url: Url,
}

impl HttpSink {
    /// Construct a sink for the API rooted at `endpoint`,
    /// e.g. `"https://logs.internal:7020"`.
    ///
    /// **Parameters**
    /// - `endpoint`: base URL of the ingestion service; a path prefix is
    ///   kept, a missing trailing slash is added.
    /// - `timeout`: optional whole-request timeout. `None` keeps the
    ///   transport default.
    ///
    /// **Returns**
    /// - `Err(ClientError::InvalidEndpoint)` if the URL does not parse or
    ///   cannot be a base.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason,
        };

        let mut base = endpoint.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("url cannot be a base".to_string()));
        }
        let single_url = base.join(SINGLE_PATH).map_err(|e| invalid(e.to_string()))?;
        let batch_url = base.join(BATCH_PATH).map_err(|e| invalid(e.to_string()))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ClientError::HttpClient)?;

        Ok(Self {
            client,
            single_url,
            batch_url,
        })
    }

    pub fn single_url(&self) -> &Url {
        &self.single_url
    }

    pub fn batch_url(&self) -> &Url {
        &self.batch_url
    }
}

async fn ensure_success(resp: Response) -> Result<Response, SinkError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
        Err(SinkError::Status { status, body })
    }
}

#[async_trait]
impl LogSink for HttpSink {
    async fn send(&self, record: &LogRecord) -> Result<i64, SinkError> {
        let resp = self
            .client
            .post(self.single_url.clone())
            .json(record)
            .send()
            .await?;
        let body: SingleResponse = ensure_success(resp)
            .await?
            .json()
            .await
            .map_err(|e| SinkError::Decode(e.to_string()))?;
        Ok(body.id)
    }

    async fn send_batch(&self, records: &[LogRecord]) -> Result<Vec<i64>, SinkError> {
        let resp = self
            .client
            .post(self.batch_url.clone())
            .json(records)
            .send()
            .await?;
        let body: BatchResponse = ensure_success(resp)
            .await?
            .json()
            .await
            .map_err(|e| SinkError::Decode(e.to_string()))?;

        let count = body.count.unwrap_or(body.ids.len());
        if count != records.len() || body.ids.len() != records.len() {
            return Err(SinkError::Decode(format!(
                "sent {} records, endpoint acknowledged {} ({} ids)",
                records.len(),
                count,
                body.ids.len()
            )));
        }
        Ok(body.ids)
    }
}
