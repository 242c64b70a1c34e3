use crate::error::SinkError;
use crate::record::LogRecord;
use async_trait::async_trait;

/// Asynchronous destination for [`LogRecord`]s drained from the client's
/// buffer.
///
/// Implementations transport records to the ingestion service (see
/// [`HttpSink`](crate::http::HttpSink)) or anywhere else. The dispatcher
/// calls `send` for a batch of exactly one record and `send_batch` for
/// anything larger; it never calls either with an empty batch.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Submit a single record.
    ///
    /// **Returns**
    /// - `Ok(id)` with the identifier assigned by the backend.
    /// - `Err(..)` on transport failure or a non-success response. The
    ///   dispatcher abandons the record; it is never retried.
    async fn send(&self, record: &LogRecord) -> Result<i64, SinkError>;

    /// Submit several records in one request.
    ///
    /// **Returns**
    /// - `Ok(ids)` with one identifier per record, in input order.
    /// - `Err(..)` if the batch was rejected. The whole batch is abandoned.
    ///
    /// The default implementation submits the records one by one and stops
    /// at the first failure.
    async fn send_batch(&self, records: &[LogRecord]) -> Result<Vec<i64>, SinkError> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(self.send(record).await?);
        }
        Ok(ids)
    }
}
