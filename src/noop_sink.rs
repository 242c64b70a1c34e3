use crate::error::SinkError;
use crate::record::LogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};

/// A sink that accepts and drops all records, handing out sequential ids.
///
/// Useful for measuring the overhead of the client itself without any
/// network I/O.
#[derive(Default)]
pub struct NoopSink {
    next_id: AtomicI64,
}

impl NoopSink {
    fn take_ids(&self, n: usize) -> i64 {
        self.next_id.fetch_add(n as i64, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _record: &LogRecord) -> Result<i64, SinkError> {
        Ok(self.take_ids(1))
    }

    async fn send_batch(&self, records: &[LogRecord]) -> Result<Vec<i64>, SinkError> {
        let first = self.take_ids(records.len());
        Ok((first..first + records.len() as i64).collect())
    }
}
