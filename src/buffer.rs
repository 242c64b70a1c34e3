use crate::record::LogRecord;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Threshold used when the configured buffer size is zero.
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// FIFO of records waiting to be flushed.
///
/// The threshold is a flush trigger, not a limit: `push` never rejects a
/// record. The lock is only ever held for in-memory work, so callers must
/// dispatch the batches they get back after these methods return.
pub struct RecordBuffer {
    records: Mutex<VecDeque<LogRecord>>,
    threshold: usize,
}

impl RecordBuffer {
    pub fn new(threshold: usize) -> Self {
        let threshold = if threshold == 0 { DEFAULT_BUFFER_SIZE } else { threshold };
        Self {
            records: Mutex::new(VecDeque::with_capacity(threshold)),
            threshold,
        }
    }

    /// Append `record`. If the buffer reached the threshold, the whole
    /// buffer is drained in the same critical section and returned.
    pub fn push(&self, record: LogRecord) -> Option<Vec<LogRecord>> {
        let mut records = self.records.lock();
        records.push_back(record);
        if records.len() >= self.threshold {
            Some(records.drain(..).collect())
        } else {
            None
        }
    }

    /// Remove and return everything currently buffered, oldest first.
    pub fn drain_all(&self) -> Vec<LogRecord> {
        let mut records = self.records.lock();
        if records.is_empty() {
            return Vec::new();
        }
        records.drain(..).collect()
    }

    /// Drop everything buffered and return how many records were lost.
    pub fn clear(&self) -> usize {
        let mut records = self.records.lock();
        let dropped = records.len();
        records.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}
