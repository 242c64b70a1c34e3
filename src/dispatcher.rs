use crate::error::SinkError;
use crate::record::LogRecord;
use crate::sink::LogSink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

tokio::task_local! {
    static IN_DISPATCH: ();
}

/// True while the current task is inside [`Dispatcher::send`]. Events the
/// sink emits there must not be buffered again.
pub(crate) fn in_dispatch() -> bool {
    IN_DISPATCH.try_with(|_| ()).is_ok()
}

/// Hook notified whenever a batch is abandoned.
///
/// Delivery is best-effort and failures never reach the producer; this is
/// the only way to observe them besides [`DispatchStats`]. Called on the
/// task that performed the flush, so keep it short.
pub trait DeliveryObserver: Send + Sync {
    fn on_batch_dropped(&self, records: &[LogRecord], error: &SinkError);
}

impl<F> DeliveryObserver for F
where
    F: Fn(&[LogRecord], &SinkError) + Send + Sync,
{
    fn on_batch_dropped(&self, records: &[LogRecord], error: &SinkError) {
        self(records, error)
    }
}

/// Counters describing what happened to the records handed to the
/// dispatcher.
#[derive(Default)]
pub struct DispatchStats {
    /// Batches that reached the sink (single or batch path).
    pub batches_attempted: AtomicU64,
    /// Batches the sink rejected or failed to transmit.
    pub batches_failed: AtomicU64,
    /// Records acknowledged by the sink.
    pub records_sent: AtomicU64,
    /// Records abandoned because their batch failed.
    pub records_dropped: AtomicU64,
    /// Records refused because the client had been stopped or could not
    /// be dispatched.
    pub records_rejected: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub batches_attempted: u64,
    pub batches_failed: u64,
    pub records_sent: u64,
    pub records_dropped: u64,
    pub records_rejected: u64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            batches_attempted: self.batches_attempted.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            records_sent: self.records_sent.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Hands drained batches to a [`LogSink`] and forgets them.
pub struct Dispatcher {
    sink: Arc<dyn LogSink>,
    observer: Option<Arc<dyn DeliveryObserver>>,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn LogSink>, observer: Option<Arc<dyn DeliveryObserver>>) -> Self {
        Self {
            sink,
            observer,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn stats(&self) -> &Arc<DispatchStats> {
        &self.stats
    }

    /// Transmit `batch` once. A single record goes through
    /// [`LogSink::send`], two or more through [`LogSink::send_batch`].
    /// Failures are recorded and swallowed; the batch is never retried.
    pub async fn send(&self, batch: Vec<LogRecord>) {
        if batch.is_empty() {
            return;
        }

        self.stats.batches_attempted.fetch_add(1, Ordering::Relaxed);
        let result = IN_DISPATCH
            .scope((), async {
                if batch.len() == 1 {
                    self.sink.send(&batch[0]).await.map(|id| vec![id])
                } else {
                    self.sink.send_batch(&batch).await
                }
            })
            .await;

        match result {
            Ok(ids) => {
                self.stats
                    .records_sent
                    .fetch_add(batch.len() as u64, Ordering::Relaxed);
                debug!(count = batch.len(), ids = ?ids, "log batch delivered");
            }
            Err(e) => {
                self.stats.batches_failed.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .records_dropped
                    .fetch_add(batch.len() as u64, Ordering::Relaxed);
                warn!(count = batch.len(), error = %e, "dropping undeliverable log batch");
                if let Some(observer) = &self.observer {
                    observer.on_batch_dropped(&batch, &e);
                }
            }
        }
    }

    /// Account for records that will never reach the sink.
    pub(crate) fn reject(&self, count: usize) {
        self.stats
            .records_rejected
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}
