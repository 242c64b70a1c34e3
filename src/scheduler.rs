use crate::error::ClientError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Something a scheduler can flush.
#[async_trait]
pub trait FlushTarget: Send + Sync {
    async fn flush(&self);
}

/// Drives periodic flushes of a [`FlushTarget`].
///
/// `start` is called once when the client is built, `stop` when it is
/// stopped or dropped. After `stop` returns no new flush may begin; a
/// flush already running is allowed to finish.
pub trait FlushScheduler: Send + Sync {
    fn start(&self, target: Arc<dyn FlushTarget>) -> Result<(), ClientError>;

    /// Must be idempotent.
    fn stop(&self);
}

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Tokio-timer scheduler that flushes every `period`, starting one period
/// after `start`.
pub struct IntervalScheduler {
    period: Duration,
    running: Mutex<Option<Running>>,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            running: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// True while the background task is alive.
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .map(|r| !r.handle.is_finished())
            .unwrap_or(false)
    }
}

impl FlushScheduler for IntervalScheduler {
    fn start(&self, target: Arc<dyn FlushTarget>) -> Result<(), ClientError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        let mut running = self.running.lock();
        if running.is_some() || self.period.is_zero() {
            return Ok(());
        }

        let token = CancellationToken::new();
        let task_token = token.clone();
        let period = self.period;
        // Measured from arming, not from the task's first poll.
        let first = Instant::now() + period;

        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if task_token.is_cancelled() {
                            break;
                        }
                        target.flush().await;
                    }
                }
            }
            debug!("flush scheduler stopped");
        });

        *running = Some(Running { token, handle });
        Ok(())
    }

    fn stop(&self) {
        // The task is cancelled, not aborted, so an in-flight send completes.
        if let Some(running) = self.running.lock().as_ref() {
            running.token.cancel();
        }
    }
}

/// Scheduler that only flushes when [`fire`](Self::fire) is called.
///
/// Lets tests (or hosts with their own clock) decide exactly when a
/// scheduled flush happens.
#[derive(Default)]
pub struct ManualScheduler {
    target: Mutex<Option<Arc<dyn FlushTarget>>>,
    fired: AtomicU64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flush the armed target. Returns `false` when not started or already
    /// stopped.
    pub async fn fire(&self) -> bool {
        let target = self.target.lock().clone();
        match target {
            Some(target) => {
                self.fired.fetch_add(1, Ordering::Relaxed);
                target.flush().await;
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.target.lock().is_some()
    }

    /// Number of flushes that actually ran.
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }
}

impl FlushScheduler for ManualScheduler {
    fn start(&self, target: Arc<dyn FlushTarget>) -> Result<(), ClientError> {
        *self.target.lock() = Some(target);
        Ok(())
    }

    fn stop(&self) {
        self.target.lock().take();
    }
}
