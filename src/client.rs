use crate::buffer::RecordBuffer;
use crate::config::ClientConfig;
use crate::dispatcher::{DeliveryObserver, DispatchSnapshot, Dispatcher};
use crate::error::ClientError;
use crate::host::{HostIdentity, SystemHostIdentity};
use crate::layer::LogCenterLayer;
use crate::record::{levels, LogRecord, RecordFactory};
use crate::scheduler::{FlushScheduler, FlushTarget, IntervalScheduler};
use crate::sink::LogSink;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::error::Error;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle of a [`LogCenterClient`]. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Created,
    Running,
    Stopped,
}

/// State shared between the client handle, the scheduler task and any
/// tracing layers created from the client.
pub(crate) struct Shared {
    pub(crate) factory: RecordFactory,
    buffer: RecordBuffer,
    dispatcher: Dispatcher,
    state: Mutex<ClientState>,
}

impl Shared {
    fn is_stopped(&self) -> bool {
        *self.state.lock() == ClientState::Stopped
    }

    /// Buffer `record` unless stopped, returning a threshold batch if one
    /// formed. The state lock is held across the push, so `stop` either
    /// clears the record or the record sees `Stopped`.
    fn enqueue(&self, record: LogRecord) -> Option<Vec<LogRecord>> {
        let state = self.state.lock();
        if *state == ClientState::Stopped {
            drop(state);
            debug!("client stopped, dropping log record");
            self.dispatcher.reject(1);
            return None;
        }
        self.buffer.push(record)
    }

    async fn submit(&self, record: LogRecord) {
        if let Some(batch) = self.enqueue(record) {
            debug!(count = batch.len(), "buffer threshold reached, flushing");
            self.dispatcher.send(batch).await;
        }
    }

    /// Enqueue from a synchronous context. A threshold batch is sent on a
    /// spawned task; without a tokio runtime it is dropped.
    pub(crate) fn submit_detached(self: &Arc<Self>, record: LogRecord) {
        let Some(batch) = self.enqueue(record) else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let shared = Arc::clone(self);
                runtime.spawn(async move { shared.dispatcher.send(batch).await });
            }
            Err(_) => self.dispatcher.reject(batch.len()),
        }
    }
}

#[async_trait]
impl FlushTarget for Shared {
    async fn flush(&self) {
        if self.is_stopped() {
            return;
        }
        let batch = self.buffer.drain_all();
        self.dispatcher.send(batch).await;
    }
}

/// Buffered, best-effort client for the LogCenter ingestion API.
///
/// Records are built from the configured application, environment and
/// host, buffered in memory, and sent when the buffer reaches
/// `buffer_size`, when the scheduler fires, or when [`flush`] is called.
/// Failed transmissions are dropped, never retried.
///
/// **Stopping does not flush.** [`stop`] (also run on drop) cancels the
/// scheduler and discards whatever is still buffered. Call [`flush`]
/// first if the tail matters.
///
/// [`flush`]: Self::flush
/// [`stop`]: Self::stop
pub struct LogCenterClient {
    shared: Arc<Shared>,
    scheduler: Option<Arc<dyn FlushScheduler>>,
    config: ClientConfig,
}

impl LogCenterClient {
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Build a client that posts to `config.endpoint` with the default
    /// host identity and interval scheduler.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        ClientBuilder::new(config).build()
    }

    pub async fn log(
        &self,
        level: impl Into<String>,
        message: impl Into<String>,
        error: Option<&(dyn Error + Send + Sync + 'static)>,
    ) {
        let record = self.shared.factory.build(
            level,
            message,
            error.map(|e| e as &(dyn Error + 'static)),
        );
        self.shared.submit(record).await;
    }

    pub async fn log_info(&self, message: impl Into<String>) {
        self.log(levels::INFORMATION, message, None).await;
    }

    pub async fn log_warning(&self, message: impl Into<String>) {
        self.log(levels::WARNING, message, None).await;
    }

    pub async fn log_error(
        &self,
        message: impl Into<String>,
        error: Option<&(dyn Error + Send + Sync + 'static)>,
    ) {
        self.log(levels::ERROR, message, error).await;
    }

    pub async fn log_debug(&self, message: impl Into<String>) {
        self.log(levels::DEBUG, message, None).await;
    }

    pub async fn log_critical(
        &self,
        message: impl Into<String>,
        error: Option<&(dyn Error + Send + Sync + 'static)>,
    ) {
        self.log(levels::CRITICAL, message, error).await;
    }

    /// Buffer a record built elsewhere, e.g. with [`record_factory`].
    ///
    /// [`record_factory`]: Self::record_factory
    pub async fn submit(&self, record: LogRecord) {
        self.shared.submit(record).await;
    }

    /// Drain the buffer and send it. Never fails; a no-op when the buffer
    /// is empty or the client is stopped.
    pub async fn flush(&self) {
        FlushTarget::flush(&*self.shared).await;
    }

    /// Cancel scheduled flushes and discard anything still buffered.
    ///
    /// Idempotent. Does not wait for or cancel a send already in flight.
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            if *state == ClientState::Stopped {
                return;
            }
            *state = ClientState::Stopped;
        }

        if let Some(scheduler) = &self.scheduler {
            scheduler.stop();
        }

        let discarded = self.shared.buffer.clear();
        if discarded > 0 {
            debug!(discarded, "client stopped with unflushed log records");
            self.shared.dispatcher.reject(discarded);
        }
    }

    pub fn state(&self) -> ClientState {
        *self.shared.state.lock()
    }

    pub fn buffered_len(&self) -> usize {
        self.shared.buffer.len()
    }

    pub fn stats(&self) -> DispatchSnapshot {
        self.shared.dispatcher.stats().snapshot()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn record_factory(&self) -> &RecordFactory {
        &self.shared.factory
    }

    /// A `tracing` layer that forwards events at or above `min_level`
    /// into this client's buffer.
    pub fn layer(&self, min_level: tracing::Level) -> LogCenterLayer {
        LogCenterLayer::new(Arc::clone(&self.shared), min_level)
    }
}

impl Drop for LogCenterClient {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Assembles a [`LogCenterClient`], allowing the sink, host identity,
/// scheduler and delivery observer to be replaced.
pub struct ClientBuilder {
    config: ClientConfig,
    sink: Option<Arc<dyn LogSink>>,
    host: Option<Arc<dyn HostIdentity>>,
    scheduler: Option<Arc<dyn FlushScheduler>>,
    observer: Option<Arc<dyn DeliveryObserver>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            sink: None,
            host: None,
            scheduler: None,
            observer: None,
        }
    }

    /// Send batches here instead of the HTTP endpoint.
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn host_identity(mut self, host: Arc<dyn HostIdentity>) -> Self {
        self.host = Some(host);
        self
    }

    /// Replace the interval scheduler. An explicit scheduler is armed even
    /// when `auto_flush_interval` is zero.
    pub fn scheduler(mut self, scheduler: Arc<dyn FlushScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn delivery_observer(mut self, observer: Arc<dyn DeliveryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validate the configuration and start the client.
    ///
    /// **Returns**
    /// - `Err(ClientError::MissingApplicationName)` for a blank name.
    /// - `Err(ClientError::MissingEndpoint)` / `InvalidEndpoint` when no
    ///   sink was given and the endpoint is unusable.
    /// - `Err(ClientError::NoRuntime)` when the interval scheduler is
    ///   needed but no tokio runtime is running.
    pub fn build(self) -> Result<LogCenterClient, ClientError> {
        let config = self.config;
        config.validate()?;

        let sink = match self.sink {
            Some(sink) => sink,
            None => default_sink(&config)?,
        };
        let host = self
            .host
            .unwrap_or_else(|| Arc::new(SystemHostIdentity::new()));
        let scheduler = self.scheduler.or_else(|| {
            config.auto_flush_enabled().then(|| {
                Arc::new(IntervalScheduler::new(config.auto_flush_interval))
                    as Arc<dyn FlushScheduler>
            })
        });

        let shared = Arc::new(Shared {
            factory: RecordFactory::new(
                config.application_name.clone(),
                config.environment.clone(),
                host,
            ),
            buffer: RecordBuffer::new(config.buffer_size),
            dispatcher: Dispatcher::new(sink, self.observer),
            state: Mutex::new(ClientState::Created),
        });

        let client = LogCenterClient {
            shared,
            scheduler,
            config,
        };

        if let Some(scheduler) = &client.scheduler {
            scheduler.start(Arc::clone(&client.shared) as Arc<dyn FlushTarget>)?;
        }
        *client.shared.state.lock() = ClientState::Running;
        debug!(
            application = client.config.application_name.as_str(),
            scheduled = client.scheduler.is_some(),
            "log center client running"
        );

        Ok(client)
    }
}

#[cfg(feature = "http")]
fn default_sink(config: &ClientConfig) -> Result<Arc<dyn LogSink>, ClientError> {
    let endpoint = config
        .endpoint
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or(ClientError::MissingEndpoint)?;
    let sink = crate::http::HttpSink::new(endpoint, config.request_timeout)?;
    Ok(Arc::new(sink))
}

#[cfg(not(feature = "http"))]
fn default_sink(_config: &ClientConfig) -> Result<Arc<dyn LogSink>, ClientError> {
    Err(ClientError::MissingEndpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::host::FixedHostIdentity;
    use crate::scheduler::ManualScheduler;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Single(String),
        Batch(Vec<String>),
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<Call>>,
        fail: AtomicBool,
    }

    impl RecordingSink {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl LogSink for RecordingSink {
        async fn send(&self, record: &LogRecord) -> Result<i64, SinkError> {
            self.calls.lock().push(Call::Single(record.message.clone()));
            if self.fail.load(Ordering::SeqCst) {
                return Err("endpoint unreachable".into());
            }
            Ok(1)
        }

        async fn send_batch(&self, records: &[LogRecord]) -> Result<Vec<i64>, SinkError> {
            self.calls
                .lock()
                .push(Call::Batch(records.iter().map(|r| r.message.clone()).collect()));
            if self.fail.load(Ordering::SeqCst) {
                return Err(SinkError::Status { status: 503, body: "busy".into() });
            }
            Ok((1..=records.len() as i64).collect())
        }
    }

    struct Harness {
        client: LogCenterClient,
        sink: Arc<RecordingSink>,
        scheduler: Arc<ManualScheduler>,
    }

    fn harness(buffer_size: usize) -> Harness {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = Arc::new(ManualScheduler::new());
        let client = LogCenterClient::builder(
            ClientConfig::new("checkout").with_buffer_size(buffer_size),
        )
        .sink(sink.clone())
        .host_identity(Arc::new(FixedHostIdentity::new("web-01")))
        .scheduler(scheduler.clone())
        .build()
        .unwrap();
        Harness { client, sink, scheduler }
    }

    #[test]
    fn missing_application_name_fails_at_build() {
        let result = LogCenterClient::builder(ClientConfig::new(""))
            .sink(Arc::new(RecordingSink::default()))
            .build();
        assert!(matches!(result, Err(ClientError::MissingApplicationName)));
    }

    #[test]
    fn missing_endpoint_without_sink_fails() {
        let config = ClientConfig::new("checkout").with_auto_flush_interval(Duration::ZERO);
        assert!(matches!(
            LogCenterClient::new(config),
            Err(ClientError::MissingEndpoint)
        ));
    }

    #[test]
    fn interval_scheduler_outside_runtime_fails() {
        let result = LogCenterClient::builder(ClientConfig::new("checkout"))
            .sink(Arc::new(RecordingSink::default()))
            .build();
        assert!(matches!(result, Err(ClientError::NoRuntime)));
    }

    #[tokio::test]
    async fn builds_running_and_stamps_records() {
        let h = harness(10);
        assert_eq!(h.client.state(), ClientState::Running);
        assert!(h.scheduler.is_armed());

        let record = h.client.record_factory().build(levels::DEBUG, "stamped", None);
        assert_eq!(record.application, "checkout");
        assert_eq!(record.environment, "Production");
        assert_eq!(record.machine_name, "web-01");
    }

    #[tokio::test]
    async fn below_threshold_records_stay_buffered() {
        let h = harness(5);
        for i in 0..4 {
            h.client.log_info(format!("m{}", i)).await;
        }
        assert_eq!(h.client.buffered_len(), 4);
        assert!(h.sink.calls().is_empty());
    }

    #[tokio::test]
    async fn threshold_flushes_everything_inline() {
        let h = harness(3);
        h.client.log_info("a").await;
        h.client.log_warning("b").await;
        h.client.log_debug("c").await;

        assert_eq!(h.client.buffered_len(), 0);
        assert_eq!(
            h.sink.calls(),
            vec![Call::Batch(vec!["a".into(), "b".into(), "c".into()])]
        );
    }

    #[tokio::test]
    async fn flush_on_empty_buffer_sends_nothing() {
        let h = harness(10);
        h.client.flush().await;
        h.client.flush().await;
        assert!(h.sink.calls().is_empty());
    }

    #[tokio::test]
    async fn single_and_batch_paths() {
        let h = harness(10);
        h.client.log_info("only").await;
        h.client.flush().await;
        assert_eq!(h.sink.calls(), vec![Call::Single("only".into())]);

        for m in ["x", "y", "z"] {
            h.client.log_info(m).await;
        }
        h.client.flush().await;
        assert_eq!(
            h.sink.calls()[1],
            Call::Batch(vec!["x".into(), "y".into(), "z".into()])
        );
    }

    #[tokio::test]
    async fn scheduled_flush_drains_buffer() {
        let h = harness(10);
        h.client.log_info("tick me").await;
        assert!(h.scheduler.fire().await);
        assert_eq!(h.sink.calls(), vec![Call::Single("tick me".into())]);
        assert_eq!(h.client.buffered_len(), 0);
    }

    #[tokio::test]
    async fn failed_send_is_dropped_and_client_stays_usable() {
        let h = harness(10);
        h.sink.fail.store(true, Ordering::SeqCst);
        h.client.log_info("lost 1").await;
        h.client.log_info("lost 2").await;
        h.client.flush().await;

        assert_eq!(h.client.buffered_len(), 0);
        assert_eq!(h.client.stats().records_dropped, 2);

        h.sink.fail.store(false, Ordering::SeqCst);
        h.client.log_info("kept").await;
        h.client.flush().await;
        assert_eq!(h.sink.calls().last(), Some(&Call::Single("kept".into())));
        assert_eq!(h.client.stats().records_sent, 1);
    }

    #[tokio::test]
    async fn log_error_carries_error_text() {
        let h = harness(1);
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        h.client.log_error("write failed", Some(&err)).await;
        assert_eq!(h.sink.calls(), vec![Call::Single("write failed".into())]);
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_final() {
        let h = harness(10);
        h.client.log_info("never sent").await;

        h.client.stop();
        h.client.stop();

        assert_eq!(h.client.state(), ClientState::Stopped);
        assert!(!h.scheduler.fire().await);
        assert_eq!(h.client.buffered_len(), 0);

        h.client.log_info("after stop").await;
        h.client.flush().await;
        assert!(h.sink.calls().is_empty());
        assert_eq!(h.client.stats().records_rejected, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn records_racing_stop_are_rejected_not_stranded() {
        let h = harness(100_000);
        let client = Arc::new(h.client);

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let client = Arc::clone(&client);
                tokio::spawn(async move {
                    for i in 0..500 {
                        client.log_info(format!("p{}-{}", p, i)).await;
                        if i % 50 == 0 {
                            tokio::task::yield_now().await;
                        }
                    }
                })
            })
            .collect();

        tokio::task::yield_now().await;
        client.stop();
        for producer in producers {
            producer.await.unwrap();
        }

        assert_eq!(client.buffered_len(), 0);
        assert_eq!(client.stats().records_rejected, 2_000);
        assert!(h.sink.calls().is_empty());
    }

    #[tokio::test]
    async fn drop_stops_scheduler() {
        let h = harness(10);
        let scheduler = h.scheduler.clone();
        drop(h.client);
        assert!(!scheduler.is_armed());
    }
}
