use async_trait::async_trait;
use logcenter_client::host::FixedHostIdentity;
use logcenter_client::{ClientConfig, ClientState, LogCenterClient, LogRecord, LogSink, SinkError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct CountingSink {
    batches: Mutex<Vec<usize>>,
}

impl CountingSink {
    fn batches(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSink for CountingSink {
    async fn send(&self, _record: &LogRecord) -> Result<i64, SinkError> {
        self.batches.lock().unwrap().push(1);
        Ok(1)
    }

    async fn send_batch(&self, records: &[LogRecord]) -> Result<Vec<i64>, SinkError> {
        self.batches.lock().unwrap().push(records.len());
        Ok((0..records.len() as i64).collect())
    }
}

fn client(sink: Arc<CountingSink>, buffer_size: usize, interval: Duration) -> LogCenterClient {
    LogCenterClient::builder(
        ClientConfig::new("worker")
            .with_buffer_size(buffer_size)
            .with_auto_flush_interval(interval),
    )
    .sink(sink)
    .host_identity(Arc::new(FixedHostIdentity::new("worker-1")))
    .build()
    .unwrap()
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn interval_flushes_partial_buffer() {
    let sink = Arc::new(CountingSink::default());
    let client = client(sink.clone(), 100, Duration::from_secs(10));

    client.log_info("a").await;
    client.log_info("b").await;

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert!(sink.batches().is_empty());
    assert_eq!(client.buffered_len(), 2);

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(sink.batches(), vec![2]);
    assert_eq!(client.buffered_len(), 0);

    // Empty buffer on the next tick: no call.
    tokio::time::advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(sink.batches(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn zero_interval_never_schedules() {
    let sink = Arc::new(CountingSink::default());
    let client = client(sink.clone(), 3, Duration::ZERO);

    client.log_info("a").await;
    for _ in 0..5 {
        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
    }
    assert!(sink.batches().is_empty());
    assert_eq!(client.buffered_len(), 1);

    client.flush().await;
    assert_eq!(sink.batches(), vec![1]);

    for m in ["x", "y", "z"] {
        client.log_info(m).await;
    }
    assert_eq!(sink.batches(), vec![1, 3]);
}

#[tokio::test(start_paused = true)]
async fn stop_twice_then_no_scheduled_flush() {
    let sink = Arc::new(CountingSink::default());
    let client = client(sink.clone(), 100, Duration::from_secs(1));

    client.log_info("buffered").await;
    client.stop();
    client.stop();
    assert_eq!(client.state(), ClientState::Stopped);

    for _ in 0..5 {
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
    }
    assert!(sink.batches().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_lose_nothing() {
    let sink = Arc::new(CountingSink::default());
    let client = Arc::new(client(sink.clone(), 7, Duration::ZERO));

    let mut handles = Vec::new();
    for t in 0..4 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                client.log_debug(format!("{}-{}", t, i)).await;
            }
            client.flush().await;
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    client.flush().await;

    let total: usize = sink.batches().iter().sum();
    assert_eq!(total, 100);
    assert_eq!(client.buffered_len(), 0);
}
