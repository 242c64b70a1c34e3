use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use logcenter_client::{ClientConfig, LogCenterClient, LogRecord, LogSink, SinkError};

/// Example of shipping records somewhere other than the ingestion API by
/// implementing the `LogSink` trait directly. Here we just print them.
struct StdoutSink;

#[async_trait]
impl LogSink for StdoutSink {
    async fn send(&self, record: &LogRecord) -> Result<i64, SinkError> {
        println!("[single] {} {}: {}", record.timestamp, record.level, record.message);
        Ok(0)
    }

    async fn send_batch(&self, records: &[LogRecord]) -> Result<Vec<i64>, SinkError> {
        for record in records {
            println!("[batch] {} {}: {}", record.timestamp, record.level, record.message);
        }
        Ok((0..records.len() as i64).collect())
    }
}

#[tokio::main]
async fn main() {
    let config = ClientConfig::new("custom-backend-example")
        .with_environment("Development")
        .with_buffer_size(3)
        .with_auto_flush_interval(Duration::from_secs(2));

    let client = LogCenterClient::builder(config)
        .sink(Arc::new(StdoutSink))
        .delivery_observer(Arc::new(|records: &[LogRecord], error: &SinkError| {
            eprintln!("lost {} records: {}", records.len(), error);
        }))
        .build()
        .expect("build client");

    client.log_info("custom backend example started").await;
    client.log_warning("cache miss rate above 20%").await;
    // Third record reaches the threshold and is sent as one batch.
    client.log_debug("threshold flush").await;

    client.log_info("picked up by the scheduler").await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    client.stop();
}
