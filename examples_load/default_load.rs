use std::sync::Arc;
use std::time::{Duration, Instant};

use logcenter_client::noop_sink::NoopSink;
use logcenter_client::{ClientConfig, LogCenterClient};

#[tokio::main]
async fn main() {
    let config = ClientConfig::new("load-test").with_auto_flush_interval(Duration::from_secs(1));
    let client = LogCenterClient::builder(config)
        .sink(Arc::new(NoopSink::default()))
        .build()
        .expect("build client");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        client.log_error(format!("default load test error {}", i), None).await;
    }
    client.flush().await;

    let elapsed = start.elapsed();
    let stats = client.stats();
    println!("default config: logged {} records in {:?} (~{:.0} rec/s), {} batches, {} sent",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64(),
        stats.batches_attempted,
        stats.records_sent,
    );

    client.stop();
}
