use tracing::{error, info};

use logcenter_client::init::init_tracing;
use logcenter_client::{ClientConfig, LogCenterClient};

/// Ships records to a running LogCenter API.
///
/// Configure with `LOG_CENTER_API_URL` (e.g. `http://localhost:5208`) and
/// `LOG_CENTER_APPLICATION`; see `logcenter_client::config` for the rest.
#[tokio::main]
async fn main() {
    let config = ClientConfig::from_env().expect("read LOG_CENTER_* variables");
    let client = LogCenterClient::new(config).expect("build client");

    init_tracing(&client).expect("install tracing subscriber");

    client.log_info("http example started").await;

    // Forwarded through the tracing layer as well.
    info!(user_id = 17, "user signed in");
    let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timed out");
    error!(error = &err as &(dyn std::error::Error + 'static), "checkout failed");

    // Stopping does not flush, so push the tail out first.
    client.flush().await;
    client.stop();
}
