/// Error returned while building or configuring a [`LogCenterClient`].
///
/// All of these surface at construction time; once a client is running
/// nothing it does returns an error to the producer.
///
/// [`LogCenterClient`]: crate::client::LogCenterClient
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("application name must be provided")]
    MissingApplicationName,

    #[error("endpoint must be provided when no custom sink is configured")]
    MissingEndpoint,

    #[error("invalid endpoint url {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("interval scheduler requires a running tokio runtime")]
    NoRuntime,

    #[error("invalid value {value:?} for environment variable {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[cfg(feature = "http")]
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Error returned by a [`LogSink`] when a submission fails.
///
/// The dispatcher never propagates these; they are only visible through
/// [`DeliveryObserver`] and the crate's `warn` diagnostics.
///
/// [`LogSink`]: crate::sink::LogSink
/// [`DeliveryObserver`]: crate::dispatcher::DeliveryObserver
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[cfg(feature = "http")]
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ingestion endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected ingestion response: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl From<String> for SinkError {
    fn from(message: String) -> Self {
        SinkError::Other(message)
    }
}

impl From<&str> for SinkError {
    fn from(message: &str) -> Self {
        SinkError::Other(message.to_string())
    }
}
