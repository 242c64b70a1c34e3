use crate::buffer::DEFAULT_BUFFER_SIZE;
use crate::error::ClientError;
use crate::record::DEFAULT_ENVIRONMENT;
use std::time::Duration;

// Environment variable names read by `ClientConfig::from_env`. The client
// itself never touches the environment once built.

/// Base URL of the ingestion API, e.g. `https://localhost:7020`.
pub const LOG_CENTER_API_URL_ENV: &str = "LOG_CENTER_API_URL";

/// Name of the application emitting logs. Required.
pub const LOG_CENTER_APPLICATION_ENV: &str = "LOG_CENTER_APPLICATION";

/// Deployment environment, defaults to `Production`.
pub const LOG_CENTER_ENVIRONMENT_ENV: &str = "LOG_CENTER_ENVIRONMENT";

/// Buffered record count that triggers a flush.
pub const LOG_CENTER_BUFFER_SIZE_ENV: &str = "LOG_CENTER_BUFFER_SIZE";

/// Seconds between scheduled flushes; `0` disables them.
pub const LOG_CENTER_FLUSH_INTERVAL_SECS_ENV: &str = "LOG_CENTER_FLUSH_INTERVAL_SECS";

/// Optional per-request timeout in seconds.
pub const LOG_CENTER_REQUEST_TIMEOUT_SECS_ENV: &str = "LOG_CENTER_REQUEST_TIMEOUT_SECS";

/// Default period between scheduled flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Settings for a [`LogCenterClient`](crate::client::LogCenterClient).
///
/// **Fields**
/// - `endpoint`: base URL of the ingestion API. Required unless a custom
///   sink is supplied to the builder.
/// - `application_name`: stamped on every record. Must not be blank.
/// - `environment`: stamped on every record, `Production` when `None`.
/// - `buffer_size`: buffered record count that triggers a flush; `0`
///   means the default of 100.
/// - `auto_flush_interval`: period of scheduled flushes; zero disables
///   the scheduler entirely.
/// - `request_timeout`: whole-request timeout for the HTTP sink; `None`
///   keeps the transport default.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub endpoint: Option<String>,
    pub application_name: String,
    pub environment: Option<String>,
    pub buffer_size: usize,
    pub auto_flush_interval: Duration,
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            application_name: String::new(),
            environment: Some(DEFAULT_ENVIRONMENT.to_string()),
            buffer_size: DEFAULT_BUFFER_SIZE,
            auto_flush_interval: DEFAULT_FLUSH_INTERVAL,
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_auto_flush_interval(mut self, interval: Duration) -> Self {
        self.auto_flush_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build a config from `LOG_CENTER_*` environment variables, falling
    /// back to defaults for anything unset.
    ///
    /// A missing application name is not reported here; it fails at
    /// `build()` like any other blank name.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::new(env_or(LOG_CENTER_APPLICATION_ENV, ""));

        let endpoint = env_or(LOG_CENTER_API_URL_ENV, "");
        if !endpoint.trim().is_empty() {
            config.endpoint = Some(endpoint);
        }
        config.environment = Some(env_or(LOG_CENTER_ENVIRONMENT_ENV, DEFAULT_ENVIRONMENT));

        if let Some(size) = env_parse::<usize>(LOG_CENTER_BUFFER_SIZE_ENV)? {
            config.buffer_size = size;
        }
        if let Some(secs) = env_parse::<u64>(LOG_CENTER_FLUSH_INTERVAL_SECS_ENV)? {
            config.auto_flush_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>(LOG_CENTER_REQUEST_TIMEOUT_SECS_ENV)? {
            config.request_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Checks performed by the builder before anything is allocated.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.application_name.trim().is_empty() {
            return Err(ClientError::MissingApplicationName);
        }
        Ok(())
    }

    /// `true` when a scheduled flush should be armed.
    pub fn auto_flush_enabled(&self) -> bool {
        !self.auto_flush_interval.is_zero()
    }
}

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ClientError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ClientError::InvalidEnv { key, value }),
        Err(_) => Ok(None),
    }
}
