pub mod buffer;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod layer;
pub mod record;
pub mod scheduler;
pub mod sink;

#[cfg(feature = "http")]
pub mod http;

pub mod init;
pub mod noop_sink;

pub use client::{ClientBuilder, ClientState, LogCenterClient};
pub use config::ClientConfig;
pub use error::{ClientError, SinkError};
pub use record::{levels, LogRecord};
pub use sink::LogSink;
