use crate::host::HostIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

/// Environment reported when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "Production";

/// Conventional level labels understood by the ingestion API.
///
/// The level is free text on the wire; these are simply the values the
/// convenience methods on the client use.
pub mod levels {
    pub const INFORMATION: &str = "Information";
    pub const WARNING: &str = "Warning";
    pub const ERROR: &str = "Error";
    pub const DEBUG: &str = "Debug";
    pub const CRITICAL: &str = "Critical";
}

/// One log event as submitted to the ingestion API.
///
/// Optional text fields are empty strings when absent, matching what the
/// endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
    pub exception: String,
    pub stack_trace: String,
    pub application: String,
    pub environment: String,
    pub machine_name: String,
    pub category: String,
    pub additional_data: String,
}

/// Builds [`LogRecord`]s stamped with this client's application,
/// environment and host.
///
/// Level and message are taken verbatim; validating them is the
/// ingestion endpoint's job.
#[derive(Clone)]
pub struct RecordFactory {
    application: String,
    environment: String,
    host: Arc<dyn HostIdentity>,
}

impl RecordFactory {
    pub fn new(
        application: impl Into<String>,
        environment: Option<String>,
        host: Arc<dyn HostIdentity>,
    ) -> Self {
        let environment = environment
            .filter(|env| !env.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        Self {
            application: application.into(),
            environment,
            host,
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn build(
        &self,
        level: impl Into<String>,
        message: impl Into<String>,
        error: Option<&(dyn Error + 'static)>,
    ) -> LogRecord {
        self.build_with(level, message, error, String::new(), String::new())
    }

    /// Like [`build`](Self::build) but also sets `category` and
    /// `additional_data`.
    pub fn build_with(
        &self,
        level: impl Into<String>,
        message: impl Into<String>,
        error: Option<&(dyn Error + 'static)>,
        category: String,
        additional_data: String,
    ) -> LogRecord {
        let (exception, stack_trace) = match error {
            Some(err) => (err.to_string(), cause_chain(err)),
            None => (String::new(), String::new()),
        };
        self.assemble(level.into(), message.into(), exception, stack_trace, category, additional_data)
    }

    pub(crate) fn assemble(
        &self,
        level: String,
        message: String,
        exception: String,
        stack_trace: String,
        category: String,
        additional_data: String,
    ) -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            level,
            message,
            exception,
            stack_trace,
            application: self.application.clone(),
            environment: self.environment.clone(),
            machine_name: self.host.machine_name(),
            category,
            additional_data,
        }
    }
}

/// Renders the `source()` chain below `err`, one cause per line.
pub(crate) fn cause_chain(err: &(dyn Error + 'static)) -> String {
    let mut lines = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {}", cause));
        source = cause.source();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FixedHostIdentity;
    use std::fmt;

    #[derive(Debug)]
    struct Wrapped {
        msg: &'static str,
        inner: Option<Box<Wrapped>>,
    }

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.msg)
        }
    }

    impl Error for Wrapped {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            self.inner.as_deref().map(|e| e as &(dyn Error + 'static))
        }
    }

    fn factory(env: Option<&str>) -> RecordFactory {
        RecordFactory::new(
            "billing",
            env.map(str::to_string),
            Arc::new(FixedHostIdentity::new("web-01")),
        )
    }

    #[test]
    fn fills_defaults() {
        let before = Utc::now();
        let record = factory(None).build(levels::INFORMATION, "started", None);
        let after = Utc::now();

        assert!(record.timestamp >= before && record.timestamp <= after);
        assert_eq!(record.environment, DEFAULT_ENVIRONMENT);
        assert_eq!(record.application, "billing");
        assert_eq!(record.machine_name, "web-01");
        assert_eq!(record.level, "Information");
        assert_eq!(record.message, "started");
        assert!(record.exception.is_empty());
        assert!(record.stack_trace.is_empty());
        assert!(record.category.is_empty());
    }

    #[test]
    fn blank_environment_falls_back_to_default() {
        assert_eq!(factory(Some("  ")).environment(), DEFAULT_ENVIRONMENT);
        assert_eq!(factory(Some("Staging")).environment(), "Staging");
    }

    #[test]
    fn error_fills_exception_and_cause_chain() {
        let err = Wrapped {
            msg: "payment failed",
            inner: Some(Box::new(Wrapped {
                msg: "connection reset",
                inner: Some(Box::new(Wrapped { msg: "io timeout", inner: None })),
            })),
        };

        let record = factory(None).build(levels::ERROR, "charge", Some(&err));
        assert_eq!(record.exception, "payment failed");
        assert_eq!(
            record.stack_trace,
            "caused by: connection reset\ncaused by: io timeout"
        );
    }

    #[test]
    fn empty_inputs_are_accepted() {
        let record = factory(None).build("", "", None);
        assert!(record.level.is_empty());
        assert!(record.message.is_empty());
    }

    #[test]
    fn serializes_camel_case() {
        let record = factory(None).build(levels::WARNING, "disk low", None);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["machineName"], "web-01");
        assert_eq!(json["stackTrace"], "");
        assert_eq!(json["additionalData"], "");
        assert!(json.get("machine_name").is_none());
    }
}
