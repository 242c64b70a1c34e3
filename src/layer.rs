use crate::client::Shared;
use crate::dispatcher::in_dispatch;
use crate::record::{cause_chain, levels};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Events from this crate are never forwarded, otherwise a failing
/// endpoint would feed its own warnings back into the buffer.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Crates on the HTTP path. Their connection tasks run outside the
/// dispatch scope, so they are matched by target instead.
const TRANSPORT_TARGETS: [&str; 7] = [
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
    "tower",
    "want",
];

/// `target` is `krate` itself or one of its modules.
fn is_crate_target(target: &str, krate: &str) -> bool {
    target
        .strip_prefix(krate)
        .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
}

/// Events caused by shipping records rather than by the application.
fn is_shipping_event(target: &str) -> bool {
    in_dispatch()
        || is_crate_target(target, OWN_TARGET)
        || TRANSPORT_TARGETS
            .iter()
            .any(|krate| is_crate_target(target, krate))
}

/// `tracing_subscriber` layer that turns events into records and buffers
/// them in a [`LogCenterClient`](crate::client::LogCenterClient).
///
/// Created with [`LogCenterClient::layer`](crate::client::LogCenterClient::layer).
/// Events below `min_level` are ignored. The event target becomes the
/// record's `category`, its fields (other than `message`) are stored as a
/// JSON object in `additionalData`, and an `error` field recorded as
/// `&dyn Error` fills `exception` and `stackTrace`.
///
/// Enqueueing never blocks on I/O: when a record crosses the buffer
/// threshold the batch is sent from a spawned tokio task.
pub struct LogCenterLayer {
    shared: Arc<Shared>,
    min_level: Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Events converted into records and handed to the client.
    pub forwarded_events: Arc<AtomicU64>,
}

impl LogCenterLayer {
    pub(crate) fn new(shared: Arc<Shared>, min_level: Level) -> Self {
        Self {
            shared,
            min_level,
            total_events: Arc::new(AtomicU64::new(0)),
            forwarded_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Level label the ingestion API expects for a `tracing` level.
pub fn level_label(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => levels::ERROR,
        Level::WARN => levels::WARNING,
        Level::INFO => levels::INFORMATION,
        _ => levels::DEBUG,
    }
}

impl<S> Layer<S> for LogCenterLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let meta = event.metadata();
        if *meta.level() > self.min_level || is_shipping_event(meta.target()) {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: None,
            exception: None,
            stack_trace: None,
        };
        event.record(&mut visitor);
        let FieldVisitor { message, exception, stack_trace, .. } = visitor;

        let additional_data = if fields.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&fields).unwrap_or_default()
        };

        let record = self.shared.factory.assemble(
            level_label(meta.level()).to_string(),
            message.unwrap_or_default(),
            exception.unwrap_or_default(),
            stack_trace.unwrap_or_default(),
            meta.target().to_string(),
            additional_data,
        );

        self.forwarded_events.fetch_add(1, Ordering::Relaxed);
        self.shared.submit_detached(record);
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: Option<String>,
    pub exception: Option<String>,
    pub stack_trace: Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.exception.is_none() {
            self.exception = Some(value.to_string());
            self.stack_trace = Some(cause_chain(value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
