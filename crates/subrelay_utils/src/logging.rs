//! Logging setup
//!
//! Installs a global `tracing` subscriber. Two output formats are supported:
//! JSON lines (the default) and human-readable text.
//!
//! JSON lines use the field names Cloud Logging understands: the level is
//! written as `severity` and the formatted text as `message`, so error lines
//! are classified as errors by the log collector.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Output format of the process log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl LogFormat {
    /// Anything other than `json` selects the text formatter.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Text => "text",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a level name such as `debug` or `WARN`. `warning` is accepted as
/// an alias of `warn`.
pub fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

/// Initialize tracing/logging for the application.
///
/// An unknown `level` falls back to `info` and the problem is reported
/// through the freshly installed subscriber. Uses `try_init` so tests can
/// call this more than once.
pub fn init(level: &str, format: LogFormat) {
    let max_level = parse_level(level).unwrap_or(Level::INFO);

    let _ = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .event_format(CloudJson)
            .with_max_level(max_level)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_max_level(max_level)
            .with_target(false)
            .with_ansi(true)
            .try_init(),
    };

    if parse_level(level).is_none() {
        tracing::error!("log level {level:?} is not ok, setting to info by default");
    }
}

/// One JSON object per event: `timestamp`, `severity`, `target`, `message`
/// and the event's own fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudJson;

impl<S, N> FormatEvent<S, N> for CloudJson
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        let mut line = Map::new();
        line.insert(
            "timestamp".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        line.insert("severity".to_string(), Value::from(meta.level().to_string()));
        line.insert("target".to_string(), Value::from(meta.target()));

        let mut fields = JsonFields(Map::new());
        event.record(&mut fields);
        line.extend(fields.0);

        let encoded = serde_json::to_string(&line).map_err(|_| fmt::Error)?;
        writeln!(writer, "{encoded}")
    }
}

struct JsonFields(Map<String, Value>);

impl JsonFields {
    fn insert(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_string(), value);
    }
}

impl Visit for JsonFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}

/// Masks a secret for log output, keeping only its length.
pub fn redact(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        format!("<redacted {} bytes>", secret.len())
    }
}
