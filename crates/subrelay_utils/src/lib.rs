//! subrelay_utils
//!
//! Shared helpers for the relay binary and libraries. Currently this is the
//! logging setup (level parsing, text/json formatting, secret redaction).

pub mod logging;

pub use logging::{CloudJson, LogFormat};

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::logging::{self, CloudJson, LogFormat};
    use tracing::Level;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_lines_carry_severity_and_message() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .event_format(CloudJson)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(source_id = "2", attempt = 3u64, "err when relaying message: unavailable");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains(r#""severity":"ERROR""#), "got: {output}");

        let line: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(line["message"], "err when relaying message: unavailable");
        assert_eq!(line["source_id"], "2");
        assert_eq!(line["attempt"], 3);
        assert!(line.get("level").is_none());
        assert!(line["timestamp"].as_str().is_some());
    }

    #[test]
    fn logging_init_accepts_levels() {
        // Should not panic, even when a subscriber is already installed
        logging::init("info", LogFormat::Text);
        logging::init("debug", LogFormat::Json);
        logging::init("not-a-level", LogFormat::Json);
    }

    #[test]
    fn parse_level_is_case_insensitive() {
        assert_eq!(logging::parse_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(logging::parse_level(" warning "), Some(Level::WARN));
        assert_eq!(logging::parse_level("verbose"), None);
    }

    #[test]
    fn unknown_log_format_falls_back_to_text() {
        assert_eq!(LogFormat::from_name("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("text"), LogFormat::Text);
        assert_eq!(LogFormat::from_name("logfmt"), LogFormat::Text);
    }

    #[test]
    fn redact_hides_content() {
        let redacted = logging::redact("{\"private_key\":\"abc\"}");
        assert!(!redacted.contains("private_key"));
        assert_eq!(logging::redact(""), "");
    }
}
