//! Log capture for tests.
//!
//! [`capture_logs`] installs a thread-local subscriber that records every
//! event; the returned guard exposes what was logged and uninstalls the
//! subscriber on drop. `#[tokio::test]` runs on the test thread, so async
//! tests are covered as well.

use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::prelude::*;

/// A captured log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Layer that pushes events into shared storage.
pub struct TestLogLayer {
    storage: Arc<Mutex<Vec<LogEntry>>>,
}

impl<S> tracing_subscriber::Layer<S> for TestLogLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        struct Visitor<'a> {
            message: &'a mut String,
            fields: &'a mut Vec<(String, String)>,
        }

        impl tracing::field::Visit for Visitor<'_> {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    *self.message = value.to_string();
                } else {
                    self.fields.push((field.name().to_string(), value.to_string()));
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                let value = format!("{value:?}");
                if field.name() == "message" {
                    *self.message = value;
                } else {
                    self.fields.push((field.name().to_string(), value));
                }
            }
        }

        let metadata = event.metadata();
        let mut message = String::new();
        let mut fields = Vec::new();
        event.record(&mut Visitor {
            message: &mut message,
            fields: &mut fields,
        });

        if let Ok(mut storage) = self.storage.lock() {
            storage.push(LogEntry {
                level: *metadata.level(),
                target: metadata.target().to_string(),
                message,
                fields,
            });
        }
    }
}

/// Keeps the capturing subscriber installed while alive.
pub struct LogCapture {
    storage: Arc<Mutex<Vec<LogEntry>>>,
    _guard: DefaultGuard,
}

impl LogCapture {
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.storage.lock().map(|s| s.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, level: Level, message: &str) -> bool {
        self.entries()
            .iter()
            .any(|e| e.level == level && e.message.contains(message))
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.entries().iter().any(|e| e.level == Level::WARN)
    }

    /// Render everything captured, for assertion messages.
    #[must_use]
    pub fn dump(&self) -> String {
        let entries = self.entries();
        if entries.is_empty() {
            return String::from("No logs captured");
        }
        entries
            .iter()
            .map(|e| {
                let fields: Vec<String> = e.fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("[{}] {}: {} {}", e.level, e.target, e.message, fields.join(" "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Start capturing every event emitted on this thread.
#[must_use]
pub fn capture_logs() -> LogCapture {
    let storage = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(TestLogLayer {
        storage: Arc::clone(&storage),
    });
    let guard = tracing::subscriber::set_default(subscriber);
    LogCapture {
        storage,
        _guard: guard,
    }
}

/// Assert that a log entry with the given level and message was captured.
#[macro_export]
macro_rules! assert_log_contains {
    ($capture:expr, $level:expr, $message:expr) => {{
        assert!(
            $capture.contains($level, $message),
            "Expected log with level {} containing '{}'\nCaptured logs:\n{}",
            $level,
            $message,
            $capture.dump()
        );
    }};
}
