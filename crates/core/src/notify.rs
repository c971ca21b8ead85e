//! Notification sink — fire-and-forget user-visible notices.
//!
//! The pipeline converts every failure into a notification at the
//! orchestration boundary; nothing propagates to the caller of a send
//! entry point. Hosts plug in their own sink (toast, status bar, log).

use std::sync::Mutex;

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Success,
}

/// The notification sink collaborator. Fire-and-forget: no return value is
/// consumed by the pipeline.
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);

    fn error(&self, message: &str) {
        self.notify(Severity::Error, message);
    }

    fn warning(&self, message: &str) {
        self.notify(Severity::Warning, message);
    }

    fn info(&self, message: &str) {
        self.notify(Severity::Info, message);
    }

    fn success(&self, message: &str) {
        self.notify(Severity::Success, message);
    }
}

/// A sink that records notifications in memory. Used by tests and by
/// headless embeddings that poll for notices.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count_of(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
}

/// A sink that forwards notifications to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => tracing::error!(target: "denkitsu::notify", "{message}"),
            Severity::Warning => tracing::warn!(target: "denkitsu::notify", "{message}"),
            Severity::Info | Severity::Success => {
                tracing::info!(target: "denkitsu::notify", "{message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_captures_in_order() {
        let sink = RecordingNotifier::new();
        sink.warning("first");
        sink.error("second");
        sink.success("third");

        let entries = sink.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], (Severity::Warning, "first".into()));
        assert_eq!(entries[1], (Severity::Error, "second".into()));
        assert_eq!(entries[2], (Severity::Success, "third".into()));
    }

    #[test]
    fn count_by_severity() {
        let sink = RecordingNotifier::new();
        sink.error("a");
        sink.error("b");
        sink.info("c");
        assert_eq!(sink.count_of(Severity::Error), 2);
        assert_eq!(sink.count_of(Severity::Info), 1);
        assert_eq!(sink.count_of(Severity::Warning), 0);
    }
}
