//! Short-lived user-facing notifications.
//!
//! Failures that the application swallows still have to be shown to the
//! user. Components report them through a [`Notifier`]; the front end decides
//! how to render them (a toast, a stderr line, a test recorder).

use parking_lot::Mutex;

/// Sink for transient user-facing notifications.
pub trait Notifier: Send + Sync {
    /// Surface `message` to the user.
    fn notify(&self, message: &str);
}

/// Notifier that only logs the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(notification = %message, "User notification");
    }
}

/// Notifier that keeps every message it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}
