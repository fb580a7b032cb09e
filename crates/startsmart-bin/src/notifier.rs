//! Terminal rendering of user notifications.

use startsmart_config_and_utils::Notifier;
use tracing::info;

/// Prints notifications to stderr so stdout stays machine-readable.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        info!(notification = %message, "User notification");
        eprintln!("{}", message);
    }
}
