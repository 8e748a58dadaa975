//! Terminal output.
//!
//! The only place in the CLI allowed to write to stdout and stderr.

use verger_storefront::notify::{Notification, NotificationLevel, Notifier};

/// Print a line of command output.
#[allow(clippy::print_stdout)]
pub fn line(text: &str) {
    println!("{text}");
}

/// Print an error for the shopper.
#[allow(clippy::print_stderr)]
pub fn error(text: &str) {
    eprintln!("error: {text}");
}

/// Shows storefront notifications as prefixed terminal lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => line(&format!("✓ {}", notification.message)),
            NotificationLevel::Info => line(&format!("· {}", notification.message)),
            NotificationLevel::Error => error(&notification.message),
        }
    }
}
