// src/notification.rs

//! Deduplicated result notifications.
//!
//! The sink remembers the last shown result and only displays a notification
//! when the result flips, so a long green (or red) streak produces exactly
//! one desktop popup.

use tracing::{debug, warn};

/// Displays one notification. Implemented by the desktop notifier and by
/// recording fakes in tests.
pub trait Notifier: Send {
    fn show(&mut self, message: &str, icon: Option<&str>) -> anyhow::Result<()>;
}

/// Desktop notifications via the platform notification service.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn show(&mut self, message: &str, icon: Option<&str>) -> anyhow::Result<()> {
        let mut notification = notify_rust::Notification::new();
        notification.summary("testwatch").body(message);
        if let Some(icon) = icon {
            notification.icon(icon);
        }
        notification.show()?;
        Ok(())
    }
}

/// Result notifier with transition-only display.
pub struct NotificationSink {
    last_result: Option<bool>,
    notifier: Box<dyn Notifier>,
}

impl NotificationSink {
    pub fn new(notifier: Box<dyn Notifier>) -> NotificationSink {
        NotificationSink {
            last_result: None,
            notifier,
        }
    }

    /// Show `message` unless `passed` equals the last shown result.
    pub fn notify(&mut self, passed: bool, message: &str) {
        if self.last_result == Some(passed) {
            debug!(passed, "result unchanged, suppressing notification");
            return;
        }
        self.last_result = Some(passed);

        let icon = if passed {
            Some("dialog-information")
        } else {
            None
        };

        if let Err(err) = self.notifier.show(message, icon) {
            warn!(error = %err, "failed to show notification");
        }
    }
}

impl std::fmt::Debug for NotificationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSink")
            .field("last_result", &self.last_result)
            .finish_non_exhaustive()
    }
}
