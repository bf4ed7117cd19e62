//! User-visible notifications, e.g. toasts, for the outcome of mutations.

/// Whether a notification reports a success or a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// The action worked.
    Success,
    /// The action failed.
    Error,
}

/// A short message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Whether this reports a success or a failure.
    pub kind: NotificationKind,
    /// A few words summarising what happened.
    pub title: String,
    /// A sentence with more detail.
    pub description: String,
}

impl Notification {
    /// Create a success notification.
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    /// Create an error notification.
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Something that can show notifications to the user.
pub trait Notifier {
    /// Show `notification` to the user.
    fn notify(&mut self, notification: Notification);
}

/// A [Notifier] that writes notifications to the log.
///
/// Useful for headless clients such as scripts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => {
                tracing::info!("{}: {}", notification.title, notification.description)
            }
            NotificationKind::Error => {
                tracing::warn!("{}: {}", notification.title, notification.description)
            }
        }
    }
}
