//! User-facing notification queue, rendered by the UI as toasts.
//!
//! `notify(message, level)` is fire-and-forget: the engine pushes and moves
//! on, the UI drains and displays. Nothing in the core ever blocks on a
//! notification being seen.

use std::collections::VecDeque;
use std::time::Instant;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Neutral progress information
    Info,
    /// An operation completed
    Success,
    /// Something was skipped or degraded but the session continues
    Warning,
    /// An operation failed outright
    Error,
}

/// One queued notification.
#[derive(Debug, Clone)]
pub struct Notification {
    /// The user-facing message
    pub message: String,
    /// Severity, which picks the toast color
    pub level: Level,
    /// When the notification was raised
    pub raised_at: Instant,
}

/// FIFO queue of pending notifications.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    queue: VecDeque<Notification>,
}

impl NotificationCenter {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a notification. Fire-and-forget.
    pub fn notify(&mut self, message: impl Into<String>, level: Level) {
        let message = message.into();
        match level {
            Level::Warning => log::warn!("{message}"),
            Level::Error => log::error!("{message}"),
            _ => log::info!("{message}"),
        }
        self.queue.push_back(Notification {
            message,
            level,
            raised_at: Instant::now(),
        });
    }

    /// Drops notifications older than `max_age_secs` and returns the
    /// survivors for rendering, oldest first.
    pub fn active(&mut self, max_age_secs: f32) -> impl Iterator<Item = &Notification> {
        let now = Instant::now();
        self.queue
            .retain(|n| now.duration_since(n.raised_at).as_secs_f32() < max_age_secs);
        self.queue.iter()
    }

    /// Number of queued notifications, expired or not.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Removes everything, e.g. when switching pages.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_queues_in_order() {
        let mut center = NotificationCenter::new();
        center.notify("first", Level::Info);
        center.notify("second", Level::Warning);

        let messages: Vec<&str> = center
            .active(60.0)
            .map(|n| n.message.as_str())
            .collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn active_drops_expired() {
        let mut center = NotificationCenter::new();
        center.notify("old", Level::Info);
        // A max age of zero expires everything immediately.
        assert_eq!(center.active(0.0).count(), 0);
        assert!(center.is_empty());
    }
}
