//! Notification and navigation collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use formbind_core::config::NotificationOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Success,
    Error,
    Warning,
}

/// Message body: plain text, or an HTML fragment (messages joined by `<br>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationBody {
    Text(String),
    Html(String),
}

impl NotificationBody {
    /// Join `messages` into an HTML list body.
    pub fn html_list<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined: Vec<String> = messages.into_iter().map(|m| m.as_ref().to_string()).collect();
        Self::Html(joined.join("<br>"))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) | Self::Html(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotifyKind,
    pub title: String,
    pub body: NotificationBody,
    pub options: NotificationOptions,
}

/// Shows notifications to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.kind {
            NotifyKind::Success => tracing::info!(title = %n.title, body = n.body.as_str(), "Notification"),
            NotifyKind::Warning => tracing::warn!(title = %n.title, body = n.body.as_str(), "Notification"),
            NotifyKind::Error => tracing::error!(title = %n.title, body = n.body.as_str(), "Notification"),
        }
    }
}

/// Moves the host to another location.
pub trait Navigator: Send + Sync {
    /// Schedule navigation to `url` after `delay`.
    fn schedule_redirect(&self, url: &str, delay: Duration);
}

/// Runs a callback after the delay on the tokio runtime.
pub struct DeferredNavigator {
    go: Arc<dyn Fn(&str) + Send + Sync>,
}

impl DeferredNavigator {
    pub fn new(go: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self { go: Arc::new(go) }
    }
}

impl Navigator for DeferredNavigator {
    fn schedule_redirect(&self, url: &str, delay: Duration) {
        let go = Arc::clone(&self.go);
        let url = url.to_string();
        tracing::debug!(%url, delay_ms = delay.as_millis() as u64, "Redirect scheduled");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            go(&url);
        });
    }
}

/// Remembers the last redirect request instead of performing it.
#[derive(Debug, Default)]
pub struct PendingRedirect {
    last: Mutex<Option<(String, Duration)>>,
}

impl PendingRedirect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<(String, Duration)> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Navigator for PendingRedirect {
    fn schedule_redirect(&self, url: &str, delay: Duration) {
        *self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some((url.to_string(), delay));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_list_joins_with_line_breaks() {
        let body = NotificationBody::html_list(["Name is required", "Bad email"]);
        assert_eq!(body, NotificationBody::Html("Name is required<br>Bad email".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_navigator_waits_for_delay() {
        let visited = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&visited);
        let navigator = DeferredNavigator::new(move |url| sink.lock().unwrap().push(url.to_string()));

        navigator.schedule_redirect("/dashboard", Duration::from_millis(2000));
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(visited.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(*visited.lock().unwrap(), vec!["/dashboard".to_string()]);
    }

    #[test]
    fn pending_redirect_records_last_request() {
        let nav = PendingRedirect::new();
        nav.schedule_redirect("/x", Duration::from_secs(2));
        assert_eq!(nav.last(), Some(("/x".to_string(), Duration::from_secs(2))));
    }
}
