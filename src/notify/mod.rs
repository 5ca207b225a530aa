//! Outbound notifications (email) and the user-facing notice channel.
//!
//! A [`Notification`] leaves the system through a [`Notifier`]. A [`Notice`]
//! is shown to the person operating a wizard and goes to a [`NoticeSink`].

use std::{
    fmt,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex as AsyncMutex};

pub use crate::errors::NotifyError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Delivery channel for outbound notifications. Failures are per recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Logs notifications instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if !notification.to.contains('@') {
            return Err(NotifyError::Rejected(notification.to.clone()));
        }
        tracing::info!(to = %notification.to, subject = %notification.subject, "notification sent");
        Ok(())
    }
}

/// Appends each notification as one JSON line to an outbox file that a
/// separate mailer drains.
pub struct OutboxNotifier {
    path: PathBuf,
    write_lock: AsyncMutex<()>,
}

impl OutboxNotifier {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: AsyncMutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if !notification.to.contains('@') {
            return Err(NotifyError::Rejected(notification.to.clone()));
        }
        let mut line = serde_json::to_string(notification)
            .map_err(|err| NotifyError::Delivery(err.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|err| NotifyError::Delivery(err.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|err| NotifyError::Delivery(err.to_string()))?;
        tracing::debug!(to = %notification.to, outbox = %self.path.display(), "notification queued");
        Ok(())
    }
}

/// Per-recipient result of a fan-out batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: String,
    pub result: Result<(), NotifyError>,
}

/// Aggregated outcome of [`fan_out`], reported once every send has settled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub deliveries: Vec<Delivery>,
}

impl FanOutReport {
    pub fn attempted(&self) -> usize {
        self.deliveries.len()
    }

    pub fn failed(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|delivery| delivery.result.is_err())
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.attempted() - self.failed()
    }

    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &NotifyError)> {
        self.deliveries.iter().filter_map(|delivery| {
            delivery
                .result
                .as_ref()
                .err()
                .map(|err| (delivery.to.as_str(), err))
        })
    }

    /// Merges another batch into this report.
    pub fn extend(&mut self, other: FanOutReport) {
        self.deliveries.extend(other.deliveries);
    }

    /// "Team created" or "Team created, but 2 of 5 notifications failed to send".
    pub fn describe(&self, headline: &str) -> String {
        if self.is_complete() {
            headline.to_string()
        } else {
            format!(
                "{}, but {} of {} notifications failed to send",
                headline,
                self.failed(),
                self.attempted()
            )
        }
    }
}

/// Sends every notification concurrently and waits for all of them to settle.
///
/// Individual failures are recorded in the report and never abort the batch.
pub async fn fan_out(notifier: &dyn Notifier, batch: Vec<Notification>) -> FanOutReport {
    let sends = batch.iter().map(|notification| async move {
        let result = notifier.send(notification).await;
        if let Err(err) = &result {
            tracing::warn!(to = %notification.to, error = %err, "notification failed");
        }
        Delivery {
            to: notification.to.clone(),
            result,
        }
    });
    FanOutReport {
        deliveries: join_all(sends).await,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Message for the person driving a wizard, or a refetch signal for views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Message { level: NoticeLevel, text: String },
    /// A collection changed; cached lists of it should be reloaded.
    Refresh(&'static str),
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice::Message {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Notice::Message {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Notice::Message {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice::Message {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }

    pub fn level(&self) -> Option<NoticeLevel> {
        match self {
            Notice::Message { level, .. } => Some(*level),
            Notice::Refresh(_) => None,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Message { text, .. } => write!(f, "{}", text),
            Notice::Refresh(collection) => write!(f, "refresh {}", collection),
        }
    }
}

/// Capability handed to a wizard for user-visible messages.
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Forwards notices to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NoticeSink for TracingSink {
    fn notify(&self, notice: Notice) {
        match notice.level() {
            Some(NoticeLevel::Error) => tracing::error!("{}", notice),
            Some(NoticeLevel::Warning) => tracing::warn!("{}", notice),
            Some(_) => tracing::info!("{}", notice),
            None => tracing::debug!("{}", notice),
        }
    }
}

/// Keeps every notice in memory; used by tests and by the CLI to drain
/// messages after each wizard action.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn drain(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }

    pub fn messages(&self, level: NoticeLevel) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|notice| match notice {
                Notice::Message { level: found, text } if found == level => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl NoticeSink for CollectingSink {
    fn notify(&self, notice: Notice) {
        if let Ok(mut guard) = self.notices.lock() {
            guard.push(notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowNotifier {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        reject: &'static str,
    }

    #[async_trait]
    impl Notifier for SlowNotifier {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if notification.to == self.reject {
                Err(NotifyError::Rejected(notification.to.clone()))
            } else {
                Ok(())
            }
        }
    }

    fn batch(recipients: &[&str]) -> Vec<Notification> {
        recipients
            .iter()
            .map(|to| Notification::new(*to, "Hallo", "Body"))
            .collect()
    }

    #[tokio::test]
    async fn fan_out_runs_concurrently_and_reports_each_recipient() {
        let notifier = SlowNotifier {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            reject: "b@example.org",
        };
        let report = fan_out(
            &notifier,
            batch(&["a@example.org", "b@example.org", "c@example.org"]),
        )
        .await;

        assert_eq!(report.attempted(), 3);
        assert_eq!(report.failed(), 1);
        assert_eq!(notifier.peak.load(Ordering::SeqCst), 3);
        let failed: Vec<_> = report.failures().map(|(to, _)| to).collect();
        assert_eq!(failed, vec!["b@example.org"]);
        assert_eq!(
            report.describe("Team created"),
            "Team created, but 1 of 3 notifications failed to send"
        );
    }

    #[tokio::test]
    async fn empty_batch_is_complete() {
        let report = fan_out(&LogNotifier, Vec::new()).await;
        assert!(report.is_complete());
        assert_eq!(report.describe("Member created"), "Member created");
    }

    #[tokio::test]
    async fn outbox_appends_json_lines() {
        let temp = tempfile::TempDir::new().unwrap();
        let notifier = OutboxNotifier::new(temp.path().join("outbox.jsonl"));
        let report = fan_out(&notifier, batch(&["a@example.org", "invalid"])).await;
        assert_eq!(report.failed(), 1);

        let contents = std::fs::read_to_string(notifier.path()).unwrap();
        let lines: Vec<Notification> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines, batch(&["a@example.org"]));
    }

    #[test]
    fn collecting_sink_filters_by_level() {
        let sink = CollectingSink::new();
        sink.notify(Notice::success("saved"));
        sink.notify(Notice::Refresh("members"));
        sink.notify(Notice::error("offline"));
        assert_eq!(sink.messages(NoticeLevel::Error), vec!["offline".to_string()]);
        assert_eq!(sink.drain().len(), 3);
        assert!(sink.notices().is_empty());
    }
}
