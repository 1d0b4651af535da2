use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::reminder::{ReminderId, ReminderKind};
use crate::scheduling::DispatchToken;

/// Payload handed to the [`Notifier`] at fire time. Not persisted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredReminder {
    pub reminder_id: ReminderId,
    pub fired_at: DateTime<Utc>,
    pub title: String,
    pub message: String,
    pub kind: ReminderKind,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AlertSeverity {
    Urgent,
    Gentle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPattern {
    pub severity: AlertSeverity,
    pub sound: Option<String>,
    pub vibration: bool,
}

/// Alert preferences handed to the delivery handler at construction.
#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    pub sound: Option<String>,
    pub vibration: bool,
}

/// External collaborator presenting notifications to the user.
///
/// The notification id is the dispatch token, so when both channels fire for
/// the same occurrence the second `present` replaces the first instead of
/// duplicating it.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn present(
        &self,
        token: DispatchToken,
        delivered: DeliveredReminder,
        alert: AlertPattern,
    ) -> anyhow::Result<()>;

    async fn dismiss(&self, token: DispatchToken) -> anyhow::Result<()>;
}
