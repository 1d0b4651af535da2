use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::reminder::{Reminder, ReminderId, ReminderKind};
use crate::scheduling::DispatchToken;

/// Everything a channel needs to replay a firing without touching storage.
/// Embedded at scheduling time and handed back verbatim when a token fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPayload {
    pub reminder_id: ReminderId,
    pub kind: ReminderKind,
    pub title: String,
    pub message: String,
}

impl ReminderPayload {
    pub fn for_reminder(reminder: &Reminder) -> Self {
        Self {
            reminder_id: reminder.id,
            kind: reminder.kind,
            title: reminder.title.clone(),
            message: reminder.message(),
        }
    }
}

/// Inexact means the platform denied the exact-timer privilege and delivery
/// degraded, not that the submission failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimerPrecision {
    Exact,
    Inexact,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(transparent)]
    Submission(#[from] anyhow::Error),

    #[error("channel quota exceeded")]
    QuotaExceeded,

    #[error("no live submission for token")]
    NotFound,
}

/// Primary channel: best-effort exact delivery at an absolute instant.
/// Aggressive power management may kill it, which is why every occurrence is
/// mirrored into a [`DeferredTaskChannel`] under the same token.
#[async_trait]
pub trait PreciseTimerChannel: Send + Sync + 'static {
    async fn submit(
        &self,
        token: DispatchToken,
        at: DateTime<Utc>,
        payload: ReminderPayload,
    ) -> Result<TimerPrecision, ChannelError>;

    async fn cancel(&self, token: DispatchToken) -> Result<(), ChannelError>;
}

/// Backup channel: relative-delay tasks cancelled by tag.
#[async_trait]
pub trait DeferredTaskChannel: Send + Sync + 'static {
    async fn submit_delayed(
        &self,
        token: DispatchToken,
        delay: Duration,
        payload: ReminderPayload,
    ) -> Result<(), ChannelError>;

    async fn cancel_by_tag(&self, tag: &str) -> Result<(), ChannelError>;
}

/// Tag a token's backup submission is cancelled by.
pub fn backup_tag(token: DispatchToken) -> String {
    token.to_string()
}

/// Where both channels deliver when a token fires. Fire-and-forget: the sink
/// owns its own error reporting.
#[async_trait]
pub trait DeliverySink: Send + Sync + 'static {
    async fn on_fire(&self, token: DispatchToken, payload: ReminderPayload, fired_at: DateTime<Utc>);
}
