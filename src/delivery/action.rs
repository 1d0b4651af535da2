use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::delivery::channel::ReminderPayload;
use crate::delivery::notifier::Notifier;
use crate::reminder::ReminderId;
use crate::scheduling::token::{self, DispatchToken, SNOOZE_SUFFIX};
use crate::scheduling::ScheduleDispatcher;
use crate::storage::ReminderStorage;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReminderAction {
    Taken,
    Snoozed,
    Dismissed,
}

impl ReminderAction {
    /// Unknown inputs dismiss instead of surfacing an error to the host.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "taken" => Self::Taken,
            "snooze" | "snoozed" => Self::Snoozed,
            _ => Self::Dismissed,
        }
    }
}

/// Event delivered by the user-action surface when a notification is acted
/// upon.
#[derive(Debug, Clone, Copy)]
pub struct ReminderActionEvent {
    pub action: ReminderAction,
    pub reminder_id: ReminderId,
    pub token: DispatchToken,
}

/// How a firing was resolved. Terminal per firing instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Taken,
    Snoozed(DateTime<Utc>),
    Dismissed,
}

/// Resolves user responses to a fired reminder: dismisses the live
/// notification and, for snooze, schedules exactly one follow-up occurrence
/// through the regular dual-channel path.
pub struct ActionHandler<S> {
    storage: Arc<S>,
    dispatcher: Arc<ScheduleDispatcher>,
    notifier: Arc<dyn Notifier>,
    snooze_delay: Duration,
}

impl<S: ReminderStorage> ActionHandler<S> {
    pub fn new(
        storage: Arc<S>,
        dispatcher: Arc<ScheduleDispatcher>,
        notifier: Arc<dyn Notifier>,
        snooze_delay: Duration,
    ) -> Self {
        Self {
            storage,
            dispatcher,
            notifier,
            snooze_delay,
        }
    }

    pub async fn on_action(&self, event: ReminderActionEvent) -> anyhow::Result<ActionOutcome> {
        self.notifier.dismiss(event.token).await?;

        match event.action {
            ReminderAction::Taken => {
                log::info!(
                    "Reminder marked as taken. [reminder_id = {}, token = {}]",
                    event.reminder_id,
                    event.token
                );
                Ok(ActionOutcome::Taken)
            }
            ReminderAction::Dismissed => Ok(ActionOutcome::Dismissed),
            ReminderAction::Snoozed => self.snooze(event).await,
        }
    }

    async fn snooze(&self, event: ReminderActionEvent) -> anyhow::Result<ActionOutcome> {
        let Some(reminder) = self.storage.get(event.reminder_id).await? else {
            log::warn!(
                "Snoozed reminder no longer exists, treating as dismissed. [reminder_id = {}]",
                event.reminder_id
            );
            return Ok(ActionOutcome::Dismissed);
        };

        let at = Utc::now() + self.snooze_delay;
        // The variant token is stable per reminder, so a second snooze
        // overwrites the first instead of stacking.
        let snooze_token = token::for_variant(event.reminder_id, SNOOZE_SUFFIX);
        self.dispatcher
            .submit_at(snooze_token, at, ReminderPayload::for_reminder(&reminder))
            .await?;

        log::info!(
            "Reminder snoozed. [reminder_id = {}, token = {}, until = {}]",
            event.reminder_id,
            snooze_token,
            at
        );

        Ok(ActionOutcome::Snoozed(at))
    }
}
