use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::appsettings::SchedulingSettings;
use crate::delivery::{
    backup_tag, ChannelError, DeferredTaskChannel, PreciseTimerChannel, ReminderPayload,
    TimerPrecision,
};
use crate::reminder::{Occurrence, Reminder, ReminderId};
use crate::scheduling::recurrence;
use crate::scheduling::token::{self, DispatchToken, SNOOZE_SUFFIX};

/// The engine does not track how many occurrences a rule ever produced, so
/// cancellation sweeps this many indices. A time-of-day list large enough to
/// exceed it within the horizon would leave live tokens behind.
pub const MAX_CANCEL_INDEX: usize = 100;

/// Submits every occurrence of a reminder to both delivery channels and owns
/// cancellation. Tokens are pure functions of (reminder id, index), so a
/// resubmission overwrites the previous one in both channels instead of
/// stacking, and cancellation recomputes the tokens it tears down.
pub struct ScheduleDispatcher {
    precise: Arc<dyn PreciseTimerChannel>,
    deferred: Arc<dyn DeferredTaskChannel>,
    settings: SchedulingSettings,
}

impl ScheduleDispatcher {
    pub fn new(
        precise: Arc<dyn PreciseTimerChannel>,
        deferred: Arc<dyn DeferredTaskChannel>,
        settings: SchedulingSettings,
    ) -> Self {
        Self {
            precise,
            deferred,
            settings,
        }
    }

    /// Returns the number of occurrences submitted. A failure on one channel
    /// for one occurrence never aborts the rest of the horizon.
    pub async fn schedule(&self, reminder: &Reminder) -> anyhow::Result<usize> {
        if !reminder.enabled {
            log::debug!(
                "Reminder is disabled, nothing to schedule. [reminder_id = {}]",
                reminder.id
            );
            return Ok(0);
        }

        let instants = recurrence::occurrences(
            &reminder.schedule,
            Utc::now(),
            self.settings.horizon_days,
            self.settings.timezone,
        );
        let payload = ReminderPayload::for_reminder(reminder);

        let mut submitted = 0;
        for (index, at) in instants.into_iter().enumerate() {
            let occurrence = Occurrence {
                reminder_id: reminder.id,
                index,
                at,
            };
            let token = token::for_occurrence(occurrence.reminder_id, occurrence.index);

            match self.submit_at(token, occurrence.at, payload.clone()).await {
                Ok(true) => submitted += 1,
                Ok(false) => {}
                Err(error) => log::error!(
                    "Occurrence was lost on both channels. [reminder_id = {}, token = {}, error = {}]",
                    reminder.id,
                    token,
                    error
                ),
            }
        }

        log::info!(
            "Scheduled reminder occurrences. [reminder_id = {}, count = {}]",
            reminder.id,
            submitted
        );

        Ok(submitted)
    }

    /// Submits one occurrence to both channels under `token`. Returns
    /// `Ok(false)` when the instant is already due and was skipped, and an
    /// error only when both channels rejected it.
    pub async fn submit_at(
        &self,
        token: DispatchToken,
        at: DateTime<Utc>,
        payload: ReminderPayload,
    ) -> anyhow::Result<bool> {
        let now = Utc::now();
        if at <= now {
            log::debug!(
                "Skipping occurrence that is already due. [token = {}, at = {}]",
                token,
                at
            );
            return Ok(false);
        }

        let precise_result = self.precise.submit(token, at, payload.clone()).await;
        match &precise_result {
            Ok(TimerPrecision::Exact) => {}
            Ok(TimerPrecision::Inexact) => log::debug!(
                "Exact timer privilege unavailable, delivery degraded to inexact. [token = {}]",
                token
            ),
            Err(error) => log::warn!(
                "Primary channel rejected occurrence. [token = {}, error = {}]",
                token,
                error
            ),
        }

        let deferred_result = self.deferred.submit_delayed(token, at - now, payload).await;
        if let Err(error) = &deferred_result {
            log::warn!(
                "Backup channel rejected occurrence. [token = {}, error = {}]",
                token,
                error
            );
        }

        if precise_result.is_err() && deferred_result.is_err() {
            anyhow::bail!("both delivery channels rejected the occurrence");
        }

        Ok(true)
    }

    /// Tears down every token the reminder may hold on both channels,
    /// including the snooze variant. Must run before a rule edit takes
    /// effect; "not found" counts as success.
    pub async fn cancel(&self, reminder_id: ReminderId) -> anyhow::Result<()> {
        for index in 0..MAX_CANCEL_INDEX {
            self.cancel_token(token::for_occurrence(reminder_id, index))
                .await;
        }
        self.cancel_token(token::for_variant(reminder_id, SNOOZE_SUFFIX))
            .await;

        log::info!(
            "Cancelled scheduled occurrences. [reminder_id = {}]",
            reminder_id
        );

        Ok(())
    }

    async fn cancel_token(&self, token: DispatchToken) {
        if let Err(error) = self.precise.cancel(token).await {
            if !matches!(error, ChannelError::NotFound) {
                log::warn!(
                    "Primary channel failed to cancel. [token = {}, error = {}]",
                    token,
                    error
                );
            }
        }

        if let Err(error) = self.deferred.cancel_by_tag(&backup_tag(token)).await {
            if !matches!(error, ChannelError::NotFound) {
                log::warn!(
                    "Backup channel failed to cancel. [token = {}, error = {}]",
                    token,
                    error
                );
            }
        }
    }
}
