use std::sync::Arc;

use crate::delivery::{ActionHandler, ActionOutcome, ReminderActionEvent};
use crate::reminder::{Reminder, ReminderId};
use crate::scheduling::ScheduleDispatcher;
use crate::storage::ReminderStorage;

/// Facade over the scheduling and delivery components. The host wires its
/// platform callbacks onto these plain calls and onto the channels' delivery
/// sink; there are no other entry points.
pub struct ReminderEngine<S> {
    dispatcher: Arc<ScheduleDispatcher>,
    actions: ActionHandler<S>,
}

impl<S: ReminderStorage> ReminderEngine<S> {
    pub fn new(dispatcher: Arc<ScheduleDispatcher>, actions: ActionHandler<S>) -> Self {
        Self {
            dispatcher,
            actions,
        }
    }

    /// Computes the reminder's occurrences and submits them to both delivery
    /// channels. Returns the number of occurrences submitted.
    pub async fn schedule(&self, reminder: &Reminder) -> anyhow::Result<usize> {
        self.dispatcher.schedule(reminder).await
    }

    /// Tears down everything the reminder may have live on either channel.
    /// Must run before a rule edit takes effect.
    pub async fn cancel(&self, reminder_id: ReminderId) -> anyhow::Result<()> {
        self.dispatcher.cancel(reminder_id).await
    }

    /// Full scheduling pass over a set of reminders, run on boot, after an
    /// edit or on a periodic refresh: cancel first so stale rules never
    /// survive, then schedule the current ones.
    pub async fn resync(&self, reminders: &[Reminder]) -> anyhow::Result<usize> {
        let mut total = 0;
        for reminder in reminders {
            self.dispatcher.cancel(reminder.id).await?;
            total += self.dispatcher.schedule(reminder).await?;
        }

        log::info!(
            "Resynchronized reminders. [reminders = {}, occurrences = {}]",
            reminders.len(),
            total
        );

        Ok(total)
    }

    pub async fn on_action(&self, event: ReminderActionEvent) -> anyhow::Result<ActionOutcome> {
        self.actions.on_action(event).await
    }
}
