mod action;
mod channel;
mod handler;
mod local;
mod notifier;

pub use action::{ActionHandler, ActionOutcome, ReminderAction, ReminderActionEvent};
pub use channel::{
    backup_tag, ChannelError, DeferredTaskChannel, DeliverySink, PreciseTimerChannel,
    ReminderPayload, TimerPrecision,
};
pub use handler::DeliveryHandler;
pub use local::{LocalTaskQueue, LocalTimerChannel};
pub use notifier::{
    AlertPattern, AlertSeverity, DeliveredReminder, NotificationConfig, Notifier,
};
