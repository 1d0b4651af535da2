use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::delivery::channel::{DeliverySink, ReminderPayload};
use crate::delivery::notifier::{
    AlertPattern, AlertSeverity, DeliveredReminder, NotificationConfig, Notifier,
};
use crate::reminder::ReminderKind;
use crate::scheduling::DispatchToken;

/// Turns a fired token into a presented notification. Both delivery channels
/// route here; duplicates collapse in the notifier by token.
pub struct DeliveryHandler {
    notifier: Arc<dyn Notifier>,
    config: NotificationConfig,
}

impl DeliveryHandler {
    pub fn new(notifier: Arc<dyn Notifier>, config: NotificationConfig) -> Self {
        Self { notifier, config }
    }

    pub async fn handle(
        &self,
        token: DispatchToken,
        payload: ReminderPayload,
        fired_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let alert = self.alert_pattern(payload.kind);
        let delivered = DeliveredReminder {
            reminder_id: payload.reminder_id,
            fired_at,
            title: payload.title,
            message: payload.message,
            kind: payload.kind,
        };

        self.notifier.present(token, delivered, alert).await
    }

    fn alert_pattern(&self, kind: ReminderKind) -> AlertPattern {
        let severity = match kind {
            ReminderKind::Medicine | ReminderKind::Vaccination | ReminderKind::Appointment => {
                AlertSeverity::Urgent
            }
            ReminderKind::Checkup | ReminderKind::Custom => AlertSeverity::Gentle,
        };

        AlertPattern {
            severity,
            sound: self.config.sound.clone(),
            vibration: self.config.vibration && severity == AlertSeverity::Urgent,
        }
    }
}

#[async_trait]
impl DeliverySink for DeliveryHandler {
    async fn on_fire(
        &self,
        token: DispatchToken,
        payload: ReminderPayload,
        fired_at: DateTime<Utc>,
    ) {
        let reminder_id = payload.reminder_id;
        if let Err(error) = self.handle(token, payload, fired_at).await {
            log::error!(
                "Failed to present fired reminder. [reminder_id = {}, token = {}, error = {}]",
                reminder_id,
                token,
                error
            );
        }
    }
}
