use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveTime, Utc};
use zabota::appsettings::AppSettings;
use zabota::delivery::{
    ActionHandler, AlertPattern, DeliveredReminder, DeliveryHandler, LocalTaskQueue,
    LocalTimerChannel, Notifier,
};
use zabota::reminder::{FireTime, Reminder, ReminderKind, RepeatKind, Schedule};
use zabota::scheduling::{DispatchToken, ScheduleDispatcher};
use zabota::storage::InMemoryReminderStorage;
use zabota::ReminderEngine;

/// Prints notifications instead of handing them to a platform notifier.
struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn present(
        &self,
        token: DispatchToken,
        delivered: DeliveredReminder,
        alert: AlertPattern,
    ) -> anyhow::Result<()> {
        log::info!(
            "🔔 {}: {} [token = {}, severity = {:?}]",
            delivered.title,
            delivered.message,
            token,
            alert.severity
        );
        Ok(())
    }

    async fn dismiss(&self, token: DispatchToken) -> anyhow::Result<()> {
        log::info!("Dismissed notification. [token = {}]", token);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = AppSettings::load()?;
    log::info!("Loaded settings: {:?}", settings);

    let storage = Arc::new(InMemoryReminderStorage::new());
    let notifier = Arc::new(LogNotifier);
    let handler = Arc::new(DeliveryHandler::new(
        Arc::clone(&notifier) as _,
        settings.notifications.clone().into(),
    ));
    let timer = Arc::new(LocalTimerChannel::new(Arc::clone(&handler) as _));
    let queue = Arc::new(LocalTaskQueue::new(Arc::clone(&handler) as _));
    let dispatcher = Arc::new(ScheduleDispatcher::new(
        timer,
        queue,
        settings.scheduling.clone(),
    ));
    let actions = ActionHandler::new(
        Arc::clone(&storage),
        Arc::clone(&dispatcher),
        notifier,
        Duration::minutes(settings.scheduling.snooze_minutes),
    );
    let engine = ReminderEngine::new(dispatcher, actions);

    let reminder = Reminder {
        id: 1,
        kind: ReminderKind::Medicine,
        title: "Vitamin D".to_owned(),
        description: Some("Take one capsule with a meal".to_owned()),
        schedule: Schedule {
            times: vec![
                FireTime::new(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
                FireTime::new(NaiveTime::from_hms_opt(21, 0, 0).unwrap()),
            ],
            weekdays: None,
            start_date: Utc::now().date_naive(),
            end_date: None,
            repeat: RepeatKind::Daily,
        },
        enabled: true,
        created_at: Utc::now(),
        last_fired_at: None,
    };
    storage.insert(reminder.clone()).await;

    let count = engine.schedule(&reminder).await?;
    log::info!("Scheduled {count} occurrences, waiting for deliveries. Ctrl-C to exit.");

    tokio::signal::ctrl_c().await?;

    Ok(())
}
