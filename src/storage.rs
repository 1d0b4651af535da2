use std::collections::HashMap;
use std::convert::Infallible;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::reminder::{Reminder, ReminderId};

/// Read side of the reminder repository. The engine only ever reads through
/// it; persistence belongs to the owning collaborator.
#[async_trait]
pub trait ReminderStorage: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn get(&self, id: ReminderId) -> Result<Option<Reminder>, Self::Error>;
    async fn get_all(&self) -> Result<Vec<Reminder>, Self::Error>;
}

#[derive(Default)]
pub struct InMemoryReminderStorage {
    store: RwLock<HashMap<ReminderId, Reminder>>,
}

impl InMemoryReminderStorage {
    pub fn new() -> Self {
        Default::default()
    }

    pub async fn insert(&self, reminder: Reminder) {
        self.store.write().await.insert(reminder.id, reminder);
    }

    pub async fn remove(&self, id: ReminderId) {
        self.store.write().await.remove(&id);
    }
}

#[async_trait]
impl ReminderStorage for InMemoryReminderStorage {
    type Error = Infallible;

    async fn get(&self, id: ReminderId) -> Result<Option<Reminder>, Self::Error> {
        Ok(self.store.read().await.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Reminder>, Self::Error> {
        Ok(self.store.read().await.values().cloned().collect())
    }
}
