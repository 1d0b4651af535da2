use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc, Weekday};

pub type ReminderId = i64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ReminderKind {
    Medicine,
    Vaccination,
    Appointment,
    Checkup,
    Custom,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RepeatKind {
    Once,
    Daily,
    Weekly,
    Monthly,
    Custom,
}

/// Time of day a reminder fires at, truncated to whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireTime(NaiveTime);

impl FireTime {
    pub fn new(inner: NaiveTime) -> Self {
        let normalized_time = inner.with_nanosecond(0).expect("Will never fail.");
        Self(normalized_time)
    }

    pub fn time(&self) -> &NaiveTime {
        &self.0
    }

    pub fn into_time(self) -> NaiveTime {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Schedule {
    pub times: Vec<FireTime>,
    /// Required non-empty for `RepeatKind::Weekly`; ignored otherwise.
    pub weekdays: Option<HashSet<Weekday>>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub repeat: RepeatKind,
}

#[derive(Debug, Clone)]
pub struct Reminder {
    pub id: ReminderId,
    pub kind: ReminderKind,
    pub title: String,
    pub description: Option<String>,
    pub schedule: Schedule,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_fired_at: Option<DateTime<Utc>>,
}

impl Reminder {
    /// Notification body: the description when present, the title otherwise.
    pub fn message(&self) -> String {
        self.description.clone().unwrap_or_else(|| self.title.clone())
    }
}

/// A computed firing of a reminder within the current scheduling horizon.
/// Never persisted; the index only exists to derive a stable dispatch token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub reminder_id: ReminderId,
    pub index: usize,
    pub at: DateTime<Utc>,
}
