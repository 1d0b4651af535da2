use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::delivery::NotificationConfig;

#[derive(Deserialize, Debug, Clone)]
pub struct SchedulingSettings {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: i64,
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NotificationSettings {
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default = "default_vibration")]
    pub vibration: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    #[serde(default)]
    pub scheduling: SchedulingSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl AppSettings {
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            snooze_minutes: default_snooze_minutes(),
            timezone: default_timezone(),
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            sound: None,
            vibration: default_vibration(),
        }
    }
}

impl From<NotificationSettings> for NotificationConfig {
    fn from(settings: NotificationSettings) -> Self {
        Self {
            sound: settings.sound,
            vibration: settings.vibration,
        }
    }
}

fn default_horizon_days() -> u32 {
    7
}

fn default_snooze_minutes() -> i64 {
    10
}

fn default_timezone() -> Tz {
    Tz::UTC
}

fn default_vibration() -> bool {
    true
}
