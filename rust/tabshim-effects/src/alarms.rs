//! Named alarms.
//!
//! ```text
//! Alarms
//!   ├── GetAlarm { name }              → Result<Option<Alarm>, HostError>
//!   ├── CreateAlarm { name, schedule } → Result<(), HostError>
//!   └── ListAlarms                     → Result<Vec<Alarm>, HostError>
//! ```
//!
//! Creating an alarm under a name that is already taken replaces it, which
//! also restarts its countdown.

use serde::{Deserialize, Serialize};

use crate::{Effect, HostError};

/// When an alarm fires, as accepted by `chrome.alarms.create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AlarmSchedule {
    /// Absolute fire time, in milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<f64>,
    /// Relative fire time, in minutes from now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_in_minutes: Option<f64>,
    /// Repeat interval, in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_in_minutes: Option<f64>,
}

impl AlarmSchedule {
    /// Fire once, `minutes` from now.
    pub fn after(minutes: f64) -> Self {
        Self {
            delay_in_minutes: Some(minutes),
            ..Default::default()
        }
    }

    /// Fire every `minutes`, starting `minutes` from now.
    pub fn every(minutes: f64) -> Self {
        Self {
            delay_in_minutes: Some(minutes),
            period_in_minutes: Some(minutes),
            ..Default::default()
        }
    }

    /// The alarm the host registers for this schedule when created at `now`
    /// (milliseconds since the epoch).
    pub fn alarm(&self, name: impl Into<String>, now: f64) -> Alarm {
        let scheduled_time = self.when.unwrap_or_else(|| {
            let delay = self
                .delay_in_minutes
                .or(self.period_in_minutes)
                .unwrap_or_default();
            now + delay * 60_000.0
        });
        Alarm {
            name: name.into(),
            scheduled_time,
            period_in_minutes: self.period_in_minutes,
        }
    }
}

/// A registered alarm, as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    /// The alarm's name.
    pub name: String,
    /// Next fire time, in milliseconds since the epoch.
    pub scheduled_time: f64,
    /// Repeat interval, if the alarm repeats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_in_minutes: Option<f64>,
}

/// `chrome.alarms.get`
#[derive(Debug, Clone, PartialEq)]
pub struct GetAlarm {
    #[allow(missing_docs)]
    pub name: String,
}

impl Effect for GetAlarm {
    type Output = Result<Option<Alarm>, HostError>;
}

/// `chrome.alarms.create`
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAlarm {
    #[allow(missing_docs)]
    pub name: String,
    #[allow(missing_docs)]
    pub schedule: AlarmSchedule,
}

impl Effect for CreateAlarm {
    type Output = Result<(), HostError>;
}

/// `chrome.alarms.getAll`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListAlarms;

impl Effect for ListAlarms {
    type Output = Result<Vec<Alarm>, HostError>;
}
