//! Decision Records
//!
//! Per-permission record of past request outcomes: the decision flag, when
//! the permission was last put in front of the user, and how often it has
//! been denied. Records are what the store persists between sessions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Outcome flag of past requests for one permission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionFlag {
    /// The permission was never requested through permflow
    #[default]
    NeverRequested,
    /// The last request was granted
    Granted,
    /// The last request was denied
    Denied,
}

/// Persisted state for one permission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Outcome of the most recent request
    pub flag: DecisionFlag,
    /// When the most recent request was decided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_request: Option<DateTime<Utc>>,
    /// Running count of denials across the install lifetime
    pub deny_count: u32,
}

impl DecisionRecord {
    /// Fold a new platform outcome into the record.
    pub fn apply(&mut self, granted: bool, now: DateTime<Utc>) {
        self.flag = if granted {
            DecisionFlag::Granted
        } else {
            self.deny_count += 1;
            DecisionFlag::Denied
        };
        self.last_request = Some(now);
    }

    /// True when the permission was denied within the back-off window
    /// ending at `now`. Used to avoid pestering the user with a prompt
    /// they just dismissed.
    pub fn denied_within(&self, window: Duration, now: DateTime<Utc>) -> bool {
        if self.flag != DecisionFlag::Denied {
            return false;
        }
        match self.last_request {
            Some(at) => now.signed_duration_since(at) < window,
            None => false,
        }
    }
}
