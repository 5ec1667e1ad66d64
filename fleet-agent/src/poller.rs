//! Poll cycle state: connection status, last update, last error, change tracking.

use crate::client::ClientError;
use crate::tracker::{ChangeTracker, Observation};
use chrono::{DateTime, Utc};
use fleet_sim::DataCenter;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Online,
    Offline,
    /// A fetch is in flight; further cycles are skipped until it settles.
    Reconnecting,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionStatus::Online => "online",
            ConnectionStatus::Offline => "offline",
            ConnectionStatus::Reconnecting => "reconnecting",
        })
    }
}

#[derive(Debug)]
pub struct PollState {
    status: ConnectionStatus,
    last_update: Option<DateTime<Utc>>,
    last_error: Option<String>,
    tracker: ChangeTracker,
}

impl Default for PollState {
    fn default() -> Self {
        Self { status: ConnectionStatus::Offline, last_update: None, last_error: None, tracker: ChangeTracker::default() }
    }
}

impl PollState {
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Marks a fetch as in flight. Returns `false` when one already is.
    pub fn begin_cycle(&mut self) -> bool {
        if self.status == ConnectionStatus::Reconnecting {
            return false;
        }
        self.status = ConnectionStatus::Reconnecting;
        true
    }

    /// Settles the in-flight fetch.
    pub fn finish_cycle(
        &mut self,
        result: Result<Vec<DataCenter>, ClientError>,
        now: DateTime<Utc>,
    ) -> Option<Observation> {
        match result {
            Ok(data_centers) => {
                self.status = ConnectionStatus::Online;
                self.last_update = Some(now);
                self.last_error = None;
                Some(self.tracker.observe(data_centers))
            }
            Err(e) => {
                self.status = ConnectionStatus::Offline;
                self.last_error = Some(e.to_string());
                None
            }
        }
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }
}
