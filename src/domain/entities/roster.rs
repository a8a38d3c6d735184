use crate::domain::value_objects::ClockAction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntry {
    pub worker_id: String,
    pub action: ClockAction,
    pub since: DateTime<Utc>,
}

/// Workers currently counted as present, sorted by worker id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roster {
    pub entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn contains(&self, worker_id: &str) -> bool {
        self.entries.iter().any(|entry| entry.worker_id == worker_id)
    }

    pub fn worker_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.worker_id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
