use crate::domain::value_objects::EventType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub synced: u64,
    pub failed: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.synced + self.failed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeCount {
    pub event_type: EventType,
    pub count: u64,
}

/// Outcome of one synchronization run. `applied` is the subset of `synced`
/// the remote side confirmed as processed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncSummary {
    pub synced: u32,
    pub applied: u32,
    pub failed: u32,
}

impl SyncSummary {
    pub fn attempted(&self) -> u32 {
        self.synced + self.failed
    }

    pub fn is_empty(&self) -> bool {
        self.attempted() == 0
    }
}
