use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Delivery state of an outbox row.
///
/// Allowed transitions: `Pending -> Synced`, `Pending -> Failed`, and
/// `Failed -> Pending` through an explicit reset. `Synced` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    pub const ALL: [SyncStatus; 3] = [SyncStatus::Pending, SyncStatus::Synced, SyncStatus::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (SyncStatus::Pending, SyncStatus::Synced)
                | (SyncStatus::Pending, SyncStatus::Failed)
                | (SyncStatus::Failed, SyncStatus::Pending)
        )
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "synced" => Ok(SyncStatus::Synced),
            "failed" => Ok(SyncStatus::Failed),
            other => Err(format!("Unknown sync status: {other}")),
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finer-grained acknowledgement reported by the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStage {
    Received,
    Applied,
}

impl ServerStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStage::Received => "received",
            ServerStage::Applied => "applied",
        }
    }
}

impl FromStr for ServerStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "received" => Ok(ServerStage::Received),
            "applied" => Ok(ServerStage::Applied),
            other => Err(format!("Unknown server stage: {other}")),
        }
    }
}

impl fmt::Display for ServerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synced_is_terminal() {
        for next in SyncStatus::ALL {
            assert!(!SyncStatus::Synced.can_transition_to(next));
        }
        assert!(SyncStatus::Pending.can_transition_to(SyncStatus::Failed));
        assert!(SyncStatus::Failed.can_transition_to(SyncStatus::Pending));
        assert!(!SyncStatus::Failed.can_transition_to(SyncStatus::Synced));
    }

    #[test]
    fn server_stage_parse_is_case_insensitive() {
        assert_eq!("Applied".parse::<ServerStage>(), Ok(ServerStage::Applied));
        assert_eq!(" received ".parse::<ServerStage>(), Ok(ServerStage::Received));
        assert!("queued".parse::<ServerStage>().is_err());
    }
}
