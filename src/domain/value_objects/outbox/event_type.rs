use serde::{Deserialize, Serialize};
use std::fmt;

/// Outbox event tag. Rows written by a newer producer keep their tag as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    ActivityLog,
    ProjectUpdate,
    TaskUpdate,
    ClockBatch,
    VehicleTrip,
    AssetRegister,
    DocumentAttach,
    BiometricEnroll,
    Other(String),
}

impl EventType {
    pub const KNOWN: [EventType; 8] = [
        EventType::ActivityLog,
        EventType::ProjectUpdate,
        EventType::TaskUpdate,
        EventType::ClockBatch,
        EventType::VehicleTrip,
        EventType::AssetRegister,
        EventType::DocumentAttach,
        EventType::BiometricEnroll,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            EventType::ActivityLog => "activity-log",
            EventType::ProjectUpdate => "project-update",
            EventType::TaskUpdate => "task-update",
            EventType::ClockBatch => "clock-batch",
            EventType::VehicleTrip => "vehicle-trip",
            EventType::AssetRegister => "asset-register",
            EventType::DocumentAttach => "document-attach",
            EventType::BiometricEnroll => "biometric-enroll",
            EventType::Other(value) => value.as_str(),
        }
    }

    /// Event types whose payload moves workers in or out.
    pub fn is_actor_transition(&self) -> bool {
        matches!(self, EventType::ClockBatch)
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        match value {
            "activity-log" => EventType::ActivityLog,
            "project-update" => EventType::ProjectUpdate,
            "task-update" => EventType::TaskUpdate,
            "clock-batch" => EventType::ClockBatch,
            "vehicle-trip" => EventType::VehicleTrip,
            "asset-register" => EventType::AssetRegister,
            "document-attach" => EventType::DocumentAttach,
            "biometric-enroll" => EventType::BiometricEnroll,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        EventType::from(value.as_str())
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
