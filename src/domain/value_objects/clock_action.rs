use serde::{Deserialize, Serialize};
use std::fmt;

/// Batch-level tag on a clock event. Only `Out` ends presence; every other tag,
/// including ones this build does not know, leaves the worker counted as in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClockAction {
    In,
    Out,
    Sick,
    Leave,
    Training,
    Other(String),
}

impl ClockAction {
    pub fn as_str(&self) -> &str {
        match self {
            ClockAction::In => "in",
            ClockAction::Out => "out",
            ClockAction::Sick => "sick",
            ClockAction::Leave => "leave",
            ClockAction::Training => "training",
            ClockAction::Other(value) => value.as_str(),
        }
    }

    pub fn is_out(&self) -> bool {
        matches!(self, ClockAction::Out)
    }
}

impl From<&str> for ClockAction {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "in" => ClockAction::In,
            "out" => ClockAction::Out,
            "sick" => ClockAction::Sick,
            "leave" => ClockAction::Leave,
            "training" => ClockAction::Training,
            other => ClockAction::Other(other.to_string()),
        }
    }
}

impl From<String> for ClockAction {
    fn from(value: String) -> Self {
        ClockAction::from(value.as_str())
    }
}

impl From<ClockAction> for String {
    fn from(value: ClockAction) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ClockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tags_loosely() {
        assert_eq!(ClockAction::from("OUT"), ClockAction::Out);
        assert_eq!(ClockAction::from(" in "), ClockAction::In);
        assert_eq!(ClockAction::from("sick"), ClockAction::Sick);
    }

    #[test]
    fn only_out_is_terminal() {
        assert!(ClockAction::Out.is_out());
        assert!(!ClockAction::Leave.is_out());
        assert!(!ClockAction::from("standby").is_out());
    }
}
