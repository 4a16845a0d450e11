use serde::{Deserialize, Serialize};
use std::fmt;

/// Document lifecycle states.
///
/// The string forms are an external API contract shared with reporting
/// consumers; they must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Created on upload, never submitted
    Draft,
    /// Submitted, at least one validator still has to decide
    PendingValidation,
    /// In-flight marker for documents actively being worked on
    InProgress,
    /// Paused while a child document is produced and validated
    #[serde(rename = "en_attente_dependance")]
    AwaitingDependency,
    /// Every validator of the current round approved
    Validated,
    /// At least one validator of the current round rejected
    Rejected,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 6] = [
        Self::Draft,
        Self::PendingValidation,
        Self::InProgress,
        Self::AwaitingDependency,
        Self::Validated,
        Self::Rejected,
    ];

    /// Check if this is a terminal state for the current round
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Validated | Self::Rejected)
    }

    /// Check if the document may be (re)submitted for validation
    pub fn can_submit(&self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }

    /// Check if a validator may spawn a dependency from this state
    pub fn can_assign_dependency(&self) -> bool {
        matches!(self, Self::PendingValidation)
    }

    /// Check if the document has an active round that aggregation evaluates
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::PendingValidation | Self::InProgress)
    }

    /// Check if validators may record decisions against the document
    pub fn accepts_decisions(&self) -> bool {
        self.is_in_flight()
    }

    /// Stable string form used in storage and external APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingValidation => "pending_validation",
            Self::InProgress => "in_progress",
            Self::AwaitingDependency => "en_attente_dependance",
            Self::Validated => "validated",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending_validation" => Ok(Self::PendingValidation),
            "in_progress" => Ok(Self::InProgress),
            "en_attente_dependance" => Ok(Self::AwaitingDependency),
            "validated" => Ok(Self::Validated),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Invalid document status: {s}")),
        }
    }
}

/// Validator task states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for the validator's decision
    Pending,
    /// Validator approved the document
    Approved,
    /// Validator rejected the document
    Rejected,
}

impl TaskStatus {
    /// Check if the validator has decided (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

/// Default state for new documents
impl Default for DocumentStatus {
    fn default() -> Self {
        Self::Draft
    }
}

/// Default state for new workflow tasks
impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_status_terminal_check() {
        assert!(DocumentStatus::Validated.is_terminal());
        assert!(DocumentStatus::Rejected.is_terminal());
        assert!(!DocumentStatus::Draft.is_terminal());
        assert!(!DocumentStatus::PendingValidation.is_terminal());
        assert!(!DocumentStatus::InProgress.is_terminal());
        assert!(!DocumentStatus::AwaitingDependency.is_terminal());
    }

    #[test]
    fn test_guard_predicates() {
        assert!(DocumentStatus::Draft.can_submit());
        assert!(DocumentStatus::Rejected.can_submit());
        assert!(!DocumentStatus::Validated.can_submit());
        assert!(!DocumentStatus::PendingValidation.can_submit());
        assert!(!DocumentStatus::AwaitingDependency.can_submit());

        assert!(DocumentStatus::PendingValidation.can_assign_dependency());
        assert!(!DocumentStatus::InProgress.can_assign_dependency());
        assert!(!DocumentStatus::AwaitingDependency.can_assign_dependency());
        assert!(!DocumentStatus::Draft.can_assign_dependency());

        assert!(DocumentStatus::InProgress.accepts_decisions());
        assert!(!DocumentStatus::AwaitingDependency.accepts_decisions());
    }

    #[test]
    fn test_status_strings_are_stable() {
        let expected = [
            "draft",
            "pending_validation",
            "in_progress",
            "en_attente_dependance",
            "validated",
            "rejected",
        ];
        for (status, text) in DocumentStatus::ALL.iter().zip(expected) {
            assert_eq!(status.to_string(), text);
            assert_eq!(text.parse::<DocumentStatus>().unwrap(), *status);
            assert_eq!(
                serde_json::to_string(status).unwrap(),
                format!("\"{text}\"")
            );
        }
        assert!("awaiting_dependency".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn test_task_status_serde() {
        let json = serde_json::to_string(&TaskStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
        let parsed: TaskStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(parsed, TaskStatus::Rejected);
        assert!(TaskStatus::Rejected.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }
}
