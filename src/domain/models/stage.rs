use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Collect,
    Extract,
    Convert,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::Collect, StageKind::Extract, StageKind::Convert];

    pub fn verb(&self) -> &'static str {
        match self {
            StageKind::Collect => "collect",
            StageKind::Extract => "extract",
            StageKind::Convert => "convert",
        }
    }

    pub fn parse(verb: &str) -> Result<Self, DomainError> {
        match verb.to_ascii_lowercase().as_str() {
            "collect" => Ok(StageKind::Collect),
            "extract" => Ok(StageKind::Extract),
            "convert" => Ok(StageKind::Convert),
            other => Err(DomainError::invalid_input(format!(
                "unknown stage '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.verb())
    }
}

/// What a run does when `fetch` or `process` fails.
///
/// Both policies leave the ledger entry without a completion stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return the failure to the caller.
    #[default]
    Propagate,
    /// Log the failure and report the run as failed.
    LogAndReturn,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Propagate => "propagate",
            FailurePolicy::LogAndReturn => "log-and-return",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "propagate" => Ok(FailurePolicy::Propagate),
            "log-and-return" | "log" => Ok(FailurePolicy::LogAndReturn),
            other => Err(DomainError::config(format!(
                "unknown failure policy '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed(String),
    Cancelled,
}

/// Summary of one runner execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub ledger_id: i64,
    pub task_name: String,
    pub items: u64,
    pub checkpoints: u64,
    pub status: RunStatus,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_parse_roundtrip() {
        for stage in StageKind::ALL {
            assert_eq!(StageKind::parse(stage.verb()).unwrap(), stage);
        }
        assert!(StageKind::parse("enrich").is_err());
    }

    #[test]
    fn test_failure_policy_parse() {
        assert_eq!(
            FailurePolicy::parse("log_and_return").unwrap(),
            FailurePolicy::LogAndReturn
        );
        assert_eq!(FailurePolicy::parse("propagate").unwrap(), FailurePolicy::Propagate);
        assert!(FailurePolicy::parse("retry").unwrap_err().is_config_error());
    }
}
