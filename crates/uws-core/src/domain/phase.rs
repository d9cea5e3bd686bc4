//! Phase - ジョブの実行フェーズと状態遷移

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::UwsError;

/// Execution phase of a job.
///
/// State transitions:
/// - Pending -> Queued | Executing | Held | Aborted
/// - Queued -> Executing | Aborted
/// - Held -> Executing | Aborted
/// - Executing -> Completed | Error | Aborted
/// - any non-terminal -> Archived (expiry path only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionPhase {
    /// Accepted, not yet committed for execution.
    Pending,

    /// Committed for execution, waiting for the executor.
    Queued,

    Executing,

    /// Held by the service, needs a RUN to continue.
    Held,

    Completed,
    Error,
    Aborted,

    /// Kept for reference only; hidden from listings unless asked for.
    Archived,
}

impl ExecutionPhase {
    pub const ALL: [ExecutionPhase; 8] = [
        ExecutionPhase::Pending,
        ExecutionPhase::Queued,
        ExecutionPhase::Executing,
        ExecutionPhase::Held,
        ExecutionPhase::Completed,
        ExecutionPhase::Error,
        ExecutionPhase::Aborted,
        ExecutionPhase::Archived,
    ];

    /// Is this a terminal phase (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionPhase::Completed
                | ExecutionPhase::Error
                | ExecutionPhase::Aborted
                | ExecutionPhase::Archived
        )
    }

    /// Phases a long-poll is allowed to wait on.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ExecutionPhase::Pending | ExecutionPhase::Queued | ExecutionPhase::Executing
        )
    }

    /// Whether the state machine allows `self -> next`.
    pub fn can_transition_to(self, next: ExecutionPhase) -> bool {
        use ExecutionPhase::*;

        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Archived) | (_, Aborted) => true,
            (Pending, Queued | Executing | Held) => true,
            (Queued, Executing) => true,
            (Held, Executing) => true,
            (Executing, Completed | Error) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionPhase::Pending => "PENDING",
            ExecutionPhase::Queued => "QUEUED",
            ExecutionPhase::Executing => "EXECUTING",
            ExecutionPhase::Held => "HELD",
            ExecutionPhase::Completed => "COMPLETED",
            ExecutionPhase::Error => "ERROR",
            ExecutionPhase::Aborted => "ABORTED",
            ExecutionPhase::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionPhase {
    type Err = UwsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == upper)
            .ok_or_else(|| UwsError::Validation(format!("unknown phase '{s}'")))
    }
}

/// Action a client may request against a job's phase.
///
/// `Suspend` と `Archive` は UWS の語彙として受け付けるが、エンジンは未対応
/// （`UnsupportedAction` を返す）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseAction {
    Run,
    Abort,
    Suspend,
    Archive,
}

impl PhaseAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseAction::Run => "RUN",
            PhaseAction::Abort => "ABORT",
            PhaseAction::Suspend => "SUSPEND",
            PhaseAction::Archive => "ARCHIVE",
        }
    }
}

impl fmt::Display for PhaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseAction {
    type Err = UwsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RUN" => Ok(PhaseAction::Run),
            "ABORT" => Ok(PhaseAction::Abort),
            "SUSPEND" => Ok(PhaseAction::Suspend),
            "ARCHIVE" => Ok(PhaseAction::Archive),
            _ => Err(UwsError::UnsupportedAction(s.to_string())),
        }
    }
}
