//! Errors - エンジンが呼び出し元に返すエラー
//!
//! どのエラーも内部でリトライせず、そのまま呼び出し元に返します。
//! transport 層がステータスコードへの変換を担当します。

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::ids::JobId;
use super::phase::ExecutionPhase;

#[derive(Debug, Error)]
pub enum UwsError {
    /// The id does not resolve to a live record (never existed, deleted, or expired).
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("cannot {action} job {job_id} in phase {from}")]
    InvalidTransition {
        job_id: JobId,
        from: ExecutionPhase,
        action: String,
    },

    #[error("unsupported phase action: {0}")]
    UnsupportedAction(String),

    #[error("destruction time must be in the future (got {0})")]
    InvalidDestructionTime(DateTime<Utc>),

    #[error("validation error: {0}")]
    Validation(String),
}

impl UwsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, UwsError::NotFound(_))
    }
}
