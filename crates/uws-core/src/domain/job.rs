//! Job record and its parts (parameters, results, error summary).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::UwsError;
use super::ids::JobId;
use super::phase::ExecutionPhase;

/// UWS version every record and listing reports.
pub const UWS_VERSION: &str = "1.1";

/// A parameter of a job, unique by `id` within the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// `value` is a URL to fetch the actual value from.
    #[serde(default)]
    pub by_reference: bool,
}

impl Parameter {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: Some(value.into()),
            by_reference: false,
        }
    }

    pub fn by_reference(id: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: Some(href.into()),
            by_reference: true,
        }
    }
}

/// Reject empty or duplicate parameter ids.
pub fn validate_parameters(parameters: &[Parameter]) -> Result<(), UwsError> {
    let mut seen = HashSet::with_capacity(parameters.len());
    for parameter in parameters {
        if parameter.id.trim().is_empty() {
            return Err(UwsError::Validation("parameter id must not be empty".into()));
        }
        if !seen.insert(parameter.id.as_str()) {
            return Err(UwsError::Validation(format!(
                "duplicate parameter id '{}'",
                parameter.id
            )));
        }
    }
    Ok(())
}

/// A reference to a result produced by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultReference {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ResultReference {
    pub fn new(id: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: Some(href.into()),
            mime_type: None,
            size: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Transient,
    Fatal,
}

/// Short summary of why a job ended in ERROR (or ABORTED with detail).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSummary {
    #[serde(rename = "type")]
    pub error_type: ErrorType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default)]
    pub has_detail: bool,
}

impl ErrorSummary {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Fatal,
            message: Some(message.into()),
            has_detail: false,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Transient,
            message: Some(message.into()),
            has_detail: false,
        }
    }
}

/// Job record: the full state of one job.
///
/// Design:
/// - The store owns these; callers get clones.
/// - Phase changes go through `transition_to` (never a direct field write from the engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: JobId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    pub phase: ExecutionPhase,

    /// When the job is likely to complete (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<DateTime<Utc>>,

    pub creation_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Requested maximum runtime in seconds. 0 means unlimited.
    #[serde(default)]
    pub execution_duration: u64,

    pub destruction_time: DateTime<Utc>,

    #[serde(default)]
    pub parameters: Vec<Parameter>,

    #[serde(default)]
    pub results: Vec<ResultReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<ErrorSummary>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub job_info: Vec<String>,

    pub version: String,
}

impl JobRecord {
    pub fn new(
        job_id: JobId,
        parameters: Vec<Parameter>,
        owner_id: Option<String>,
        run_id: Option<String>,
        creation_time: DateTime<Utc>,
        destruction_time: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id,
            run_id,
            owner_id,
            phase: ExecutionPhase::Pending,
            quote: None,
            creation_time,
            start_time: None,
            end_time: None,
            execution_duration: 0,
            destruction_time,
            parameters,
            results: Vec::new(),
            error_summary: None,
            job_info: Vec::new(),
            version: UWS_VERSION.to_string(),
        }
    }

    /// `destruction_time` has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.destruction_time < now
    }

    /// Move to `next` if the state machine allows it.
    ///
    /// Entering EXECUTING stamps `start_time`, entering a terminal phase stamps `end_time`.
    pub fn transition_to(&mut self, next: ExecutionPhase, now: DateTime<Utc>) -> Result<(), UwsError> {
        if !self.phase.can_transition_to(next) {
            return Err(UwsError::InvalidTransition {
                job_id: self.job_id,
                from: self.phase,
                action: format!("move to {next}"),
            });
        }
        self.phase = next;
        if next == ExecutionPhase::Executing {
            self.start_time = Some(now);
        }
        if next.is_terminal() {
            self.end_time = Some(now);
        }
        Ok(())
    }

    pub fn short_description(&self) -> ShortJobDescription {
        ShortJobDescription {
            job_id: self.job_id,
            run_id: self.run_id.clone(),
            owner_id: self.owner_id.clone(),
            phase: self.phase,
            creation_time: self.creation_time,
        }
    }
}

/// Listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortJobDescription {
    pub job_id: JobId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    pub phase: ExecutionPhase,
    pub creation_time: DateTime<Utc>,
}

/// Result of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobList {
    pub jobref: Vec<ShortJobDescription>,
    pub version: String,
}

impl JobList {
    pub fn new(jobref: Vec<ShortJobDescription>) -> Self {
        Self {
            jobref,
            version: UWS_VERSION.to_string(),
        }
    }

    pub fn job_ids(&self) -> Vec<JobId> {
        self.jobref.iter().map(|job| job.job_id).collect()
    }
}
