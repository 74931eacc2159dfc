use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::logging::redact::now_iso;

/// Execution state machine: `Pending -> Submitted -> {Confirmed | Failed}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Pending => "pending",
            Status::Submitted => "submitted",
            Status::Confirmed => "confirmed",
            Status::Failed => "failed",
        })
    }
}

/// Journal entry for one action. `result` is present only when confirmed and
/// `error` only when failed; the constructors are the only way to build one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_id: Option<String>,
    attempts: u32,
    updated_at: String,
}

impl ExecutionRecord {
    fn base(status: Status, attempts: u32) -> Self {
        Self {
            status,
            result: None,
            tx_hash: None,
            error: None,
            error_id: None,
            attempts,
            updated_at: now_iso(),
        }
    }

    #[must_use]
    pub fn pending() -> Self {
        Self::base(Status::Pending, 0)
    }

    #[must_use]
    pub fn submitted(attempts: u32) -> Self {
        Self::base(Status::Submitted, attempts)
    }

    #[must_use]
    pub fn confirmed(result: Vec<Value>, tx_hash: Option<String>, attempts: u32) -> Self {
        Self {
            result: Some(result),
            tx_hash,
            ..Self::base(Status::Confirmed, attempts)
        }
    }

    pub fn failed(error: impl Into<String>, error_id: &str, attempts: u32) -> Self {
        Self {
            error: Some(error.into()),
            error_id: Some(error_id.to_string()),
            ..Self::base(Status::Failed, attempts)
        }
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self.status, Status::Confirmed)
    }

    #[must_use]
    pub fn result(&self) -> Option<&[Value]> {
        self.result.as_deref()
    }

    #[must_use]
    pub fn tx_hash(&self) -> Option<&str> {
        self.tx_hash.as_deref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn error_id(&self) -> Option<&str> {
        self.error_id.as_deref()
    }

    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn updated_at(&self) -> &str {
        &self.updated_at
    }
}
