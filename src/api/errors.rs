use thiserror::Error;

use crate::journal::JournalError;
use crate::types::errors::ConstructionError;

pub mod map;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("plan construction failed: {0}")]
    Construction(#[from] ConstructionError),
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
    #[error("no ledger configured for a commit run")]
    LedgerMissing,
    #[error("journal belongs to campaign `{journal}`, plan is `{plan}`")]
    CampaignMismatch { journal: String, plan: String },
}

impl ApiError {
    /// Stable identifier for this error.
    #[must_use]
    pub const fn id(&self) -> ErrorId {
        match self {
            ApiError::Construction(_) => ErrorId::E_CONSTRUCTION,
            ApiError::Journal(_) | ApiError::CampaignMismatch { .. } => ErrorId::E_JOURNAL,
            ApiError::LedgerMissing => ErrorId::E_GENERIC,
        }
    }

    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        exit_code_for(self.id())
    }
}

// Stable identifiers; SCREAMING_SNAKE_CASE matches the emitted ids.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorId {
    E_CONSTRUCTION,
    E_SUPPLY_MISMATCH,
    E_LOCKING,
    E_REJECTED,
    E_TRANSIENT,
    E_UNRESOLVED,
    E_JOURNAL,
    E_IN_DOUBT,
    E_VERIFY,
    E_GENERIC,
}

#[must_use]
pub const fn id_str(id: ErrorId) -> &'static str {
    match id {
        ErrorId::E_CONSTRUCTION => "E_CONSTRUCTION",
        ErrorId::E_SUPPLY_MISMATCH => "E_SUPPLY_MISMATCH",
        ErrorId::E_LOCKING => "E_LOCKING",
        ErrorId::E_REJECTED => "E_REJECTED",
        ErrorId::E_TRANSIENT => "E_TRANSIENT",
        ErrorId::E_UNRESOLVED => "E_UNRESOLVED",
        ErrorId::E_JOURNAL => "E_JOURNAL",
        ErrorId::E_IN_DOUBT => "E_IN_DOUBT",
        ErrorId::E_VERIFY => "E_VERIFY",
        ErrorId::E_GENERIC => "E_GENERIC",
    }
}

#[must_use]
pub const fn exit_code_for(id: ErrorId) -> i32 {
    match id {
        ErrorId::E_CONSTRUCTION => 10,
        ErrorId::E_SUPPLY_MISMATCH => 20,
        ErrorId::E_LOCKING => 30,
        ErrorId::E_REJECTED => 40,
        ErrorId::E_TRANSIENT => 50,
        ErrorId::E_UNRESOLVED => 60,
        ErrorId::E_JOURNAL => 70,
        ErrorId::E_IN_DOUBT => 80,
        ErrorId::E_VERIFY => 90,
        ErrorId::E_GENERIC => 1,
    }
}

#[must_use]
pub fn exit_code_for_id_str(s: &str) -> Option<i32> {
    match s {
        "E_CONSTRUCTION" => Some(10),
        "E_SUPPLY_MISMATCH" => Some(20),
        "E_LOCKING" => Some(30),
        "E_REJECTED" => Some(40),
        "E_TRANSIENT" => Some(50),
        "E_UNRESOLVED" => Some(60),
        "E_JOURNAL" => Some(70),
        "E_IN_DOUBT" => Some(80),
        "E_VERIFY" => Some(90),
        "E_GENERIC" => Some(1),
        _ => None,
    }
}
