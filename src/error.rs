use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Coarse classification of a [`LedgerError`], used by callers to decide how to react.
///
/// Nothing in the ledger retries on its own; `Integrity` is the only kind a caller may retry,
/// and only with an idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    PolicyViolation,
    Integrity,
    Internal,
}

/// One item that made an all-or-nothing batch fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRejection {
    pub line_item_id: String,
    pub reason: String,
}

impl fmt::Display for ItemRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.line_item_id, self.reason)
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    #[diagnostic(code(ledger::validation))]
    ValidationError(String),

    #[error("{entity} not found: {id}")]
    #[diagnostic(code(ledger::not_found))]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    #[diagnostic(code(ledger::conflict))]
    Conflict(String),

    #[error("Batch rejected, {} invalid item(s): {}", .0.len(), join_rejections(.0))]
    #[diagnostic(code(ledger::batch_rejected))]
    BatchRejected(Vec<ItemRejection>),

    #[error("Policy violation: {0}")]
    #[diagnostic(code(ledger::policy))]
    PolicyViolation(String),

    #[error("Integrity fault: {0}")]
    #[diagnostic(
        code(ledger::integrity),
        help("retry with the same idempotency key")
    )]
    IntegrityFault(String),

    #[error("CSV error: {0}")]
    #[diagnostic(code(ledger::csv))]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    #[diagnostic(code(ledger::json))]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(ledger::io))]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(ledger::internal))]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

fn join_rejections(rejections: &[ItemRejection]) -> String {
    rejections
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError(_) | Self::CsvError(_) | Self::JsonError(_) => {
                ErrorKind::Validation
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) | Self::BatchRejected(_) => ErrorKind::Conflict,
            Self::PolicyViolation(_) => ErrorKind::PolicyViolation,
            Self::IntegrityFault(_) => ErrorKind::Integrity,
            Self::IoError(_) | Self::InternalError(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(e: rocksdb::Error) -> Self {
        Self::InternalError(Box::new(e))
    }
}
