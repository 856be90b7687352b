//! Unified application error type.
//! All modules (core, ledger, report, cli) return AppError to keep the error
//! handling consistent; the remote and auth layers have their own enums that
//! fold into it.

use std::io;
use thiserror::Error;

use crate::auth::AuthError;
use crate::remote::RemoteError;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // Session lifecycle
    // ---------------------------
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    State(String),

    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ledger error at line {line}: {reason}")]
    Ledger { line: u64, reason: String },

    // ---------------------------
    // Identity / remote
    // ---------------------------
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    // ---------------------------
    // Parsing errors
    // ---------------------------
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // ---------------------------
    // Report errors
    // ---------------------------
    #[error("No time log found to generate summary")]
    EmptyLedger,

    #[error("Export error: {0}")]
    Export(String),
}

pub type AppResult<T> = Result<T, AppError>;
