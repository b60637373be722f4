use std::path::PathBuf;

use thiserror::Error;

use crate::record::RunId;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger write failed for run {run_id}: {message}")]
    WriteFailed { run_id: RunId, message: String },

    #[error("ledger read failed: {0}")]
    ReadFailed(String),

    #[error("corrupt ledger entry at {}:{line}: {message}", path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
