//! # Session Errors

use quadra_ledger::LedgerError;
use thiserror::Error;

/// Errors raised by the session provider.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Ledger access outside a mounted session.
    #[error("no voting session is mounted")]
    NotMounted,

    /// The ledger rejected the configuration.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Malformed session configuration.
    #[error("invalid session config: {0}")]
    Config(String),

    /// Config file could not be read.
    #[error("failed to read session config: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
