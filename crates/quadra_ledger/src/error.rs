//! # Ledger Error Types
//!
//! Configuration errors raised while building or re-budgeting a ledger.
//! Declined votes are not errors; see [`crate::Decline`].

use quadra_shared::QuestionId;
use thiserror::Error;

/// Errors that can occur while configuring a ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Budget below the minimum.
    #[error("credits must be at least {min}, got {credits}")]
    CreditsTooLow {
        /// Requested budget.
        credits: u32,
        /// Smallest accepted budget.
        min: u32,
    },

    /// Budget above the maximum.
    #[error("credits must be at most {max}, got {credits}")]
    CreditsTooHigh {
        /// Requested budget.
        credits: u32,
        /// Largest accepted budget.
        max: u32,
    },

    /// Two questions share an identifier.
    #[error("duplicate question id: {0}")]
    DuplicateQuestion(QuestionId),

    /// Existing votes already cost more than the budget.
    #[error("votes cost {cost} credits but the budget is {credits}")]
    OverAllocated {
        /// Quadratic cost of the votes.
        cost: u64,
        /// Budget.
        credits: u32,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
