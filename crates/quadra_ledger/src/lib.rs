//! # QUADRA Ledger
//!
//! Credit accounting for quadratic voting.
//!
//! ## Design Principles
//!
//! 1. **Quadratic cost** - `n` votes on one question cost `n²` credits
//! 2. **Invariant after every mutation** - `available = credits - Σ vote²`
//! 3. **Silent admission** - a vote that would overspend is a no-op, not an error
//! 4. **Derived flags** - `up`/`down` disabled state is recomputed, never set
//!
//! ## Example
//!
//! ```rust
//! use quadra_ledger::{Ledger, Question};
//! use quadra_shared::QuestionId;
//!
//! let mut ledger = Ledger::new(100, vec![
//!     Question::new(0, "Fund the new tram line?"),
//!     Question::new(1, "Raise the minimum wage?"),
//! ])?;
//!
//! ledger.vote(&QuestionId::Int(0), 3);
//! assert_eq!(ledger.available_credits(), 91);
//! # Ok::<(), quadra_ledger::LedgerError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod question;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use ledger::{
    launch_for, Decline, Ledger, LedgerSnapshot, VoteOutcome, MAX_CREDITS, MIN_CREDITS,
};
pub use question::{quadratic_cost, Question};
