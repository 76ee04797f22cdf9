//! # QUADRA
//!
//! A headless quadratic-voting widget engine: the credit ledger, the flight
//! choreography between the credit pool and the vote diamonds, and the state
//! of every visual surface, exposed as view models a renderer can draw.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             VoteProvider                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐  Launch   ┌─────────────────┐  FlightStart/Settle  │
//! │  │  Ledger         │──────────>│  Choreographer  │──────────┐           │
//! │  │  • Σ vote² ≤ b  │  Reset    │  • stagger      │          │           │
//! │  │  • flags        │──────┐    │  • timers       │          v           │
//! │  └─────────────────┘      │    └────────┬────────┘   ┌──────────────┐   │
//! │                           │             │ resolve    │  Surfaces    │   │
//! │                           │    ┌────────v────────┐   │  • pool      │   │
//! │                           └───>│ AnimationBus    │──>│  • diamond   │   │
//! │                                └─────────────────┘   │  • liquid    │   │
//! │                                ┌─────────────────┐   └──────┬───────┘   │
//! │                                │ ElementRegistry │<─────────┘ register  │
//! │                                └─────────────────┘                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `provider`: session lifetime and the ledger/bus/registry handles
//! - `config`: TOML session setup
//! - `frame`: per-frame statistics

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod frame;
pub mod provider;

// Re-export the units
pub use quadra_ledger as ledger;
pub use quadra_shared as shared;
pub use quadra_ui as ui;

pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use frame::{FrameStats, FrameStatsAccumulator, TARGET_FRAME_TIME};
pub use provider::VoteProvider;
