//! # Animation Events
//!
//! Payloads carried by the [`AnimationBus`](crate::bus::AnimationBus).
//!
//! ```text
//! ┌─────────────┐  Launch   ┌───────────────┐  FlightStart / *Settle / FlightEnd
//! │   Ledger    │──────────>│ Choreographer │──────────────────────────────┐
//! └─────────────┘           └───────────────┘                              │
//!        │ Reset                                                           ▼
//!        └──────────────────────────────────────────────────────> Visual Surfaces
//! ```
//!
//! Every event carries the ledger epoch it was produced under. A reset bumps
//! the epoch, so consumers can ignore effects scheduled before it.

use crate::color::Color;
use crate::id::{Direction, QuestionId};

/// A committed vote that moved credits across an absolute level boundary.
///
/// Emitted by: the ledger, once per qualifying vote.
/// Consumed by: the choreographer (flights), the liquid pool (display lock).
#[derive(Clone, Debug, PartialEq)]
pub struct Launch {
    /// Which way the credits travel.
    pub direction: Direction,
    /// First pool slot involved. For `ToDiamond` this is the cost used before
    /// the vote, for `ToPool` the cost used after it.
    pub pool_start_index: u32,
    /// Question whose diamond sends or receives the credits.
    pub target: QuestionId,
    /// Diamond level reached (`ToDiamond`) or vacated (`ToPool`), 1-based.
    pub level: u32,
    /// Number of credit units moved (the literal cost delta).
    pub count: u32,
    /// Override color for the flights.
    pub color: Option<Color>,
    /// Ledger epoch at emission time.
    pub epoch: u64,
}

/// Per-unit lifecycle payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnitEvent {
    /// Which way the unit travels.
    pub direction: Direction,
    /// Question whose diamond is involved.
    pub target: QuestionId,
    /// Diamond level, 1-based.
    pub level: u32,
    /// Index of the diamond point within its level.
    pub unit_index: u32,
    /// Pool slot the unit leaves or lands in.
    pub pool_index: u32,
    /// Ledger epoch of the originating launch.
    pub epoch: u64,
}

/// Bookkeeping key for a unit: `(direction, target, level, unit_index)`.
pub type UnitKey = (Direction, QuestionId, u32, u32);

impl UnitEvent {
    /// Returns the key consumers should index in-flight state by.
    #[must_use]
    pub fn key(&self) -> UnitKey {
        (self.direction, self.target.clone(), self.level, self.unit_index)
    }
}

/// Events carried by the animation bus.
#[derive(Clone, Debug, PartialEq)]
pub enum AnimEvent {
    /// Ledger committed a level-changing vote.
    Launch(Launch),
    /// A unit's flight was scheduled.
    FlightStart(UnitEvent),
    /// The pool side of a unit settled (departure cleared or arrival landed).
    PoolSettle(UnitEvent),
    /// The diamond side of a unit settled (departure cleared or arrival landed).
    DiamondSettle(UnitEvent),
    /// A unit's flight window elapsed.
    FlightEnd(UnitEvent),
    /// The ledger was reset.
    Reset {
        /// Epoch that starts with this reset.
        epoch: u64,
    },
}

impl AnimEvent {
    /// Returns the stable string key of this event kind.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Launch(_) => "qv:launch-animation",
            Self::FlightStart(_) => "qv:anim",
            Self::PoolSettle(_) => "qv:anim-pool",
            Self::DiamondSettle(_) => "qv:anim-diamond",
            Self::FlightEnd(_) => "qv:anim-end",
            Self::Reset { .. } => "qv:reset",
        }
    }

    /// Returns the epoch the event was produced under.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        match self {
            Self::Launch(launch) => launch.epoch,
            Self::FlightStart(unit)
            | Self::PoolSettle(unit)
            | Self::DiamondSettle(unit)
            | Self::FlightEnd(unit) => unit.epoch,
            Self::Reset { epoch } => *epoch,
        }
    }

    /// Returns the unit payload for per-unit events.
    #[must_use]
    pub fn unit(&self) -> Option<&UnitEvent> {
        match self {
            Self::FlightStart(unit)
            | Self::PoolSettle(unit)
            | Self::DiamondSettle(unit)
            | Self::FlightEnd(unit) => Some(unit),
            Self::Launch(_) | Self::Reset { .. } => None,
        }
    }
}
