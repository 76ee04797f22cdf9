//! # Visual Surfaces
//!
//! State machines for the three rendered parts of the widget. Each surface
//! subscribes to the bus at mount, registers its circles in the element
//! registry and turns ledger snapshots plus in-flight bookkeeping into a view
//! model.
//!
//! ```text
//! ┌────────────┬───────────────────────────────┬────────────────────────┐
//! │ Surface    │ Listens to                    │ Produces               │
//! ├────────────┼───────────────────────────────┼────────────────────────┤
//! │ Pool       │ FlightStart, PoolSettle       │ PoolView (grid fills)  │
//! │ Diamond    │ FlightStart, DiamondSettle    │ DiamondView (levels)   │
//! │ LiquidPool │ everything                    │ LiquidView (blob)      │
//! └────────────┴───────────────────────────────┴────────────────────────┘
//! ```

use std::time::Duration;

use quadra_shared::{AnimEvent, Subscription};

pub mod diamond;
pub mod liquid;
pub mod pool;

pub use diamond::{DiamondConfig, DiamondPointView, DiamondSurface, DiamondView};
pub use liquid::{
    CoreScaleMode, DropView, DryState, LiquidPoolConfig, LiquidPoolSurface, LiquidShape,
    LiquidView, StreamView,
};
pub use pool::{PoolCircleView, PoolConfig, PoolSurface, PoolView};

/// A mounted surface reacting to animation events.
pub trait VisualSurface {
    /// The surface's bus subscription.
    fn subscription(&self) -> &Subscription;

    /// Applies one event.
    fn handle(&mut self, event: &AnimEvent, now: Duration);

    /// Applies every pending event in publish order. Returns how many.
    fn pump(&mut self, now: Duration) -> usize {
        let events = self.subscription().drain();
        for event in &events {
            self.handle(event, now);
        }
        events.len()
    }
}

/// Drops events produced before the latest reset this surface saw.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct EpochGate {
    epoch: u64,
}

impl EpochGate {
    pub(crate) const fn new(epoch: u64) -> Self {
        Self { epoch }
    }

    /// Returns true if the event should be applied. Resets always pass.
    pub(crate) fn admit(&mut self, event: &AnimEvent) -> bool {
        if let AnimEvent::Reset { epoch } = event {
            self.epoch = self.epoch.max(*epoch);
            return true;
        }
        event.epoch() >= self.epoch
    }
}
