//! # QUADRA UI
//!
//! Headless state for the quadratic voting widget: where every credit circle
//! sits, how credits fly between the pool and the diamonds, and what each
//! surface should look like on the next frame.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        FRAME PIPELINE                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  Bus Events → Choreographer.tick → Surfaces.pump → View Models   │
//! │       ↓               ↓                  ↓              ↓        │
//! │   Launch/Reset   Flights + Timers   Arriving/Departing  Renderer │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Surfaces register their screen-space geometry in the
//! [`ElementRegistry`]; the [`Choreographer`] resolves flight endpoints
//! through it instead of searching a scene graph.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod animation;
pub mod choreographer;
pub mod geometry;
pub mod registry;
pub mod surface;

pub use animation::{Easing, Tween};
pub use choreographer::{Choreographer, ChoreographyConfig, Flight, FlightSprite};
pub use geometry::{bounding_viewport, diamond_layout, pool_grid, Circle, DiamondPoint, Rect};
pub use registry::{ElementHandle, ElementKey, ElementRegistry, Registration};
pub use surface::{
    CoreScaleMode, DiamondConfig, DiamondSurface, DiamondView, DryState, LiquidPoolConfig,
    LiquidPoolSurface, LiquidShape, LiquidView, PoolConfig, PoolSurface, PoolView, VisualSurface,
};
