//! # QUADRA Shared
//!
//! Common types used by the ledger, the flight choreographer and the visual
//! surfaces.
//!
//! ## Contents
//!
//! - [`id`]: question identifiers and flight directions
//! - [`color`]: RGBA colors parsed from config strings
//! - [`events`]: animation event payloads
//! - [`bus`]: the animation event bus
//!
//! ## CRITICAL RULE
//!
//! Nothing in this crate knows about geometry or credit accounting.
//! Producers and consumers meet here, and only here.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bus;
pub mod color;
pub mod events;
pub mod id;

pub use bus::{AnimationBus, EventPublisher, Subscription, Topics, DEFAULT_BUS_CAPACITY};
pub use color::{Color, ColorParseError};
pub use events::{AnimEvent, Launch, UnitEvent, UnitKey};
pub use id::{Direction, QuestionId};
