//! # Flight Choreographer
//!
//! Turns ledger launches into per-unit flights and the settle events the
//! surfaces react to.
//!
//! ## Timeline of one unit `i`
//!
//! ```text
//! t = 0                  FlightStart            (published during tick)
//! t = 150 + 60·i         departure-side settle  (PoolSettle | DiamondSettle)
//! t = 650 + 60·i         arrival-side settle    (DiamondSettle | PoolSettle)
//! t = 650 + 60·i         FlightEnd
//! ```
//!
//! Nothing blocks: each due event is published by the first
//! [`Choreographer::tick`] whose clock has passed it. Timers are never
//! cancelled; every event carries the epoch of its launch so consumers can
//! drop effects from before a reset.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use quadra_shared::{
    AnimEvent, AnimationBus, Color, Direction, EventPublisher, Launch, QuestionId, Subscription,
    Topics, UnitEvent,
};
use serde::{Deserialize, Serialize};

use crate::animation::{flight_opacity, flight_scale, window_progress, Easing};
use crate::geometry::Circle;
use crate::registry::{ElementKey, ElementRegistry};

/// Radius used when neither endpoint of a flight can be resolved.
const FALLBACK_RADIUS: f32 = 4.0;

/// Flight timing and colour defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreographyConfig {
    /// Length of one unit's flight.
    pub flight_duration_ms: u64,
    /// Delay between consecutive units of one launch.
    pub stagger_ms: u64,
    /// When the departure side clears, relative to the unit's start.
    pub early_settle_ms: u64,
    /// Flight colour when neither the launch nor the pool supplies one.
    pub default_color: Color,
}

impl Default for ChoreographyConfig {
    fn default() -> Self {
        Self {
            flight_duration_ms: 650,
            stagger_ms: 60,
            early_settle_ms: 150,
            default_color: Color::BLACK,
        }
    }
}

impl ChoreographyConfig {
    /// Flight length.
    #[must_use]
    pub const fn flight_duration(&self) -> Duration {
        Duration::from_millis(self.flight_duration_ms)
    }

    /// Stagger between units.
    #[must_use]
    pub const fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    /// Departure-side settle offset.
    #[must_use]
    pub const fn early_settle(&self) -> Duration {
        Duration::from_millis(self.early_settle_ms)
    }
}

/// One credit unit in the air.
#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    /// Unique per choreographer.
    pub id: u64,
    /// Which way it travels.
    pub direction: Direction,
    /// Pool slot at the pool end.
    pub pool_index: u32,
    /// Diamond at the other end.
    pub diamond: QuestionId,
    /// Diamond level, 1-based.
    pub level: u32,
    /// Diamond point within the level.
    pub unit_index: u32,
    /// Tick time the launch was planned at.
    pub started_at: Duration,
    /// Flight length.
    pub duration: Duration,
    /// Stagger offset from `started_at`.
    pub delay: Duration,
    /// Sprite colour.
    pub color: Color,
    /// Epoch of the launch.
    pub epoch: u64,
}

impl Flight {
    /// Time the flight lands.
    #[must_use]
    pub fn ends_at(&self) -> Duration {
        self.started_at + self.delay + self.duration
    }

    /// Linear progress at `now`, `[0, 1]`.
    #[must_use]
    pub fn progress(&self, now: Duration) -> f32 {
        window_progress(now.saturating_sub(self.started_at), self.delay, self.duration)
    }
}

/// Interpolated sprite for one flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightSprite {
    /// Flight this sprite belongs to.
    pub flight_id: u64,
    /// Screen-space center X.
    pub x: f32,
    /// Screen-space center Y.
    pub y: f32,
    /// Radius before scaling.
    pub radius: f32,
    /// `0..=1`.
    pub opacity: f32,
    /// `0.8..=1`.
    pub scale: f32,
    /// Fill.
    pub color: Color,
}

impl FlightSprite {
    /// Drawn radius (`radius × scale`).
    #[must_use]
    pub fn size(&self) -> f32 {
        self.radius * self.scale
    }
}

/// A bus event due at a given time.
#[derive(Debug)]
struct Scheduled {
    due: Duration,
    seq: u64,
    event: AnimEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// The flight choreographer.
pub struct Choreographer {
    config: ChoreographyConfig,
    registry: ElementRegistry,
    subscription: Subscription,
    publisher: EventPublisher,
    flights: Vec<Flight>,
    timers: BinaryHeap<Reverse<Scheduled>>,
    next_flight_id: u64,
    next_seq: u64,
    /// Latest epoch announced by a reset.
    epoch: u64,
}

impl Choreographer {
    /// Creates a choreographer listening for launches and resets on `bus`.
    #[must_use]
    pub fn new(config: ChoreographyConfig, bus: &AnimationBus, registry: ElementRegistry) -> Self {
        Self {
            config,
            registry,
            subscription: bus.subscribe(Topics::LAUNCH | Topics::RESET),
            publisher: bus.publisher(),
            flights: Vec::new(),
            timers: BinaryHeap::new(),
            next_flight_id: 0,
            next_seq: 0,
            epoch: 0,
        }
    }

    /// Timing configuration.
    #[must_use]
    pub const fn config(&self) -> &ChoreographyConfig {
        &self.config
    }

    /// Flights that have not landed yet.
    #[must_use]
    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    /// Number of scheduled events not yet published.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.timers.len()
    }

    /// Returns true while anything is flying or scheduled.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.flights.is_empty() || !self.timers.is_empty()
    }

    /// Advances the choreography to `now`.
    ///
    /// Plans flights for new launches, publishes every scheduled event that
    /// is due and prunes landed flights. Returns how many events were
    /// published.
    pub fn tick(&mut self, now: Duration) -> usize {
        let mut published = 0;

        for event in self.subscription.drain() {
            match event {
                AnimEvent::Reset { epoch } => {
                    self.epoch = self.epoch.max(epoch);
                }
                AnimEvent::Launch(launch) if launch.epoch < self.epoch => {
                    tracing::debug!(
                        launch_epoch = launch.epoch,
                        epoch = self.epoch,
                        "stale launch discarded"
                    );
                }
                AnimEvent::Launch(launch) => published += self.plan(&launch, now),
                _ => {}
            }
        }

        while let Some(Reverse(next)) = self.timers.peek() {
            if next.due > now {
                break;
            }
            if let Some(Reverse(scheduled)) = self.timers.pop() {
                self.publisher.publish(&scheduled.event);
                published += 1;
            }
        }

        self.flights.retain(|flight| now < flight.ends_at());
        published
    }

    /// Interpolates every active flight at `now`.
    ///
    /// Endpoints are re-resolved each call so flights follow surfaces that
    /// move mid-flight.
    #[must_use]
    pub fn sprites(&self, now: Duration) -> Vec<FlightSprite> {
        self.flights
            .iter()
            .map(|flight| {
                let t = flight.progress(now);
                let eased = Easing::CubicOut.apply(t);

                let pool = self.pool_circle(flight.pool_index);
                let diamond = self
                    .registry
                    .resolve(&ElementKey::DiamondPoint {
                        diamond: flight.diamond.clone(),
                        level: flight.level,
                        unit: flight.unit_index,
                    })
                    .map(|handle| handle.circle);

                let (source, destination) = match flight.direction {
                    Direction::ToDiamond => (pool, diamond),
                    Direction::ToPool => (diamond, pool),
                };
                let from = source.unwrap_or(Circle::new(0.0, 0.0, FALLBACK_RADIUS));
                let to = destination.unwrap_or(from);

                FlightSprite {
                    flight_id: flight.id,
                    x: from.x + (to.x - from.x) * eased,
                    y: from.y + (to.y - from.y) * eased,
                    radius: from.r,
                    opacity: flight_opacity(t),
                    scale: flight_scale(t),
                    color: flight.color,
                }
            })
            .collect()
    }

    fn pool_circle(&self, pool_index: u32) -> Option<Circle> {
        self.registry
            .resolve(&ElementKey::PoolCircle(pool_index))
            .or_else(|| self.registry.resolve(&ElementKey::PoolAnchor))
            .map(|handle| handle.circle)
    }

    /// Creates the flights and timers for one launch.
    fn plan(&mut self, launch: &Launch, now: Duration) -> usize {
        let targets = self.registry.diamond_level(&launch.target, launch.level);
        let duration = self.config.flight_duration();
        let mut published = 0;

        for i in 0..launch.count.max(1) {
            let pool_index = launch.pool_start_index + i;
            let Some(&(unit_index, _)) = targets.get(i as usize) else {
                tracing::debug!(
                    target_id = %launch.target,
                    level = launch.level,
                    unit = i,
                    "diamond point not mounted, unit skipped"
                );
                continue;
            };

            let unit = UnitEvent {
                direction: launch.direction,
                target: launch.target.clone(),
                level: launch.level,
                unit_index,
                pool_index,
                epoch: launch.epoch,
            };
            self.publisher.publish(&AnimEvent::FlightStart(unit.clone()));
            published += 1;

            let color = launch
                .color
                .or_else(|| {
                    self.registry
                        .resolve(&ElementKey::PoolCircle(pool_index))
                        .and_then(|handle| handle.fill)
                })
                .unwrap_or(self.config.default_color);

            let delay = self.config.stagger() * i;
            self.flights.push(Flight {
                id: self.next_flight_id,
                direction: launch.direction,
                pool_index,
                diamond: launch.target.clone(),
                level: launch.level,
                unit_index,
                started_at: now,
                duration,
                delay,
                color,
                epoch: launch.epoch,
            });
            self.next_flight_id += 1;

            let (departure, arrival) = match launch.direction {
                Direction::ToDiamond => (
                    AnimEvent::PoolSettle(unit.clone()),
                    AnimEvent::DiamondSettle(unit.clone()),
                ),
                Direction::ToPool => (
                    AnimEvent::DiamondSettle(unit.clone()),
                    AnimEvent::PoolSettle(unit.clone()),
                ),
            };
            self.schedule(now + self.config.early_settle() + delay, departure);
            self.schedule(now + duration + delay, arrival);
            self.schedule(now + duration + delay, AnimEvent::FlightEnd(unit));
        }

        tracing::debug!(
            direction = %launch.direction,
            count = launch.count,
            planned = published,
            "launch planned"
        );
        published
    }

    fn schedule(&mut self, due: Duration, event: AnimEvent) {
        self.timers.push(Reverse(Scheduled {
            due,
            seq: self.next_seq,
            event,
        }));
        self.next_seq += 1;
    }
}

impl std::fmt::Debug for Choreographer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Choreographer")
            .field("flights", &self.flights.len())
            .field("pending_events", &self.timers.len())
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ElementHandle, Registration};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn launch(direction: Direction, count: u32, epoch: u64) -> AnimEvent {
        AnimEvent::Launch(Launch {
            direction,
            pool_start_index: 10,
            target: QuestionId::Int(1),
            level: 2,
            count,
            color: None,
            epoch,
        })
    }

    fn mount_level(registry: &ElementRegistry, units: u32) -> Registration {
        let registration = registry.registration();
        for unit in 0..units {
            #[allow(clippy::cast_precision_loss)]
            let x = 100.0 + unit as f32 * 8.0;
            registration.insert(
                ElementKey::DiamondPoint {
                    diamond: QuestionId::Int(1),
                    level: 2,
                    unit,
                },
                ElementHandle::new(Circle::new(x, 50.0, 4.0)),
            );
        }
        registration
    }

    fn setup(units: u32) -> (AnimationBus, Choreographer, Registration, Subscription) {
        let bus = AnimationBus::new(256);
        let registry = ElementRegistry::new();
        let registration = mount_level(&registry, units);
        let choreographer = Choreographer::new(ChoreographyConfig::default(), &bus, registry);
        let observer = bus.subscribe(
            Topics::FLIGHT_START | Topics::POOL_SETTLE | Topics::DIAMOND_SETTLE | Topics::FLIGHT_END,
        );
        (bus, choreographer, registration, observer)
    }

    #[test]
    fn test_to_diamond_timeline() {
        let (bus, mut choreographer, _registration, observer) = setup(3);
        bus.publish(&launch(Direction::ToDiamond, 3, 0));

        assert_eq!(choreographer.tick(ms(0)), 3);
        let starts = observer.drain();
        assert_eq!(starts.len(), 3);
        assert!(starts.iter().all(|e| matches!(e, AnimEvent::FlightStart(_))));

        // Early pool settles at 150, 210, 270.
        assert_eq!(choreographer.tick(ms(149)), 0);
        assert_eq!(choreographer.tick(ms(150)), 1);
        assert!(matches!(observer.try_recv(), Some(AnimEvent::PoolSettle(u)) if u.pool_index == 10));
        assert_eq!(choreographer.tick(ms(270)), 2);
        let _ = observer.drain();

        // Arrival for unit 0 at 650: diamond settle then end.
        assert_eq!(choreographer.tick(ms(650)), 2);
        let arrival = observer.drain();
        assert!(matches!(&arrival[0], AnimEvent::DiamondSettle(u) if u.unit_index == 0));
        assert!(matches!(&arrival[1], AnimEvent::FlightEnd(u) if u.unit_index == 0));

        assert_eq!(choreographer.tick(ms(770)), 4);
        assert!(!choreographer.is_busy());
    }

    #[test]
    fn test_to_pool_settles_diamond_first() {
        let (bus, mut choreographer, _registration, observer) = setup(1);
        bus.publish(&launch(Direction::ToPool, 1, 0));

        choreographer.tick(ms(0));
        let _ = observer.drain();
        choreographer.tick(ms(150));
        assert!(matches!(observer.try_recv(), Some(AnimEvent::DiamondSettle(_))));
        choreographer.tick(ms(650));
        assert!(matches!(observer.try_recv(), Some(AnimEvent::PoolSettle(_))));
        assert!(matches!(observer.try_recv(), Some(AnimEvent::FlightEnd(_))));
    }

    #[test]
    fn test_missing_points_are_skipped() {
        let (bus, mut choreographer, _registration, observer) = setup(2);
        bus.publish(&launch(Direction::ToDiamond, 4, 0));

        choreographer.tick(ms(0));
        assert_eq!(observer.drain().len(), 2);
        assert_eq!(choreographer.flights().len(), 2);
        assert_eq!(choreographer.pending_events(), 6);
    }

    #[test]
    fn test_zero_count_still_moves_one_unit() {
        let (bus, mut choreographer, _registration, _observer) = setup(3);
        bus.publish(&launch(Direction::ToDiamond, 0, 0));

        assert_eq!(choreographer.tick(ms(0)), 1);
        assert_eq!(choreographer.flights().len(), 1);
    }

    #[test]
    fn test_stale_launch_after_reset_is_ignored() {
        let (bus, mut choreographer, _registration, observer) = setup(3);
        bus.publish(&AnimEvent::Reset { epoch: 1 });
        bus.publish(&launch(Direction::ToDiamond, 2, 0));

        assert_eq!(choreographer.tick(ms(0)), 0);
        assert!(!observer.has_events());
    }

    #[test]
    fn test_sprites_follow_registered_geometry() {
        let (bus, mut choreographer, registration, _observer) = setup(1);
        registration.insert(
            ElementKey::PoolCircle(10),
            ElementHandle::new(Circle::new(0.0, 0.0, 4.0)).with_fill(Color::WHITE),
        );
        bus.publish(&launch(Direction::ToDiamond, 1, 0));
        choreographer.tick(ms(0));

        let start = choreographer.sprites(ms(0));
        assert_eq!(start.len(), 1);
        assert_eq!((start[0].x, start[0].y), (0.0, 0.0));
        assert_eq!(start[0].opacity, 0.0);
        assert!((start[0].scale - 0.8).abs() < 1e-6);
        assert_eq!(start[0].color, Color::WHITE);

        let end = choreographer.sprites(ms(649));
        assert!((end[0].x - 100.0).abs() < 0.1);
        assert!((end[0].y - 50.0).abs() < 0.1);

        choreographer.tick(ms(650));
        assert!(choreographer.sprites(ms(650)).is_empty());
    }

    #[test]
    fn test_sprite_falls_back_to_pool_anchor() {
        let (bus, mut choreographer, registration, _observer) = setup(1);
        registration.insert(
            ElementKey::PoolAnchor,
            ElementHandle::new(Circle::new(20.0, 30.0, 5.0)),
        );
        bus.publish(&launch(Direction::ToPool, 1, 0));
        choreographer.tick(ms(0));

        let landed = choreographer.sprites(ms(649));
        assert!((landed[0].x - 20.0).abs() < 0.1);
        assert_eq!(landed[0].radius, 4.0);
        assert_eq!(landed[0].color, Color::BLACK);
    }

    #[test]
    fn test_config_from_toml() {
        let config: ChoreographyConfig =
            toml::from_str("stagger_ms = 30\ndefault_color = \"#3B82F6\"").unwrap();
        assert_eq!(config.stagger(), ms(30));
        assert_eq!(config.flight_duration(), ms(650));
        assert_eq!(config.default_color, Color::hex(0x3B82_F6FF));
    }
}
