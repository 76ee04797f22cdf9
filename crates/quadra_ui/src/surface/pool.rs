//! Credit pool grid: one circle per credit, filled when used.
//!
//! A circle leaving for a diamond keeps its credit colour until its early
//! `PoolSettle`; a circle being returned shows the credit colour from the
//! moment its flight starts.

use std::collections::HashSet;
use std::time::Duration;

use quadra_ledger::LedgerSnapshot;
use quadra_shared::{AnimEvent, AnimationBus, Color, Direction, Subscription, Topics};
use serde::{Deserialize, Serialize};

use super::{EpochGate, VisualSurface};
use crate::geometry::{bounding_viewport, pool_grid, Circle, Rect};
use crate::registry::{ElementHandle, ElementKey, ElementRegistry, Registration};

/// Pool appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Circles per row.
    pub columns: u32,
    /// Circle radius.
    pub circle_radius: f32,
    /// Gap between circles.
    pub circle_spacing: f32,
    /// Fill used credits from the end of the grid instead of the start.
    pub reverse: bool,
    /// Fill of used credits.
    pub credit_color: Color,
    /// Fill of available credits.
    pub circle_color: Color,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            columns: 5,
            circle_radius: 4.0,
            circle_spacing: 4.0,
            reverse: false,
            credit_color: Color::BLACK,
            circle_color: Color::GREY,
        }
    }
}

/// One drawn pool circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolCircleView {
    /// Pool slot.
    pub index: u32,
    /// Local geometry (inside `PoolView::viewport`).
    pub circle: Circle,
    /// Fill.
    pub fill: Color,
}

/// Pool view model.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolView {
    /// Local bounding box of all circles.
    pub viewport: Rect,
    /// Circles in slot order.
    pub circles: Vec<PoolCircleView>,
}

/// The pool grid surface.
pub struct PoolSurface {
    config: PoolConfig,
    origin: (f32, f32),
    credits: u32,
    circles: Vec<Circle>,
    viewport: Rect,
    arriving: HashSet<u32>,
    departing: HashSet<u32>,
    gate: EpochGate,
    registration: Registration,
    subscription: Subscription,
}

impl PoolSurface {
    /// Mounts the pool with its viewport's top-left corner at `origin`.
    #[must_use]
    pub fn mount(
        config: PoolConfig,
        bus: &AnimationBus,
        registry: &ElementRegistry,
        origin: (f32, f32),
        snapshot: &LedgerSnapshot,
    ) -> Self {
        let mut surface = Self {
            config,
            origin,
            credits: 0,
            circles: Vec::new(),
            viewport: Rect::ZERO,
            arriving: HashSet::new(),
            departing: HashSet::new(),
            gate: EpochGate::new(snapshot.epoch),
            registration: registry.registration(),
            subscription: bus.subscribe(Topics::FLIGHT_START | Topics::POOL_SETTLE | Topics::RESET),
        };
        surface.layout(snapshot.credits);
        tracing::debug!(credits = snapshot.credits, "pool mounted");
        surface
    }

    /// Moves the surface and re-registers its circles.
    pub fn move_to(&mut self, origin: (f32, f32)) {
        self.origin = origin;
        self.layout(self.credits);
    }

    /// Local bounding box of the grid.
    #[must_use]
    pub const fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Returns true while a returning credit is flying to slot `index`.
    #[must_use]
    pub fn is_arriving(&self, index: u32) -> bool {
        self.arriving.contains(&index)
    }

    /// Returns true while slot `index` is still showing a departed credit.
    #[must_use]
    pub fn is_departing(&self, index: u32) -> bool {
        self.departing.contains(&index)
    }

    /// Builds the view for `snapshot` and pushes the fills to the registry.
    pub fn view(&mut self, snapshot: &LedgerSnapshot) -> PoolView {
        if snapshot.credits != self.credits {
            self.layout(snapshot.credits);
        }
        let used = snapshot.used_credits();

        let circles: Vec<PoolCircleView> = (0u32..)
            .zip(&self.circles)
            .map(|(index, circle)| {
                let is_used = if self.config.reverse {
                    index >= self.credits - used
                } else {
                    index < used
                };
                let highlighted =
                    is_used || self.arriving.contains(&index) || self.departing.contains(&index);
                let fill = if highlighted {
                    self.config.credit_color
                } else {
                    self.config.circle_color
                };
                self.registration
                    .set_fill(&ElementKey::PoolCircle(index), fill);

                PoolCircleView {
                    index,
                    circle: *circle,
                    fill,
                }
            })
            .collect();

        PoolView {
            viewport: self.viewport,
            circles,
        }
    }

    fn layout(&mut self, credits: u32) {
        self.credits = credits;
        self.circles = pool_grid(
            credits,
            self.config.columns,
            self.config.circle_radius,
            self.config.circle_spacing,
        );
        self.viewport = bounding_viewport(&self.circles);

        let (dx, dy) = (self.origin.0 - self.viewport.x, self.origin.1 - self.viewport.y);
        self.registration.clear();
        for (index, circle) in (0u32..).zip(&self.circles) {
            self.registration.insert(
                ElementKey::PoolCircle(index),
                ElementHandle::new(circle.translate(dx, dy)).with_fill(self.config.circle_color),
            );
        }
    }
}

impl VisualSurface for PoolSurface {
    fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    fn handle(&mut self, event: &AnimEvent, _now: Duration) {
        if !self.gate.admit(event) {
            return;
        }
        match event {
            AnimEvent::FlightStart(unit) => match unit.direction {
                Direction::ToDiamond => {
                    self.departing.insert(unit.pool_index);
                }
                Direction::ToPool => {
                    self.arriving.insert(unit.pool_index);
                }
            },
            AnimEvent::PoolSettle(unit) => match unit.direction {
                Direction::ToDiamond => {
                    self.departing.remove(&unit.pool_index);
                }
                Direction::ToPool => {
                    self.arriving.remove(&unit.pool_index);
                }
            },
            AnimEvent::Reset { .. } => {
                self.arriving.clear();
                self.departing.clear();
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for PoolSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolSurface")
            .field("credits", &self.credits)
            .field("arriving", &self.arriving.len())
            .field("departing", &self.departing.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadra_ledger::{Ledger, Question};
    use quadra_shared::{QuestionId, UnitEvent};

    fn ledger(credits: u32) -> Ledger {
        Ledger::new(credits, vec![Question::new(0, "a"), Question::new(1, "b")]).unwrap()
    }

    fn unit(direction: Direction, pool_index: u32) -> UnitEvent {
        UnitEvent {
            direction,
            target: QuestionId::Int(0),
            level: 1,
            unit_index: 0,
            pool_index,
            epoch: 0,
        }
    }

    fn fills(view: &PoolView) -> Vec<Color> {
        view.circles.iter().map(|c| c.fill).collect()
    }

    #[test]
    fn test_mount_registers_every_circle() {
        let bus = AnimationBus::default();
        let registry = ElementRegistry::new();
        let ledger = ledger(16);
        let pool = PoolSurface::mount(
            PoolConfig::default(),
            &bus,
            &registry,
            (100.0, 200.0),
            &ledger.snapshot(),
        );

        assert_eq!(registry.len(), 16);
        assert_eq!(pool.viewport(), Rect::new(0.0, 0.0, 56.0, 44.0));
        assert_eq!(
            registry.resolve(&ElementKey::PoolCircle(0)).map(|h| h.circle),
            Some(Circle::new(104.0, 204.0, 4.0))
        );

        drop(pool);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_used_credits_fill_from_start() {
        let bus = AnimationBus::default();
        let registry = ElementRegistry::new();
        let mut ledger = ledger(9);
        ledger.vote(&QuestionId::Int(0), 2);
        let mut pool =
            PoolSurface::mount(PoolConfig::default(), &bus, &registry, (0.0, 0.0), &ledger.snapshot());

        let view = pool.view(&ledger.snapshot());
        let fills = fills(&view);
        assert!(fills[..4].iter().all(|c| *c == Color::BLACK));
        assert!(fills[4..].iter().all(|c| *c == Color::GREY));
        assert_eq!(
            registry.resolve(&ElementKey::PoolCircle(3)).and_then(|h| h.fill),
            Some(Color::BLACK)
        );
    }

    #[test]
    fn test_reverse_fills_from_end() {
        let bus = AnimationBus::default();
        let registry = ElementRegistry::new();
        let mut ledger = ledger(9);
        ledger.vote(&QuestionId::Int(0), 1);
        let config = PoolConfig {
            reverse: true,
            ..PoolConfig::default()
        };
        let mut pool = PoolSurface::mount(config, &bus, &registry, (0.0, 0.0), &ledger.snapshot());

        let fills = fills(&pool.view(&ledger.snapshot()));
        assert_eq!(fills[8], Color::BLACK);
        assert!(fills[..8].iter().all(|c| *c == Color::GREY));
    }

    #[test]
    fn test_departing_circle_stays_filled_until_settle() {
        let bus = AnimationBus::default();
        let registry = ElementRegistry::new();
        let mut ledger = ledger(9);
        let mut pool =
            PoolSurface::mount(PoolConfig::default(), &bus, &registry, (0.0, 0.0), &ledger.snapshot());

        // Vote 0 → -1 after a return flight started for slot 5.
        bus.publish(&AnimEvent::FlightStart(unit(Direction::ToPool, 5)));
        assert_eq!(pool.pump(Duration::ZERO), 1);
        assert!(pool.is_arriving(5));
        assert_eq!(fills(&pool.view(&ledger.snapshot()))[5], Color::BLACK);

        bus.publish(&AnimEvent::PoolSettle(unit(Direction::ToPool, 5)));
        pool.pump(Duration::ZERO);
        assert_eq!(fills(&pool.view(&ledger.snapshot()))[5], Color::GREY);

        ledger.vote(&QuestionId::Int(0), 1);
        bus.publish(&AnimEvent::FlightStart(unit(Direction::ToDiamond, 0)));
        pool.pump(Duration::ZERO);
        assert!(pool.is_departing(0));
    }

    #[test]
    fn test_stale_settle_after_reset_is_ignored() {
        let bus = AnimationBus::default();
        let registry = ElementRegistry::new();
        let ledger = ledger(9);
        let mut pool =
            PoolSurface::mount(PoolConfig::default(), &bus, &registry, (0.0, 0.0), &ledger.snapshot());

        bus.publish(&AnimEvent::FlightStart(unit(Direction::ToDiamond, 2)));
        bus.publish(&AnimEvent::Reset { epoch: 1 });
        bus.publish(&AnimEvent::FlightStart(unit(Direction::ToDiamond, 3)));
        pool.pump(Duration::ZERO);

        assert!(!pool.is_departing(2));
        assert!(!pool.is_departing(3));
    }

    #[test]
    fn test_budget_change_relayouts() {
        let bus = AnimationBus::default();
        let registry = ElementRegistry::new();
        let mut ledger = ledger(9);
        let mut pool =
            PoolSurface::mount(PoolConfig::default(), &bus, &registry, (0.0, 0.0), &ledger.snapshot());

        ledger.set_credits(25).unwrap();
        assert_eq!(pool.view(&ledger.snapshot()).circles.len(), 25);
        assert_eq!(registry.len(), 25);
    }
}
