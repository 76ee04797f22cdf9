//! # Liquid Pool
//!
//! An alternative pool rendered as a gooey blob whose size follows the
//! credits still in the pool.
//!
//! ## Displayed Credits
//!
//! ```text
//! ledger available:   100 ─────────┐ 91 (instant, on commit)
//! displayed:          100 ──┐ 99 ──┐ 98 ... ──┐ 91   (one step per PoolSettle)
//!                           │      │          │
//!                      settle 0  settle 1  settle 8
//! lock:               [launch ──────────────────── duration + 100 + (n-1)·stagger]
//! ```
//!
//! While locked, `displayed_available` moves only on `PoolSettle` events.
//! Once the lock expires it snaps to the ledger again, which absorbs any
//! drift from skipped units.

use std::time::Duration;

use quadra_ledger::LedgerSnapshot;
use quadra_shared::{AnimEvent, AnimationBus, Color, Direction, Subscription, Topics, UnitEvent};
use serde::{Deserialize, Serialize};

use super::{EpochGate, VisualSurface};
use crate::animation::{Easing, Tween};
use crate::choreographer::ChoreographyConfig;
use crate::geometry::Circle;
use crate::registry::{ElementHandle, ElementKey, ElementRegistry, Registration};

/// Extra lock time past the last unit's landing.
const LOCK_SLACK: Duration = Duration::from_millis(100);

/// Lifetime of a burst droplet.
const DROP_LIFETIME: Duration = Duration::from_millis(700);

/// Radius of the invisible landing anchor at the pool's center.
const ANCHOR_RADIUS: f32 = 5.0;

/// Radius of the core blob at scale 1.
const CORE_RADIUS: f32 = 40.0;

/// How long the core takes to reach a new scale.
const CORE_TWEEN: Duration = Duration::from_millis(350);

/// Concurrent flights at which the stream spout saturates.
const STREAM_SATURATION: f32 = 6.0;

fn clamp01(n: f32) -> f32 {
    n.clamp(0.0, 1.0)
}

/// Container shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidShape {
    /// `size × size`, fully rounded.
    #[default]
    Circle,
    /// `width × height`, slightly rounded corners.
    Rect,
}

/// Which credit count drives the core blob size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoreScaleMode {
    /// Bigger when more credits remain.
    #[default]
    Available,
    /// Bigger when more credits are spent.
    Used,
}

/// Liquid pool appearance and behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidPoolConfig {
    /// Container shape.
    pub shape: LiquidShape,
    /// Side length for [`LiquidShape::Circle`].
    pub size: f32,
    /// Width for [`LiquidShape::Rect`].
    pub width: f32,
    /// Height for [`LiquidShape::Rect`].
    pub height: f32,
    /// Behind the blobs.
    pub background_color: Color,
    /// Blob and droplet colour.
    pub ink_color: Color,
    /// Goo blur radius.
    pub blur_px: f32,
    /// Goo contrast multiplier.
    pub contrast: f32,
    /// Scale of the liquid inside the container.
    pub liquid_scale: f32,
    /// Droplets spawned per flight start.
    pub burst_count: u32,
    /// Fade time before an empty pool goes blank.
    pub dry_out_ms: u64,
    /// What drives the core size.
    pub core_scale_mode: CoreScaleMode,
    /// Core scale at ratio 0.
    pub core_scale_min: f32,
    /// Core scale at ratio 1.
    pub core_scale_max: f32,
}

impl Default for LiquidPoolConfig {
    fn default() -> Self {
        Self {
            shape: LiquidShape::Circle,
            size: 96.0,
            width: 140.0,
            height: 140.0,
            background_color: Color::BLACK,
            ink_color: Color::WHITE,
            blur_px: 8.0,
            contrast: 18.0,
            liquid_scale: 1.0,
            burst_count: 1,
            dry_out_ms: 0,
            core_scale_mode: CoreScaleMode::Available,
            core_scale_min: 0.6,
            core_scale_max: 1.0,
        }
    }
}

impl LiquidPoolConfig {
    /// Container size `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (f32, f32) {
        match self.shape {
            LiquidShape::Circle => (self.size, self.size),
            LiquidShape::Rect => (self.width, self.height),
        }
    }

    /// Container corner radius.
    #[must_use]
    pub fn corner_radius(&self) -> f32 {
        match self.shape {
            LiquidShape::Circle => self.size * 0.5,
            LiquidShape::Rect => 12.0,
        }
    }

    fn liquid_scale_clamped(&self) -> f32 {
        if self.liquid_scale.is_finite() {
            self.liquid_scale.max(0.01)
        } else {
            1.0
        }
    }
}

/// Empty-pool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DryState {
    /// Credits available.
    #[default]
    Wet,
    /// Empty, fading out.
    Drying,
    /// Empty and blank.
    Dry,
}

/// A droplet spawned by one flight start.
#[derive(Debug, Clone, Copy)]
struct BurstDrop {
    id: u64,
    direction: Direction,
    seed: f32,
    vx: f32,
    vy: f32,
    born: Duration,
}

/// One droplet, resolved for drawing.
///
/// Offsets are relative to the pool's center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropView {
    /// Stable id.
    pub id: u64,
    /// Outgoing (`ToDiamond`) or incoming (`ToPool`).
    pub direction: Direction,
    /// Point on the core surface where the droplet detaches or lands.
    pub surface_point: (f32, f32),
    /// Travel vector away from `surface_point`.
    pub travel: (f32, f32),
    /// Droplet diameter.
    pub size: f32,
    /// Droplet animation length in seconds.
    pub duration: f32,
    /// `[0, 1]` through the animation.
    pub progress: f32,
    /// Current offset.
    pub x: f32,
    /// Current offset.
    pub y: f32,
    /// Current scale.
    pub scale: f32,
    /// Current opacity.
    pub opacity: f32,
    /// Neck length for outgoing droplets.
    pub tether_length: Option<f32>,
    /// Neck rotation in degrees.
    pub tether_rotation_deg: f32,
}

/// Continuous spout while credits are streaming.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamView {
    /// Any flight in progress.
    pub active: bool,
    /// Spout position relative to the pool's center.
    pub origin: (f32, f32),
    /// `min(1, in_flight / 6)`.
    pub strength: f32,
}

/// Liquid pool view model.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidView {
    /// Container width.
    pub width: f32,
    /// Container height.
    pub height: f32,
    /// Container corner radius.
    pub corner_radius: f32,
    /// Background fill.
    pub background_color: Color,
    /// Blob fill.
    pub ink_color: Color,
    /// Goo blur.
    pub blur_px: f32,
    /// Goo contrast.
    pub contrast: f32,
    /// Liquid scale inside the container.
    pub liquid_scale: f32,
    /// Empty-pool state.
    pub dry_state: DryState,
    /// Dry-out fade length.
    pub dry_out_ms: u64,
    /// Orbiting droplet size and opacity, `[0, 1]`.
    pub mass: f32,
    /// Animated core scale.
    pub core_scale: f32,
    /// Scale the core is heading towards.
    pub core_scale_target: f32,
    /// Burst droplets.
    pub drops: Vec<DropView>,
    /// Stream spout.
    pub stream: StreamView,
}

/// The liquid pool surface.
pub struct LiquidPoolSurface {
    config: LiquidPoolConfig,
    flight_duration: Duration,
    stagger: Duration,
    origin: (f32, f32),
    credits: u32,
    available: u32,
    displayed_available: u32,
    lock_until: Duration,
    in_flight_to_diamond: u32,
    in_flight_to_pool: u32,
    dry_state: DryState,
    dry_since: Option<Duration>,
    drops: Vec<BurstDrop>,
    next_drop_id: u64,
    last_vector: Option<(f32, f32)>,
    core: Tween,
    gate: EpochGate,
    registration: Registration,
    subscription: Subscription,
}

impl LiquidPoolSurface {
    /// Mounts the liquid pool with its top-left corner at `origin`.
    ///
    /// `timing` must match the choreographer's so the display lock covers
    /// every unit of a launch.
    #[must_use]
    pub fn mount(
        config: LiquidPoolConfig,
        timing: &ChoreographyConfig,
        bus: &AnimationBus,
        registry: &ElementRegistry,
        origin: (f32, f32),
        snapshot: &LedgerSnapshot,
    ) -> Self {
        let displayed = snapshot.available_credits.min(snapshot.credits);
        let mut surface = Self {
            config,
            flight_duration: timing.flight_duration(),
            stagger: timing.stagger(),
            origin,
            credits: snapshot.credits,
            available: snapshot.available_credits,
            displayed_available: displayed,
            lock_until: Duration::ZERO,
            in_flight_to_diamond: 0,
            in_flight_to_pool: 0,
            dry_state: DryState::Wet,
            dry_since: None,
            drops: Vec::new(),
            next_drop_id: 0,
            last_vector: None,
            core: Tween::new(0.0, Easing::ExponentialOut, CORE_TWEEN),
            gate: EpochGate::new(snapshot.epoch),
            registration: registry.registration(),
            subscription: bus.subscribe(Topics::ALL),
        };
        surface.core.snap(surface.core_scale_goal());
        surface.register_anchor();
        surface
    }

    /// Moves the surface and its anchor.
    pub fn move_to(&mut self, origin: (f32, f32)) {
        self.origin = origin;
        self.register_anchor();
    }

    /// Screen-space landing point at the pool's center.
    #[must_use]
    pub fn anchor(&self) -> Circle {
        let (width, height) = self.config.dimensions();
        Circle::new(
            self.origin.0 + width * 0.5,
            self.origin.1 + height * 0.5,
            ANCHOR_RADIUS,
        )
    }

    /// Credits shown in the pool, following the flights.
    #[must_use]
    pub const fn displayed_available(&self) -> u32 {
        self.displayed_available
    }

    /// `(to_diamond, to_pool)` flights in progress.
    #[must_use]
    pub const fn in_flight(&self) -> (u32, u32) {
        (self.in_flight_to_diamond, self.in_flight_to_pool)
    }

    /// Empty-pool state.
    #[must_use]
    pub const fn dry_state(&self) -> DryState {
        self.dry_state
    }

    /// Returns true while `displayed_available` ignores the ledger.
    #[must_use]
    pub fn is_locked(&self, now: Duration) -> bool {
        now < self.lock_until
    }

    /// Live droplets.
    #[must_use]
    pub fn drop_count(&self) -> usize {
        self.drops.len()
    }

    /// Liquid mass in `[0, 1]`; zero as soon as the ledger is empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mass(&self) -> f32 {
        if self.available == 0 || self.credits == 0 {
            return 0.0;
        }
        clamp01(self.displayed_available as f32 / self.credits as f32)
    }

    /// Core scale for the displayed credits, ignoring the empty state.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn core_scale_target(&self) -> f32 {
        let ratio = if self.credits == 0 {
            0.0
        } else {
            let driver = match self.config.core_scale_mode {
                CoreScaleMode::Available => self.displayed_available,
                CoreScaleMode::Used => self.credits - self.displayed_available,
            };
            clamp01(driver as f32 / self.credits as f32)
        };
        let min = clamp01(self.config.core_scale_min);
        let max = clamp01(self.config.core_scale_max);
        min + (max - min) * ratio
    }

    /// `min(1, in_flight / 6)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stream_strength(&self) -> f32 {
        let count = self.in_flight_to_diamond.max(self.in_flight_to_pool);
        (count as f32 / STREAM_SATURATION).min(1.0)
    }

    /// Takes the latest ledger state and advances timers to `now`.
    pub fn update(&mut self, snapshot: &LedgerSnapshot, now: Duration) {
        self.credits = snapshot.credits;
        self.available = snapshot.available_credits;

        if !self.is_locked(now) {
            self.displayed_available = self.available.min(self.credits);
        }
        self.displayed_available = self.displayed_available.min(self.credits);

        self.update_dry_state(now);
        self.drops.retain(|drop| now < drop.born + DROP_LIFETIME);

        self.core.retarget(self.core_scale_goal(), now);
    }

    /// Builds the view at `now`.
    #[must_use]
    pub fn view(&self, now: Duration) -> LiquidView {
        let (width, height) = self.config.dimensions();
        let base_radius = CORE_RADIUS * self.core_scale_target() * self.config.liquid_scale_clamped();

        let (vx, vy) = self.last_vector.unwrap_or((1.0, 0.0));
        let magnitude = vx.hypot(vy).max(0.0001);
        let stream = StreamView {
            active: self.in_flight_to_diamond.max(self.in_flight_to_pool) > 0,
            origin: (
                vx / magnitude * base_radius * 0.9,
                vy / magnitude * base_radius * 0.9,
            ),
            strength: self.stream_strength(),
        };

        LiquidView {
            width,
            height,
            corner_radius: self.config.corner_radius(),
            background_color: self.config.background_color,
            ink_color: self.config.ink_color,
            blur_px: self.config.blur_px,
            contrast: self.config.contrast,
            liquid_scale: self.config.liquid_scale_clamped(),
            dry_state: self.dry_state,
            dry_out_ms: self.config.dry_out_ms,
            mass: self.mass(),
            core_scale: self.core.value_at(now),
            core_scale_target: self.core_scale_target(),
            drops: self
                .drops
                .iter()
                .map(|drop| drop_view(drop, base_radius, now))
                .collect(),
            stream,
        }
    }

    /// Scale the core animates towards, including the empty state.
    fn core_scale_goal(&self) -> f32 {
        match self.dry_state {
            DryState::Wet if self.available == 0 => 0.0,
            DryState::Wet => self.core_scale_target(),
            DryState::Drying | DryState::Dry => 0.01,
        }
    }

    fn update_dry_state(&mut self, now: Duration) {
        if self.available > 0 {
            self.dry_state = DryState::Wet;
            self.dry_since = None;
            return;
        }
        let dry_out = Duration::from_millis(self.config.dry_out_ms);
        let since = *self.dry_since.get_or_insert(now);
        self.dry_state = if now.saturating_sub(since) >= dry_out {
            DryState::Dry
        } else {
            DryState::Drying
        };
    }

    fn register_anchor(&self) {
        self.registration
            .insert(ElementKey::PoolAnchor, ElementHandle::new(self.anchor()));
    }

    fn on_launch(&mut self, count: u32, now: Duration) {
        let count = count.max(1);
        let lock = self.flight_duration + LOCK_SLACK + self.stagger * (count - 1);
        self.lock_until = self.lock_until.max(now + lock);
    }

    fn on_flight_start(&mut self, unit: &UnitEvent, now: Duration) {
        match unit.direction {
            Direction::ToDiamond => self.in_flight_to_diamond += 1,
            Direction::ToPool => self.in_flight_to_pool += 1,
        }

        let vector = self.vector_to(unit);
        if vector.is_some() {
            self.last_vector = vector;
        }
        if self.dry_state == DryState::Dry {
            return;
        }

        let n = self.config.burst_count.max(1);
        #[allow(clippy::cast_precision_loss)]
        let seed_base = (unit.pool_index % 997) as f32 / 997.0;
        let (vx, vy) = vector.unwrap_or_else(|| {
            let angle = (seed_base * 2.0 - 1.0) * std::f32::consts::FRAC_PI_2;
            (angle.cos(), angle.sin())
        });

        for i in 0..n {
            #[allow(clippy::cast_precision_loss)]
            let seed = (seed_base + i as f32 / (n + 1) as f32).fract();
            self.drops.push(BurstDrop {
                id: self.next_drop_id,
                direction: unit.direction,
                seed,
                vx,
                vy,
                born: now,
            });
            self.next_drop_id += 1;
        }
    }

    /// Vector from the pool's center to the unit's diamond point.
    fn vector_to(&self, unit: &UnitEvent) -> Option<(f32, f32)> {
        let target = self.registration.registry().resolve(&ElementKey::DiamondPoint {
            diamond: unit.target.clone(),
            level: unit.level,
            unit: unit.unit_index,
        })?;
        let anchor = self.anchor();
        Some((target.circle.x - anchor.x, target.circle.y - anchor.y))
    }
}

/// Resolves a droplet's trajectory at `now`.
fn drop_view(drop: &BurstDrop, base_radius: f32, now: Duration) -> DropView {
    let magnitude = drop.vx.hypot(drop.vy).max(0.0001);
    let (ux, uy) = (drop.vx / magnitude, drop.vy / magnitude);

    // Small angular wobble so bursts of one launch fan out.
    let wobble = (drop.seed * 13.1).sin() * std::f32::consts::PI / 18.0;
    let (sin_w, cos_w) = wobble.sin_cos();
    let (rx, ry) = (ux * cos_w - uy * sin_w, ux * sin_w + uy * cos_w);

    let distance = 26.0 + 26.0 * clamp01((drop.seed * 11.7).sin() * 0.5 + 0.5);
    let (x, y) = (rx * distance, ry * distance);
    let s = clamp01((drop.seed * 7.3).sin() * 0.5 + 0.5);
    let duration = 0.45 + 0.2 * s;

    let length = x.hypot(y).max(0.0001);
    let surface_point = (x / length * base_radius * 0.9, y / length * base_radius * 0.9);
    let far_point = (surface_point.0 + x, surface_point.1 + y);

    let outgoing = drop.direction == Direction::ToDiamond;
    let (from, to, scales, opacities) = if outgoing {
        (surface_point, far_point, (1.1, 0.35), (1.0, 0.0))
    } else {
        (far_point, surface_point, (0.35, 1.05), (0.9, 0.0))
    };

    let progress = clamp01(now.saturating_sub(drop.born).as_secs_f32() / duration);
    let eased = Easing::CubicOut.apply(progress);
    let lerp = |a: f32, b: f32| a + (b - a) * eased;

    DropView {
        id: drop.id,
        direction: drop.direction,
        surface_point,
        travel: (x, y),
        size: 18.0 + s * 10.0,
        duration,
        progress,
        x: lerp(from.0, to.0),
        y: lerp(from.1, to.1),
        scale: lerp(scales.0, scales.1),
        opacity: lerp(opacities.0, opacities.1),
        tether_length: outgoing.then(|| x.hypot(y).max(10.0)),
        tether_rotation_deg: y.atan2(x).to_degrees() - 90.0,
    }
}

impl VisualSurface for LiquidPoolSurface {
    fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    fn handle(&mut self, event: &AnimEvent, now: Duration) {
        if !self.gate.admit(event) {
            return;
        }
        match event {
            AnimEvent::Launch(launch) => self.on_launch(launch.count, now),
            AnimEvent::FlightStart(unit) => self.on_flight_start(unit, now),
            AnimEvent::PoolSettle(unit) => {
                self.displayed_available = match unit.direction {
                    Direction::ToPool => (self.displayed_available + 1).min(self.credits),
                    Direction::ToDiamond => self.displayed_available.saturating_sub(1),
                };
                if unit.direction == Direction::ToPool {
                    self.in_flight_to_pool = self.in_flight_to_pool.saturating_sub(1);
                }
            }
            AnimEvent::DiamondSettle(unit) => {
                if unit.direction == Direction::ToDiamond {
                    self.in_flight_to_diamond = self.in_flight_to_diamond.saturating_sub(1);
                }
            }
            AnimEvent::Reset { epoch } => {
                tracing::debug!(epoch, "liquid pool reset");
                self.in_flight_to_diamond = 0;
                self.in_flight_to_pool = 0;
                self.lock_until = Duration::ZERO;
                self.drops.clear();
            }
            AnimEvent::FlightEnd(_) => {}
        }
    }
}

impl std::fmt::Debug for LiquidPoolSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiquidPoolSurface")
            .field("displayed_available", &self.displayed_available)
            .field("available", &self.available)
            .field("dry_state", &self.dry_state)
            .field("drops", &self.drops.len())
            .finish_non_exhaustive()
    }
}
