//! Diamond vote-level indicator for one question.
//!
//! Levels up to `|vote|` show the vote colour. A point a credit is flying
//! into stays neutral until its `DiamondSettle`; a point a credit is leaving
//! keeps the colour it showed when the flight started.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use quadra_ledger::LedgerSnapshot;
use quadra_shared::{AnimEvent, AnimationBus, Color, Direction, QuestionId, Subscription, Topics};
use serde::{Deserialize, Serialize};

use super::{EpochGate, VisualSurface};
use crate::geometry::{bounding_viewport, diamond_layout, Circle, DiamondPoint, Rect};
use crate::registry::{ElementHandle, ElementKey, ElementRegistry, Registration};

/// `(level, unit)`.
type PointKey = (u32, u32);

/// Diamond appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiamondConfig {
    /// Fill of inactive levels.
    pub neutral_color: Color,
    /// Fill of active levels when the vote is positive.
    pub positive_color: Color,
    /// Fill of active levels when the vote is negative.
    pub negative_color: Color,
    /// Circle radius.
    pub circle_radius: f32,
}

impl Default for DiamondConfig {
    fn default() -> Self {
        Self {
            neutral_color: Color::DARK_GREY,
            positive_color: Color::GREEN,
            negative_color: Color::RED,
            circle_radius: 4.0,
        }
    }
}

impl DiamondConfig {
    /// Colour of active levels for a given vote.
    #[must_use]
    pub const fn vote_color(&self, vote: i32) -> Color {
        match vote {
            v if v > 0 => self.positive_color,
            v if v < 0 => self.negative_color,
            _ => self.neutral_color,
        }
    }
}

/// One drawn diamond circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiamondPointView {
    /// Level, 1-based.
    pub level: u32,
    /// Index within the level.
    pub unit: u32,
    /// Local geometry (inside `DiamondView::viewport`).
    pub circle: Circle,
    /// Fill.
    pub fill: Color,
}

/// Diamond view model.
#[derive(Debug, Clone, PartialEq)]
pub struct DiamondView {
    /// Question this diamond shows.
    pub id: QuestionId,
    /// Local bounding box.
    pub viewport: Rect,
    /// Points in layout order.
    pub points: Vec<DiamondPointView>,
    /// `|vote|`.
    pub vote_level: u32,
    /// The idle shine sweep plays while nothing is allocated.
    pub shine_active: bool,
}

/// The diamond surface.
pub struct DiamondSurface {
    id: QuestionId,
    config: DiamondConfig,
    origin: (f32, f32),
    credits: u32,
    points: Vec<DiamondPoint>,
    viewport: Rect,
    arriving: HashSet<PointKey>,
    departing: HashMap<PointKey, Color>,
    shown: HashMap<PointKey, Color>,
    last_vote: i32,
    gate: EpochGate,
    registration: Registration,
    subscription: Subscription,
}

impl DiamondSurface {
    /// Mounts the diamond for question `id` with its viewport's top-left
    /// corner at `origin`.
    #[must_use]
    pub fn mount(
        id: QuestionId,
        config: DiamondConfig,
        bus: &AnimationBus,
        registry: &ElementRegistry,
        origin: (f32, f32),
        snapshot: &LedgerSnapshot,
    ) -> Self {
        let last_vote = snapshot.question(&id).map_or(0, |q| q.vote());
        if snapshot.question(&id).is_none() {
            tracing::warn!(%id, "diamond mounted for unknown question");
        }

        let mut surface = Self {
            id,
            config,
            origin,
            credits: 0,
            points: Vec::new(),
            viewport: Rect::ZERO,
            arriving: HashSet::new(),
            departing: HashMap::new(),
            shown: HashMap::new(),
            last_vote,
            gate: EpochGate::new(snapshot.epoch),
            registration: registry.registration(),
            subscription: bus.subscribe(Topics::FLIGHT_START | Topics::DIAMOND_SETTLE | Topics::RESET),
        };
        surface.layout(snapshot.credits);
        surface
    }

    /// Question this diamond shows.
    #[must_use]
    pub const fn id(&self) -> &QuestionId {
        &self.id
    }

    /// Local bounding box.
    #[must_use]
    pub const fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Moves the surface and re-registers its points.
    pub fn move_to(&mut self, origin: (f32, f32)) {
        self.origin = origin;
        self.layout(self.credits);
    }

    /// Returns true while a credit is flying into `(level, unit)`.
    #[must_use]
    pub fn is_arriving(&self, level: u32, unit: u32) -> bool {
        self.arriving.contains(&(level, unit))
    }

    /// Returns the colour held by a point a credit is leaving.
    #[must_use]
    pub fn departing_color(&self, level: u32, unit: u32) -> Option<Color> {
        self.departing.get(&(level, unit)).copied()
    }

    /// Builds the view for `snapshot` and pushes the fills to the registry.
    pub fn view(&mut self, snapshot: &LedgerSnapshot) -> DiamondView {
        if snapshot.credits != self.credits {
            self.layout(snapshot.credits);
        }
        let vote = snapshot.question(&self.id).map_or(0, |q| q.vote());
        let vote_level = vote.unsigned_abs();
        let vote_color = self.config.vote_color(vote);
        self.last_vote = vote;

        let mut points = Vec::with_capacity(self.points.len());
        for point in &self.points {
            let key = (point.level, point.index);
            let fill = if let Some(held) = self.departing.get(&key) {
                *held
            } else if self.arriving.contains(&key) || point.level > vote_level {
                self.config.neutral_color
            } else {
                vote_color
            };

            self.shown.insert(key, fill);
            self.registration.set_fill(&self.element_key(point), fill);
            points.push(DiamondPointView {
                level: point.level,
                unit: point.index,
                circle: point.circle,
                fill,
            });
        }

        DiamondView {
            id: self.id.clone(),
            viewport: self.viewport,
            points,
            vote_level,
            shine_active: vote_level == 0,
        }
    }

    fn element_key(&self, point: &DiamondPoint) -> ElementKey {
        ElementKey::DiamondPoint {
            diamond: self.id.clone(),
            level: point.level,
            unit: point.index,
        }
    }

    fn layout(&mut self, credits: u32) {
        self.credits = credits;
        self.points = diamond_layout(&self.id, credits, self.config.circle_radius);
        self.viewport = bounding_viewport(self.points.iter().map(|p| &p.circle));
        self.shown.clear();

        let (dx, dy) = (self.origin.0 - self.viewport.x, self.origin.1 - self.viewport.y);
        self.registration.clear();
        for point in &self.points {
            self.registration.insert(
                self.element_key(point),
                ElementHandle::new(point.circle.translate(dx, dy))
                    .with_fill(self.config.neutral_color),
            );
        }
        tracing::debug!(id = %self.id, points = self.points.len(), "diamond laid out");
    }
}

impl VisualSurface for DiamondSurface {
    fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    fn handle(&mut self, event: &AnimEvent, _now: Duration) {
        if !self.gate.admit(event) {
            return;
        }
        if let AnimEvent::Reset { .. } = event {
            self.arriving.clear();
            self.departing.clear();
            return;
        }
        let Some(unit) = event.unit() else {
            return;
        };
        if unit.target != self.id {
            return;
        }
        let key = (unit.level, unit.unit_index);

        match (event, unit.direction) {
            (AnimEvent::FlightStart(_), Direction::ToDiamond) => {
                self.arriving.insert(key);
            }
            (AnimEvent::FlightStart(_), Direction::ToPool) => {
                let held = self
                    .shown
                    .get(&key)
                    .copied()
                    .unwrap_or_else(|| self.config.vote_color(self.last_vote));
                self.departing.insert(key, held);
            }
            (AnimEvent::DiamondSettle(_), Direction::ToDiamond) => {
                self.arriving.remove(&key);
            }
            (AnimEvent::DiamondSettle(_), Direction::ToPool) => {
                self.departing.remove(&key);
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for DiamondSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiamondSurface")
            .field("id", &self.id)
            .field("points", &self.points.len())
            .field("arriving", &self.arriving.len())
            .field("departing", &self.departing.len())
            .finish_non_exhaustive()
    }
}
