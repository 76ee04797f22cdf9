//! Easing curves and tweened values.
//!
//! Flights use cubic ease-out: fast departure, soft landing. The liquid
//! pool core uses the exponential snap so it follows credit counts without
//! lagging behind the flights.

use std::time::Duration;

/// Easing curve applied to linear progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// `1 - (1 - t)³`.
    #[default]
    CubicOut,
    /// `1 - 2^(-10t)`, snapped to 1 at the end.
    ExponentialOut,
}

impl Easing {
    /// Maps progress `t` (clamped to `[0, 1]`) onto the curve.
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::CubicOut => 1.0 - (1.0 - t).powi(3),
            Self::ExponentialOut if t >= 1.0 => 1.0,
            Self::ExponentialOut => 1.0 - 2.0_f32.powf(-10.0 * t),
        }
    }
}

/// Linear progress through a delayed window, clamped to `[0, 1]`.
///
/// Zero-length windows are complete as soon as the delay has passed.
#[must_use]
pub fn window_progress(elapsed: Duration, delay: Duration, duration: Duration) -> f32 {
    let Some(active) = elapsed.checked_sub(delay) else {
        return 0.0;
    };
    if duration.is_zero() {
        return 1.0;
    }
    (active.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0)
}

/// Fade-in over the first 10% of a flight.
#[inline]
#[must_use]
pub fn flight_opacity(t: f32) -> f32 {
    if t < 0.1 {
        t / 0.1
    } else {
        1.0
    }
}

/// Grow from 0.8 to 1.0 over the first 20% of a flight.
#[inline]
#[must_use]
pub fn flight_scale(t: f32) -> f32 {
    if t < 0.2 {
        0.8 + 0.2 * (t / 0.2)
    } else {
        1.0
    }
}

/// A value easing between two endpoints on the frame clock.
///
/// Nothing is stepped per frame: the value is a function of `now`, so a
/// skipped frame costs nothing and two reads at the same instant agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    from: f32,
    to: f32,
    since: Duration,
    span: Duration,
    easing: Easing,
}

impl Tween {
    /// A tween resting at `value`; later moves take `span`.
    #[must_use]
    pub const fn new(value: f32, easing: Easing, span: Duration) -> Self {
        Self {
            from: value,
            to: value,
            since: Duration::ZERO,
            span,
            easing,
        }
    }

    /// Value at `now`.
    #[must_use]
    pub fn value_at(&self, now: Duration) -> f32 {
        let t = window_progress(now, self.since, self.span);
        if t >= 1.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * self.easing.apply(t)
    }

    /// Starts moving towards `to` from wherever the tween is at `now`.
    ///
    /// Repeating the current goal keeps the running motion.
    pub fn retarget(&mut self, to: f32, now: Duration) {
        if (to - self.to).abs() <= 1e-4 {
            return;
        }
        self.from = self.value_at(now);
        self.to = to;
        self.since = now;
    }

    /// Jumps to `value` with no motion.
    pub fn snap(&mut self, value: f32) {
        self.from = value;
        self.to = value;
        self.since = Duration::ZERO;
    }
}
