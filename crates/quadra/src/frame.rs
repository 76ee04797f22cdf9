//! # Frame Statistics
//!
//! The host drives the engine once per rendered frame:
//!
//! ```text
//! Frame N (now):
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. INPUT                                                            │
//! │    └─ provider.vote() / provider.reset()  → Launch / Reset on bus   │
//! │                                                                     │
//! │ 2. CHOREOGRAPHY (provider.frame(now))                               │
//! │    ├─ Plan flights for new launches, publish FlightStart            │
//! │    └─ Publish every settle / end event whose time has come          │
//! │                                                                     │
//! │ 3. SURFACES                                                         │
//! │    └─ pump(now), update(snapshot, now)                              │
//! │                                                                     │
//! │ 4. RENDER                                                           │
//! │    └─ view models + provider.sprites(now)                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

/// Target frame time for 60 FPS.
pub const TARGET_FRAME_TIME: Duration = Duration::from_micros(16_666);

/// Statistics for one choreography step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number.
    pub frame: u64,
    /// Clock passed to the frame.
    pub now: Duration,
    /// Events the choreographer published.
    pub events_published: usize,
    /// Flights in the air after the step.
    pub flights_in_air: usize,
    /// Scheduled events still pending after the step.
    pub events_pending: usize,
    /// Wall time spent in the step, in microseconds.
    pub tick_us: u64,
}

impl FrameStats {
    /// Returns true while any flight is drawn or any event is pending.
    #[inline]
    #[must_use]
    pub const fn is_animating(&self) -> bool {
        self.flights_in_air > 0 || self.events_pending > 0
    }
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Frames with something in the air.
    pub frames_animating: u64,
    /// Sum of events published.
    pub events_published_sum: u64,
    /// Most flights seen at once.
    pub peak_flights: usize,
    /// Sum of step times.
    pub tick_us_sum: u64,
    /// Slowest step.
    pub max_tick_us: u64,
    /// Steps that took longer than a whole frame.
    pub ticks_over_budget: u64,
}

impl FrameStatsAccumulator {
    /// Creates a new accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames_recorded: 0,
            frames_animating: 0,
            events_published_sum: 0,
            peak_flights: 0,
            tick_us_sum: 0,
            max_tick_us: 0,
            ticks_over_budget: 0,
        }
    }

    /// Records a frame's statistics.
    pub fn record(&mut self, stats: FrameStats) {
        self.frames_recorded += 1;
        if stats.is_animating() {
            self.frames_animating += 1;
        }
        self.events_published_sum += stats.events_published as u64;
        self.peak_flights = self.peak_flights.max(stats.flights_in_air);
        self.tick_us_sum += stats.tick_us;
        self.max_tick_us = self.max_tick_us.max(stats.tick_us);

        if u128::from(stats.tick_us) > TARGET_FRAME_TIME.as_micros() {
            self.ticks_over_budget += 1;
            tracing::warn!(
                frame = stats.frame,
                tick_us = stats.tick_us,
                "choreography step exceeded the frame budget"
            );
        }
    }

    /// Average step time in microseconds.
    #[must_use]
    pub fn avg_tick_us(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let avg = self.tick_us_sum as f64 / self.frames_recorded as f64;
        avg
    }

    /// Logs a summary at `info` level.
    pub fn log_summary(&self) {
        tracing::info!(
            frames = self.frames_recorded,
            animating = self.frames_animating,
            events = self.events_published_sum,
            peak_flights = self.peak_flights,
            avg_tick_us = self.avg_tick_us(),
            max_tick_us = self.max_tick_us,
            over_budget = self.ticks_over_budget,
            "frame statistics"
        );
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
