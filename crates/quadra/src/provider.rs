//! # Vote Provider
//!
//! Owns the shared bus and element registry for a widget tree and, while
//! mounted, one voting session: the ledger plus the choreographer that
//! animates its launches.
//!
//! ```text
//! VoteProvider::new()  ──mount(config)──>  mounted  ──unmount()──>  unmounted
//!        │                                    │                        │
//!   bus, registry                   ledger + choreographer     ledger calls fail
//!                                                              with NotMounted
//! ```
//!
//! Surfaces are mounted through the provider so they share its bus and
//! registry, but the host owns them and decides when to pump and draw them.
//! Surfaces can outlive a session: retiring one publishes a `Reset` one
//! epoch past it, and the next ledger starts at that epoch, so their gates
//! admit the new session and drop whatever the old one left in flight.

use std::time::{Duration, Instant};

use quadra_ledger::{Ledger, LedgerSnapshot, VoteOutcome};
use quadra_shared::{AnimEvent, AnimationBus, QuestionId};
use quadra_ui::{
    Choreographer, DiamondSurface, ElementRegistry, FlightSprite, LiquidPoolSurface, PoolSurface,
};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::frame::{FrameStats, FrameStatsAccumulator};

/// One mounted voting session.
struct Session {
    config: SessionConfig,
    ledger: Ledger,
    choreographer: Choreographer,
}

/// Session provider for one widget tree.
pub struct VoteProvider {
    bus: AnimationBus,
    registry: ElementRegistry,
    session: Option<Session>,
    /// Epoch the next mounted ledger starts at.
    epoch: u64,
    frame_count: u64,
    stats: FrameStatsAccumulator,
}

impl VoteProvider {
    /// Creates an unmounted provider with the default bus capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bus(AnimationBus::default())
    }

    /// Creates an unmounted provider whose subscribers buffer up to
    /// `capacity` events each.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_bus(AnimationBus::new(capacity))
    }

    /// Creates an unmounted provider on an existing bus.
    #[must_use]
    pub fn with_bus(bus: AnimationBus) -> Self {
        Self {
            bus,
            registry: ElementRegistry::new(),
            session: None,
            epoch: 0,
            frame_count: 0,
            stats: FrameStatsAccumulator::new(),
        }
    }

    /// Creates a provider sized by `config.bus_capacity` and mounts it.
    ///
    /// # Errors
    ///
    /// Same as [`VoteProvider::mount`].
    pub fn from_config(config: SessionConfig) -> SessionResult<Self> {
        let mut provider = Self::with_capacity(config.bus_capacity);
        provider.mount(config)?;
        Ok(provider)
    }

    /// Mounts a session, replacing any previous one.
    ///
    /// `config.bus_capacity` only applies to providers built with
    /// [`VoteProvider::from_config`]; an existing bus keeps its capacity.
    /// A rejected config leaves the current session mounted.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Ledger`] if the budget is out of range, a
    /// question id repeats or the initial votes overspend.
    pub fn mount(&mut self, config: SessionConfig) -> SessionResult<()> {
        let ledger = config.ledger().into_ledger()?;
        let replaced = self.retire();
        let ledger = ledger
            .with_epoch(self.epoch)
            .with_publisher(self.bus.publisher());
        let choreographer =
            Choreographer::new(config.choreography.clone(), &self.bus, self.registry.clone());

        tracing::info!(
            credits = ledger.credits(),
            questions = ledger.questions().len(),
            available = ledger.available_credits(),
            epoch = ledger.epoch(),
            replaced,
            "voting session mounted"
        );
        self.session = Some(Session {
            config,
            ledger,
            choreographer,
        });
        Ok(())
    }

    /// Drops the session. Returns false if none was mounted.
    ///
    /// Surfaces still mounted get a `Reset` and clear their in-flight state.
    pub fn unmount(&mut self) -> bool {
        let was_mounted = self.retire();
        if was_mounted {
            tracing::info!(epoch = self.epoch, "voting session unmounted");
        }
        was_mounted
    }

    /// Drops the current session and resets its surfaces one epoch past it.
    fn retire(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        self.epoch = session.ledger.epoch() + 1;
        let delivered = self.bus.publish(&AnimEvent::Reset { epoch: self.epoch });
        tracing::debug!(epoch = self.epoch, delivered, "session retired");
        true
    }

    /// Returns true while a session is mounted.
    #[inline]
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.session.is_some()
    }

    /// The bus every surface of this tree subscribes to.
    #[must_use]
    pub const fn bus(&self) -> &AnimationBus {
        &self.bus
    }

    /// The registry every surface of this tree registers in.
    #[must_use]
    pub const fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Returns the current frame count.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Returns the accumulated statistics.
    #[must_use]
    pub const fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }

    /// The mounted session's configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session.
    pub fn config(&self) -> SessionResult<&SessionConfig> {
        Ok(&self.session()?.config)
    }

    /// The mounted ledger.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session.
    pub fn ledger(&self) -> SessionResult<&Ledger> {
        Ok(&self.session()?.ledger)
    }

    /// The mounted choreographer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session.
    pub fn choreographer(&self) -> SessionResult<&Choreographer> {
        Ok(&self.session()?.choreographer)
    }

    /// Snapshot of the ledger for surfaces.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session.
    pub fn snapshot(&self) -> SessionResult<LedgerSnapshot> {
        Ok(self.session()?.ledger.snapshot())
    }

    /// Changes the vote on `id` by `delta`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session. A declined
    /// vote is not an error.
    pub fn vote(&mut self, id: &QuestionId, delta: i32) -> SessionResult<VoteOutcome> {
        Ok(self.session_mut()?.ledger.vote(id, delta))
    }

    /// Returns true if `id` could move to `potential_vote`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session.
    pub fn can_vote(&self, id: &QuestionId, potential_vote: i64) -> SessionResult<bool> {
        Ok(self.session()?.ledger.can_vote(id, potential_vote))
    }

    /// Zeroes every vote and starts a new epoch.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session.
    pub fn reset(&mut self) -> SessionResult<()> {
        self.session_mut()?.ledger.reset();
        Ok(())
    }

    /// Changes the budget.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session, or
    /// [`SessionError::Ledger`] if the new budget is rejected.
    pub fn set_credits(&mut self, credits: u32) -> SessionResult<()> {
        self.session_mut()?.ledger.set_credits(credits)?;
        Ok(())
    }

    /// Advances the choreography to `now`.
    ///
    /// Call once per frame before pumping surfaces.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session.
    pub fn frame(&mut self, now: Duration) -> SessionResult<FrameStats> {
        let frame = self.frame_count;
        let session = self.session.as_mut().ok_or(SessionError::NotMounted)?;

        let start = Instant::now();
        let events_published = session.choreographer.tick(now);
        let tick_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        let stats = FrameStats {
            frame,
            now,
            events_published,
            flights_in_air: session.choreographer.flights().len(),
            events_pending: session.choreographer.pending_events(),
            tick_us,
        };
        if events_published > 0 {
            tracing::trace!(frame, events_published, "frame published events");
        }

        self.frame_count += 1;
        self.stats.record(stats);
        Ok(stats)
    }

    /// Flight sprites to draw at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session.
    pub fn sprites(&self, now: Duration) -> SessionResult<Vec<FlightSprite>> {
        Ok(self.session()?.choreographer.sprites(now))
    }

    /// Mounts a pool grid with the session's pool config.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session.
    pub fn mount_pool(&self, origin: (f32, f32)) -> SessionResult<PoolSurface> {
        let session = self.session()?;
        Ok(PoolSurface::mount(
            session.config.pool.clone(),
            &self.bus,
            &self.registry,
            origin,
            &session.ledger.snapshot(),
        ))
    }

    /// Mounts the diamond for question `id` with the session's diamond config.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session.
    pub fn mount_diamond(&self, id: QuestionId, origin: (f32, f32)) -> SessionResult<DiamondSurface> {
        let session = self.session()?;
        Ok(DiamondSurface::mount(
            id,
            session.config.diamond.clone(),
            &self.bus,
            &self.registry,
            origin,
            &session.ledger.snapshot(),
        ))
    }

    /// Mounts a liquid pool with the session's liquid config and timing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotMounted`] outside a session.
    pub fn mount_liquid(&self, origin: (f32, f32)) -> SessionResult<LiquidPoolSurface> {
        let session = self.session()?;
        Ok(LiquidPoolSurface::mount(
            session.config.liquid.clone(),
            &session.config.choreography,
            &self.bus,
            &self.registry,
            origin,
            &session.ledger.snapshot(),
        ))
    }

    fn session(&self) -> SessionResult<&Session> {
        self.session.as_ref().ok_or(SessionError::NotMounted)
    }

    fn session_mut(&mut self) -> SessionResult<&mut Session> {
        self.session.as_mut().ok_or(SessionError::NotMounted)
    }
}

impl Default for VoteProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteProvider")
            .field("mounted", &self.is_mounted())
            .field("epoch", &self.epoch)
            .field("frame_count", &self.frame_count)
            .field("subscribers", &self.bus.subscriber_count())
            .field("elements", &self.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadra_ledger::{LedgerError, Question};

    fn config() -> SessionConfig {
        SessionConfig::new(100, vec![Question::new(0, "a"), Question::new(1, "b")])
    }

    #[test]
    fn test_unmounted_access_fails() {
        let mut provider = VoteProvider::new();
        assert!(!provider.is_mounted());
        assert!(matches!(provider.ledger(), Err(SessionError::NotMounted)));
        assert!(matches!(
            provider.vote(&QuestionId::Int(0), 1),
            Err(SessionError::NotMounted)
        ));
        assert!(matches!(provider.reset(), Err(SessionError::NotMounted)));
        assert!(matches!(
            provider.frame(Duration::ZERO),
            Err(SessionError::NotMounted)
        ));
        assert!(provider.mount_pool((0.0, 0.0)).is_err());
    }

    #[test]
    fn test_mount_and_unmount() {
        let mut provider = VoteProvider::from_config(config()).unwrap();
        assert!(provider.is_mounted());
        assert_eq!(provider.ledger().unwrap().available_credits(), 100);

        assert!(provider.unmount());
        assert!(!provider.unmount());
        assert!(matches!(provider.snapshot(), Err(SessionError::NotMounted)));
    }

    #[test]
    fn test_mount_rejects_bad_budget() {
        let mut provider = VoteProvider::new();
        let err = provider
            .mount(SessionConfig::new(3, vec![Question::new(0, "a")]))
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Ledger(LedgerError::CreditsTooLow { credits: 3, .. })
        ));
        assert!(!provider.is_mounted());
    }

    #[test]
    fn test_vote_goes_through_the_ledger() {
        let mut provider = VoteProvider::from_config(config()).unwrap();
        let outcome = provider.vote(&QuestionId::Int(0), 2).unwrap();
        assert!(outcome.is_committed());
        assert_eq!(provider.snapshot().unwrap().available_credits, 96);
        assert!(provider.can_vote(&QuestionId::Int(1), 9).unwrap());
        assert!(!provider.can_vote(&QuestionId::Int(1), 10).unwrap());

        provider.reset().unwrap();
        let snapshot = provider.snapshot().unwrap();
        assert_eq!(snapshot.available_credits, 100);
        assert_eq!(snapshot.epoch, 1);
    }

    #[test]
    fn test_remount_continues_the_epoch() {
        let mut provider = VoteProvider::from_config(config()).unwrap();
        let resets = provider.bus().subscribe(quadra_shared::Topics::RESET);
        provider.reset().unwrap();
        provider.reset().unwrap();

        provider.mount(config()).unwrap();
        assert_eq!(provider.snapshot().unwrap().epoch, 3);

        assert!(provider.unmount());
        provider.mount(config()).unwrap();
        assert_eq!(provider.snapshot().unwrap().epoch, 4);

        let epochs: Vec<u64> = resets.drain().iter().map(AnimEvent::epoch).collect();
        assert_eq!(epochs, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_rejected_mount_keeps_the_session() {
        let mut provider = VoteProvider::from_config(config()).unwrap();
        provider.vote(&QuestionId::Int(0), 1).unwrap();

        assert!(provider
            .mount(SessionConfig::new(3, vec![Question::new(0, "a")]))
            .is_err());
        assert_eq!(provider.snapshot().unwrap().available_credits, 99);
        assert_eq!(provider.snapshot().unwrap().epoch, 0);
    }

    #[test]
    fn test_frame_counts_and_records() {
        let mut provider = VoteProvider::from_config(config()).unwrap();
        let first = provider.frame(Duration::ZERO).unwrap();
        let second = provider.frame(Duration::from_millis(16)).unwrap();

        assert_eq!(first.frame, 0);
        assert_eq!(second.frame, 1);
        assert!(!second.is_animating());
        assert_eq!(provider.frame_count(), 2);
        assert_eq!(provider.stats().frames_recorded, 2);
    }

    #[test]
    fn test_surfaces_share_the_registry() {
        let provider = VoteProvider::from_config(config()).unwrap();
        let pool = provider.mount_pool((0.0, 0.0)).unwrap();
        let diamond = provider.mount_diamond(QuestionId::Int(0), (200.0, 0.0)).unwrap();

        assert_eq!(provider.registry().len(), 200);
        drop(pool);
        assert_eq!(provider.registry().len(), 100);
        drop(diamond);
        assert!(provider.registry().is_empty());
    }
}
