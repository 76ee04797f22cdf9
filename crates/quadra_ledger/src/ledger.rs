//! # Credit Ledger
//!
//! Holds the questions and the credit budget and enforces the quadratic-cost
//! invariant.
//!
//! ## The Vote Pipeline
//!
//! ```text
//! vote(id, delta)
//!   1. Simulate: cost of every question, target replaced by vote + delta
//!   2. Admit:    simulated ≤ credits, otherwise silent no-op
//!   3. Commit:   store vote, recompute up/down flags, available = credits - simulated
//!   4. Launch:   publish a Launch if the absolute level moved with the cost
//! ```
//!
//! Declined votes change nothing and publish nothing. Hosts are expected to
//! disable buttons through [`Question::is_disabled_up`] and
//! [`Question::is_disabled_down`]; the ledger re-validates regardless.

use std::collections::HashMap;

use quadra_shared::{AnimEvent, Direction, EventPublisher, Launch, QuestionId};

use crate::error::{LedgerError, LedgerResult};
use crate::question::{quadratic_cost, Question};

/// Smallest accepted budget.
pub const MIN_CREDITS: u32 = 4;

/// Largest accepted budget (a 15-level diamond).
pub const MAX_CREDITS: u32 = 225;

/// Why a vote was declined. Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decline {
    /// No question has this id.
    UnknownQuestion,
    /// The delta was zero.
    ZeroDelta,
    /// Committing would overspend the budget.
    OverBudget {
        /// Cost the ledger would have after the vote.
        simulated_cost: u64,
        /// Budget.
        credits: u32,
    },
}

/// Result of a [`Ledger::vote`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum VoteOutcome {
    /// The vote was stored.
    Committed {
        /// New vote count of the target question.
        vote: i32,
        /// Credits left after the vote.
        available_credits: u32,
        /// Launch published for this vote, if any.
        launch: Option<Launch>,
    },
    /// Nothing changed.
    Declined(Decline),
}

impl VoteOutcome {
    /// Returns true if the vote was stored.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Read-only copy of the ledger state for renderers.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerSnapshot {
    /// Questions in display order.
    pub questions: Vec<Question>,
    /// Total budget.
    pub credits: u32,
    /// Unallocated credits.
    pub available_credits: u32,
    /// Reset generation.
    pub epoch: u64,
}

impl LedgerSnapshot {
    /// Credits currently allocated.
    #[must_use]
    pub const fn used_credits(&self) -> u32 {
        self.credits - self.available_credits
    }

    /// Finds a question by id.
    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }
}

/// Decides whether a committed vote launches an animation.
///
/// `prev_cost`/`next_cost` are the ledger totals around the vote and
/// `prev_abs`/`next_abs` the target's absolute level. Credits move to the
/// diamond when both the cost and the level grow, back to the pool when both
/// shrink, and nothing moves otherwise (a `1 → -1` flip costs the same).
#[must_use]
pub fn launch_for(
    target: &QuestionId,
    prev_cost: u64,
    next_cost: u64,
    prev_abs: u32,
    next_abs: u32,
    epoch: u64,
) -> Option<Launch> {
    let (direction, pool_start, level, count) = if next_cost > prev_cost && next_abs > prev_abs {
        (Direction::ToDiamond, prev_cost, next_abs, next_cost - prev_cost)
    } else if next_cost < prev_cost && next_abs < prev_abs {
        (Direction::ToPool, next_cost, prev_abs, prev_cost - next_cost)
    } else {
        return None;
    };

    // Costs are bounded by MAX_CREDITS once admitted.
    Some(Launch {
        direction,
        pool_start_index: u32::try_from(pool_start).ok()?,
        target: target.clone(),
        level,
        count: u32::try_from(count).ok()?,
        color: None,
        epoch,
    })
}

fn validate_credits(credits: u32) -> LedgerResult<()> {
    if credits < MIN_CREDITS {
        return Err(LedgerError::CreditsTooLow {
            credits,
            min: MIN_CREDITS,
        });
    }
    if credits > MAX_CREDITS {
        return Err(LedgerError::CreditsTooHigh {
            credits,
            max: MAX_CREDITS,
        });
    }
    Ok(())
}

/// The credit ledger.
pub struct Ledger {
    /// Total budget, fixed per session unless re-budgeted.
    credits: u32,
    /// `credits - Σ vote²`.
    available: u32,
    /// Questions in host order.
    questions: Vec<Question>,
    /// Position of each question in `questions`.
    index: HashMap<QuestionId, usize>,
    /// Bumped by every reset.
    epoch: u64,
    /// Where launch and reset events go.
    publisher: Option<EventPublisher>,
}

impl Ledger {
    /// Creates a ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if `credits` is outside `[MIN_CREDITS, MAX_CREDITS]`,
    /// if two questions share an id, or if the initial votes already cost
    /// more than `credits`.
    pub fn new(credits: u32, questions: Vec<Question>) -> LedgerResult<Self> {
        validate_credits(credits)?;

        let mut index = HashMap::with_capacity(questions.len());
        for (position, question) in questions.iter().enumerate() {
            if index.insert(question.id.clone(), position).is_some() {
                return Err(LedgerError::DuplicateQuestion(question.id.clone()));
            }
        }

        let mut ledger = Self {
            credits,
            available: credits,
            questions,
            index,
            epoch: 0,
            publisher: None,
        };

        let cost = ledger.total_cost();
        if cost > u64::from(credits) {
            return Err(LedgerError::OverAllocated { cost, credits });
        }
        ledger.settle(cost);

        Ok(ledger)
    }

    /// Starts the ledger at reset generation `epoch`.
    ///
    /// Used when a session replaces another on the same bus, so surfaces
    /// that outlive the old ledger keep accepting the new one's events.
    #[must_use]
    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    /// Routes launch and reset events to a bus.
    #[must_use]
    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Total budget.
    #[inline]
    #[must_use]
    pub const fn credits(&self) -> u32 {
        self.credits
    }

    /// Unallocated credits.
    #[inline]
    #[must_use]
    pub const fn available_credits(&self) -> u32 {
        self.available
    }

    /// Allocated credits.
    #[inline]
    #[must_use]
    pub const fn used_credits(&self) -> u32 {
        self.credits - self.available
    }

    /// Reset generation, stamped on every published event.
    #[inline]
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Questions in host order.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Finds a question by id.
    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.index.get(id).map(|&i| &self.questions[i])
    }

    /// Returns an owned copy of the state.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            questions: self.questions.clone(),
            credits: self.credits,
            available_credits: self.available,
            epoch: self.epoch,
        }
    }

    /// Returns true if setting question `id` to `potential_vote` fits the budget.
    ///
    /// Unknown ids simulate the current state unchanged.
    #[must_use]
    pub fn can_vote(&self, id: &QuestionId, potential_vote: i64) -> bool {
        self.simulate(self.index.get(id).copied(), potential_vote) <= u64::from(self.credits)
    }

    /// Changes the budget.
    ///
    /// # Errors
    ///
    /// Returns an error if `credits` is out of range or smaller than what the
    /// current votes already cost. The ledger is left untouched on error.
    pub fn set_credits(&mut self, credits: u32) -> LedgerResult<()> {
        validate_credits(credits)?;

        let cost = self.total_cost();
        if cost > u64::from(credits) {
            return Err(LedgerError::OverAllocated { cost, credits });
        }

        self.credits = credits;
        self.settle(cost);
        Ok(())
    }

    /// Attempts to change the vote on question `id` by `delta`.
    ///
    /// Over-budget, zero-delta and unknown-id votes are declined without any
    /// state change or event.
    pub fn vote(&mut self, id: &QuestionId, delta: i32) -> VoteOutcome {
        let Some(&position) = self.index.get(id) else {
            tracing::debug!(%id, delta, "vote declined: unknown question");
            return VoteOutcome::Declined(Decline::UnknownQuestion);
        };
        if delta == 0 {
            tracing::debug!(%id, "vote declined: zero delta");
            return VoteOutcome::Declined(Decline::ZeroDelta);
        }

        let prev_vote = self.questions[position].vote();
        let potential = i64::from(prev_vote) + i64::from(delta);
        let simulated_cost = self.simulate(Some(position), potential);

        // An admitted vote satisfies potential² ≤ MAX_CREDITS, so it fits in i32.
        let next_vote = match i32::try_from(potential) {
            Ok(vote) if simulated_cost <= u64::from(self.credits) => vote,
            _ => {
                tracing::debug!(%id, delta, simulated_cost, "vote declined: over budget");
                return VoteOutcome::Declined(Decline::OverBudget {
                    simulated_cost,
                    credits: self.credits,
                });
            }
        };

        let prev_cost = u64::from(self.used_credits());
        self.questions[position].set_vote(next_vote);
        self.settle(simulated_cost);

        let launch = launch_for(
            id,
            prev_cost,
            simulated_cost,
            prev_vote.unsigned_abs(),
            next_vote.unsigned_abs(),
            self.epoch,
        );
        if let (Some(launch), Some(publisher)) = (&launch, &self.publisher) {
            publisher.publish(&AnimEvent::Launch(launch.clone()));
        }

        VoteOutcome::Committed {
            vote: next_vote,
            available_credits: self.available,
            launch,
        }
    }

    /// Zeroes every vote and starts a new epoch.
    pub fn reset(&mut self) {
        for question in &mut self.questions {
            question.set_vote(0);
            question.set_disabled(false, false);
        }
        self.available = self.credits;
        self.epoch += 1;

        tracing::info!(epoch = self.epoch, credits = self.credits, "ledger reset");
        if let Some(publisher) = &self.publisher {
            publisher.publish(&AnimEvent::Reset { epoch: self.epoch });
        }
    }

    /// Σ |vote|² over all questions.
    fn total_cost(&self) -> u64 {
        self.questions
            .iter()
            .map(Question::cost)
            .fold(0, u64::saturating_add)
    }

    /// Σ |vote|² with the question at `position` replaced by `potential`.
    fn simulate(&self, position: Option<usize>, potential: i64) -> u64 {
        self.questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                if Some(i) == position {
                    quadratic_cost(potential)
                } else {
                    q.cost()
                }
            })
            .fold(0, u64::saturating_add)
    }

    /// Stores the new total cost and recomputes every disabled flag.
    fn settle(&mut self, cost: u64) {
        let budget = u64::from(self.credits);
        // Callers only settle costs within budget.
        self.available = u32::try_from(budget.saturating_sub(cost)).unwrap_or(0);

        let flags: Vec<(bool, bool)> = self
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let others = cost - q.cost();
                let vote = i64::from(q.vote());
                (
                    others + quadratic_cost(vote + 1) > budget,
                    others + quadratic_cost(vote - 1) > budget,
                )
            })
            .collect();

        for (question, (up, down)) in self.questions.iter_mut().zip(flags) {
            question.set_disabled(up, down);
        }
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("credits", &self.credits)
            .field("available", &self.available)
            .field("questions", &self.questions.len())
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadra_shared::{AnimationBus, Topics};

    fn questions(n: i64) -> Vec<Question> {
        (0..n).map(|i| Question::new(i, format!("question {i}"))).collect()
    }

    fn id(n: i64) -> QuestionId {
        QuestionId::Int(n)
    }

    fn sum_of_squares(ledger: &Ledger) -> u64 {
        ledger.questions().iter().map(Question::cost).sum()
    }

    #[test]
    fn test_budget_bounds() {
        assert_eq!(
            Ledger::new(3, questions(1)).unwrap_err(),
            LedgerError::CreditsTooLow { credits: 3, min: 4 }
        );
        assert_eq!(
            Ledger::new(226, questions(1)).unwrap_err(),
            LedgerError::CreditsTooHigh {
                credits: 226,
                max: 225
            }
        );
        assert!(Ledger::new(4, questions(1)).is_ok());
        assert!(Ledger::new(225, questions(1)).is_ok());
    }

    #[test]
    fn test_initial_votes_are_charged() {
        let qs = questions(5).into_iter().map(|q| q.with_vote(2)).collect();
        let ledger = Ledger::new(100, qs).unwrap();

        assert_eq!(ledger.available_credits(), 100 - 5 * 4);
    }

    #[test]
    fn test_rejects_duplicates_and_over_allocation() {
        let dupes = vec![Question::new(1, "a"), Question::new(1, "b")];
        assert_eq!(
            Ledger::new(100, dupes).unwrap_err(),
            LedgerError::DuplicateQuestion(id(1))
        );

        let heavy = vec![Question::new(0, "a").with_vote(11)];
        assert_eq!(
            Ledger::new(100, heavy).unwrap_err(),
            LedgerError::OverAllocated {
                cost: 121,
                credits: 100
            }
        );
    }

    #[test]
    fn test_single_vote_scenario() {
        let mut ledger = Ledger::new(100, questions(5)).unwrap();
        let outcome = ledger.vote(&id(0), 1);

        assert!(outcome.is_committed());
        assert_eq!(ledger.available_credits(), 99);
        let q = ledger.question(&id(0)).unwrap();
        assert_eq!(q.vote(), 1);
        assert!(!q.is_disabled_up());
        assert!(!q.is_disabled_down());
    }

    #[test]
    fn test_full_budget_on_one_question() {
        let mut ledger = Ledger::new(100, questions(5)).unwrap();
        ledger.vote(&id(2), 10);

        assert_eq!(ledger.available_credits(), 0);
        let target = ledger.question(&id(2)).unwrap();
        assert!(target.is_disabled_up());
        assert!(!target.is_disabled_down());

        for other in ledger.questions().iter().filter(|q| q.id != id(2)) {
            assert!(other.is_disabled_up());
            assert!(other.is_disabled_down());
        }
    }

    #[test]
    fn test_over_budget_vote_is_silent_noop() {
        let bus = AnimationBus::new(16);
        let sub = bus.subscribe(Topics::ALL);
        let mut ledger = Ledger::new(100, questions(5))
            .unwrap()
            .with_publisher(bus.publisher());

        ledger.vote(&id(0), 10);
        let _ = sub.drain();
        let before = ledger.snapshot();

        let outcome = ledger.vote(&id(1), 1);

        assert_eq!(
            outcome,
            VoteOutcome::Declined(Decline::OverBudget {
                simulated_cost: 101,
                credits: 100
            })
        );
        assert_eq!(ledger.snapshot(), before);
        assert!(!sub.has_events());
    }

    #[test]
    fn test_five_vote_steps_fill_budget() {
        let mut ledger = Ledger::new(100, questions(5)).unwrap();
        for n in 0..5 {
            ledger.vote(&id(n), 5);
        }

        // 4 × 25 = 100, the fifth does not fit
        assert_eq!(ledger.available_credits(), 0);
        assert_eq!(ledger.question(&id(4)).unwrap().vote(), 0);
    }

    #[test]
    fn test_unknown_and_zero_votes_decline() {
        let mut ledger = Ledger::new(100, questions(2)).unwrap();

        assert_eq!(
            ledger.vote(&id(42), 1),
            VoteOutcome::Declined(Decline::UnknownQuestion)
        );
        assert_eq!(ledger.vote(&id(0), 0), VoteOutcome::Declined(Decline::ZeroDelta));
        assert_eq!(ledger.available_credits(), 100);
    }

    #[test]
    fn test_huge_delta_declines_without_overflow() {
        let mut ledger = Ledger::new(225, questions(1)).unwrap();

        assert!(!ledger.vote(&id(0), i32::MAX).is_committed());
        assert!(!ledger.vote(&id(0), i32::MIN).is_committed());
        assert_eq!(ledger.available_credits(), 225);
    }

    #[test]
    fn test_invariant_holds_over_vote_sequence() {
        for credits in [4, 9, 50, 100, 225] {
            let mut ledger = Ledger::new(credits, questions(4)).unwrap();
            let deltas = [1, 1, -1, 3, -2, 5, -7, 2, 1, 1, -3, 4, 9, -15];

            for (step, delta) in deltas.iter().enumerate() {
                ledger.vote(&id(step as i64 % 4), *delta);

                let spent = sum_of_squares(&ledger);
                assert!(spent <= u64::from(credits));
                assert_eq!(u64::from(ledger.available_credits()), u64::from(credits) - spent);
            }
        }
    }

    #[test]
    fn test_flags_match_definition() {
        let mut ledger = Ledger::new(50, questions(3)).unwrap();
        ledger.vote(&id(0), 4);
        ledger.vote(&id(1), -3);
        ledger.vote(&id(2), 1);

        let total = sum_of_squares(&ledger);
        for q in ledger.questions() {
            let others = total - q.cost();
            let vote = i64::from(q.vote());
            assert_eq!(q.is_disabled_up(), others + quadratic_cost(vote + 1) > 50);
            assert_eq!(q.is_disabled_down(), others + quadratic_cost(vote - 1) > 50);
        }
    }

    #[test]
    fn test_reset_restores_budget_and_bumps_epoch() {
        let bus = AnimationBus::new(16);
        let sub = bus.subscribe(Topics::RESET);
        let mut ledger = Ledger::new(100, questions(3))
            .unwrap()
            .with_publisher(bus.publisher());
        ledger.vote(&id(0), 10);

        ledger.reset();

        assert_eq!(ledger.available_credits(), 100);
        assert_eq!(ledger.epoch(), 1);
        for q in ledger.questions() {
            assert_eq!(q.vote(), 0);
            assert!(!q.is_disabled_up());
            assert!(!q.is_disabled_down());
        }
        assert_eq!(sub.try_recv(), Some(AnimEvent::Reset { epoch: 1 }));
    }

    #[test]
    fn test_with_epoch_continues_the_generation() {
        let bus = AnimationBus::new(16);
        let sub = bus.subscribe(Topics::LAUNCH | Topics::RESET);
        let mut ledger = Ledger::new(100, questions(2))
            .unwrap()
            .with_epoch(5)
            .with_publisher(bus.publisher());
        assert_eq!(ledger.epoch(), 5);
        assert_eq!(ledger.snapshot().epoch, 5);

        ledger.vote(&id(0), 1);
        let Some(AnimEvent::Launch(launch)) = sub.try_recv() else {
            panic!("expected a launch");
        };
        assert_eq!(launch.epoch, 5);

        ledger.reset();
        assert_eq!(sub.try_recv(), Some(AnimEvent::Reset { epoch: 6 }));
    }

    #[test]
    fn test_launch_to_diamond() {
        let bus = AnimationBus::new(16);
        let sub = bus.subscribe(Topics::LAUNCH);
        let mut ledger = Ledger::new(100, questions(2))
            .unwrap()
            .with_publisher(bus.publisher());
        ledger.vote(&id(1), 2);
        let _ = sub.drain();

        ledger.vote(&id(0), 2);

        let Some(AnimEvent::Launch(launch)) = sub.try_recv() else {
            panic!("expected a launch");
        };
        assert_eq!(launch.direction, Direction::ToDiamond);
        assert_eq!(launch.pool_start_index, 4);
        assert_eq!(launch.target, id(0));
        assert_eq!(launch.level, 2);
        assert_eq!(launch.count, 4);
        assert!(!sub.has_events());
    }

    #[test]
    fn test_launch_to_pool() {
        let mut ledger = Ledger::new(100, questions(1)).unwrap();
        ledger.vote(&id(0), -3);

        let VoteOutcome::Committed { launch, .. } = ledger.vote(&id(0), 1) else {
            panic!("expected commit");
        };
        let launch = launch.unwrap();

        assert_eq!(launch.direction, Direction::ToPool);
        assert_eq!(launch.pool_start_index, 4);
        assert_eq!(launch.level, 3);
        assert_eq!(launch.count, 5);
    }

    #[test]
    fn test_sign_flip_without_level_change_is_silent() {
        let bus = AnimationBus::new(16);
        let sub = bus.subscribe(Topics::LAUNCH);
        let mut ledger = Ledger::new(100, questions(1))
            .unwrap()
            .with_publisher(bus.publisher());
        ledger.vote(&id(0), 1);
        let _ = sub.drain();

        let outcome = ledger.vote(&id(0), -2);

        assert!(outcome.is_committed());
        assert_eq!(ledger.question(&id(0)).unwrap().vote(), -1);
        assert!(!sub.has_events());
    }

    #[test]
    fn test_launch_fires_once_per_level_change() {
        let bus = AnimationBus::new(64);
        let sub = bus.subscribe(Topics::LAUNCH);
        let mut ledger = Ledger::new(100, questions(1))
            .unwrap()
            .with_publisher(bus.publisher());

        for delta in [1, 1, 1, -1, -1, -1, -1] {
            ledger.vote(&id(0), delta);
        }

        assert_eq!(sub.drain().len(), 7);
    }

    #[test]
    fn test_launch_for_crossing_zero_with_bigger_magnitude() {
        // 1 → -3: cost 1 → 9, level 1 → 3
        let launch = launch_for(&id(0), 1, 9, 1, 3, 0).unwrap();
        assert_eq!(launch.direction, Direction::ToDiamond);
        assert_eq!(launch.count, 8);
        assert_eq!(launch.level, 3);

        assert!(launch_for(&id(0), 4, 4, 2, 2, 0).is_none());
    }

    #[test]
    fn test_set_credits() {
        let mut ledger = Ledger::new(100, questions(2)).unwrap();
        ledger.vote(&id(0), 5);

        assert!(ledger.set_credits(20).is_err());
        assert_eq!(ledger.credits(), 100);

        ledger.set_credits(30).unwrap();
        assert_eq!(ledger.available_credits(), 5);
        assert!(ledger.question(&id(0)).unwrap().is_disabled_up());
    }
}
