//! # Questions
//!
//! A question is a typed core record (`id`, `question`, `vote`) plus an opaque
//! metadata table holding every other field the host supplied. Metadata is
//! never interpreted, only carried along.

use std::collections::BTreeMap;

use quadra_shared::QuestionId;
use serde::{Deserialize, Serialize};

/// Returns the quadratic cost of a vote count: `|vote|²`.
#[inline]
#[must_use]
pub const fn quadratic_cost(vote: i64) -> u64 {
    let magnitude = vote.unsigned_abs();
    magnitude.saturating_mul(magnitude)
}

/// A votable item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the session.
    pub id: QuestionId,
    /// Display text.
    #[serde(default)]
    pub question: String,
    /// Current vote count (positive or negative).
    vote: i32,
    /// Up-vote would overspend (derived).
    #[serde(skip)]
    is_disabled_up: bool,
    /// Down-vote would overspend (derived).
    #[serde(skip)]
    is_disabled_down: bool,
    /// Every extra field from the input record, preserved verbatim.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, toml::Value>,
}

impl Question {
    /// Creates a question with no votes.
    #[must_use]
    pub fn new(id: impl Into<QuestionId>, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            vote: 0,
            is_disabled_up: false,
            is_disabled_down: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Sets the initial vote count.
    #[must_use]
    pub fn with_vote(mut self, vote: i32) -> Self {
        self.vote = vote;
        self
    }

    /// Attaches an opaque metadata field.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Current vote count.
    #[inline]
    #[must_use]
    pub const fn vote(&self) -> i32 {
        self.vote
    }

    /// Absolute vote level (diamond level).
    #[inline]
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.vote.unsigned_abs()
    }

    /// Credits spent on this question.
    #[inline]
    #[must_use]
    pub const fn cost(&self) -> u64 {
        quadratic_cost(self.vote as i64)
    }

    /// Whether voting up would exceed the budget.
    #[inline]
    #[must_use]
    pub const fn is_disabled_up(&self) -> bool {
        self.is_disabled_up
    }

    /// Whether voting down would exceed the budget.
    #[inline]
    #[must_use]
    pub const fn is_disabled_down(&self) -> bool {
        self.is_disabled_down
    }

    pub(crate) fn set_vote(&mut self, vote: i32) {
        self.vote = vote;
    }

    pub(crate) fn set_disabled(&mut self, up: bool, down: bool) {
        self.is_disabled_up = up;
        self.is_disabled_down = down;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_cost() {
        assert_eq!(quadratic_cost(0), 0);
        assert_eq!(quadratic_cost(3), 9);
        assert_eq!(quadratic_cost(-4), 16);
        assert_eq!(quadratic_cost(i64::MIN), u64::MAX);
    }

    #[test]
    fn test_extra_fields_land_in_metadata() {
        let q: Question = toml::from_str(
            r#"
            id = 0
            question = "Should the city invest in public transport?"
            vote = 2
            qualquercoisa = 2
            category = "transit"
            "#,
        )
        .unwrap();

        assert_eq!(q.vote(), 2);
        assert_eq!(q.cost(), 4);
        assert_eq!(q.metadata.get("qualquercoisa"), Some(&toml::Value::Integer(2)));
        assert_eq!(
            q.metadata.get("category").and_then(toml::Value::as_str),
            Some("transit")
        );
        assert!(!q.metadata.contains_key("vote"));
    }

    #[test]
    fn test_vote_field_is_required() {
        let parsed: Result<Question, _> = toml::from_str("id = 1");
        assert!(parsed.is_err());
    }
}
