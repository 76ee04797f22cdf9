//! # Session Configuration
//!
//! Everything a provider needs to mount one session, loaded once from TOML.
//!
//! ```toml
//! credits = 100
//! bus_capacity = 4096
//!
//! [choreography]
//! flight_duration_ms = 650
//! stagger_ms = 60
//!
//! [liquid]
//! shape = "rect"
//!
//! [[questions]]
//! id = "tram"
//! question = "Fund the new tram line?"
//! vote = 0
//! ```
//!
//! Every table except `questions` may be omitted. Each question needs an `id`
//! and a `vote`; unknown fields are kept as metadata.

use std::path::Path;

use quadra_ledger::{LedgerConfig, Question};
use quadra_shared::DEFAULT_BUS_CAPACITY;
use quadra_ui::{ChoreographyConfig, DiamondConfig, LiquidPoolConfig, PoolConfig};
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

const fn default_credits() -> u32 {
    100
}

const fn default_bus_capacity() -> usize {
    DEFAULT_BUS_CAPACITY
}

/// Session setup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Total budget.
    #[serde(default = "default_credits")]
    pub credits: u32,
    /// Questions in display order.
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Flight timing.
    #[serde(default)]
    pub choreography: ChoreographyConfig,
    /// Events each subscriber can hold before new ones are dropped.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
    /// Pool grid appearance.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Diamond appearance.
    #[serde(default)]
    pub diamond: DiamondConfig,
    /// Liquid pool appearance.
    #[serde(default)]
    pub liquid: LiquidPoolConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credits: default_credits(),
            questions: Vec::new(),
            choreography: ChoreographyConfig::default(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
            pool: PoolConfig::default(),
            diamond: DiamondConfig::default(),
            liquid: LiquidPoolConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Creates a config with default appearance and timing.
    #[must_use]
    pub fn new(credits: u32, questions: Vec<Question>) -> Self {
        Self {
            credits,
            questions,
            ..Self::default()
        }
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if the document is malformed or a
    /// question lacks its `id` or `vote`.
    pub fn from_toml_str(source: &str) -> SessionResult<Self> {
        toml::from_str(source).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the file cannot be read, otherwise the
    /// same as [`SessionConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "session config loaded");
        Self::from_toml_str(&source)
    }

    /// The ledger part of this config.
    #[must_use]
    pub fn ledger(&self) -> LedgerConfig {
        LedgerConfig {
            credits: self.credits,
            questions: self.questions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadra_ui::LiquidShape;

    #[test]
    fn test_defaults_for_missing_tables() {
        let config = SessionConfig::from_toml_str(
            "credits = 49\n[[questions]]\nid = 1\nquestion = \"a\"\nvote = 0\n",
        )
        .unwrap();

        assert_eq!(config.credits, 49);
        assert_eq!(config.questions.len(), 1);
        assert_eq!(config.bus_capacity, DEFAULT_BUS_CAPACITY);
        assert_eq!(config.choreography, ChoreographyConfig::default());
        assert_eq!(config.liquid, LiquidPoolConfig::default());
    }

    #[test]
    fn test_nested_tables() {
        let config = SessionConfig::from_toml_str(
            r#"
            bus_capacity = 64

            [choreography]
            stagger_ms = 20

            [pool]
            columns = 10

            [liquid]
            shape = "rect"
            burst_count = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.credits, 100);
        assert_eq!(config.bus_capacity, 64);
        assert_eq!(config.choreography.stagger_ms, 20);
        assert_eq!(config.choreography.flight_duration_ms, 650);
        assert_eq!(config.pool.columns, 10);
        assert_eq!(config.liquid.shape, LiquidShape::Rect);
        assert_eq!(config.liquid.burst_count, 4);
    }

    #[test]
    fn test_question_without_vote_is_rejected() {
        let err = SessionConfig::from_toml_str("[[questions]]\nid = 1\n").unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SessionConfig::load("/nonexistent/quadra.toml").unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }
}
