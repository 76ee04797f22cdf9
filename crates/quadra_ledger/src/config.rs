//! # Ledger Configuration
//!
//! A budget plus the question list, loaded once at mount.
//!
//! ```toml
//! credits = 100
//!
//! [[questions]]
//! id = 0
//! question = "Fund the new tram line?"
//! vote = 0
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::Ledger;
use crate::question::Question;

/// Default budget when none is configured.
const DEFAULT_CREDITS: u32 = 100;

const fn default_credits() -> u32 {
    DEFAULT_CREDITS
}

/// Serializable ledger setup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Total budget.
    #[serde(default = "default_credits")]
    pub credits: u32,
    /// Questions in display order.
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            credits: DEFAULT_CREDITS,
            questions: Vec::new(),
        }
    }
}

impl LedgerConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidConfig`] if the document is malformed or
    /// a question lacks its `id` or `vote`.
    pub fn from_toml_str(source: &str) -> LedgerResult<Self> {
        toml::from_str(source).map_err(|e| LedgerError::InvalidConfig(e.to_string()))
    }

    /// Builds the ledger this config describes.
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::new`].
    pub fn into_ledger(self) -> LedgerResult<Ledger> {
        Ledger::new(self.credits, self.questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadra_shared::QuestionId;

    const SAMPLE: &str = r#"
        credits = 49

        [[questions]]
        id = 0
        question = "Fund the new tram line?"
        vote = 3

        [[questions]]
        id = "parks"
        question = "More parks?"
        vote = -2
        owner = "council"
    "#;

    #[test]
    fn test_parse_and_build() {
        let config = LedgerConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.credits, 49);
        assert_eq!(config.questions.len(), 2);

        let ledger = config.into_ledger().unwrap();
        assert_eq!(ledger.available_credits(), 49 - 9 - 4);

        let parks = ledger.question(&QuestionId::from("parks")).unwrap();
        assert_eq!(parks.vote(), -2);
        assert!(parks.metadata.contains_key("owner"));
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn test_missing_vote_is_invalid() {
        let err = LedgerConfig::from_toml_str("[[questions]]\nid = 1\n").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfig(_)));
    }

    #[test]
    fn test_out_of_range_budget_fails_on_build() {
        let config = LedgerConfig {
            credits: 2,
            questions: Vec::new(),
        };
        assert!(matches!(
            config.into_ledger(),
            Err(LedgerError::CreditsTooLow { .. })
        ));
    }
}
