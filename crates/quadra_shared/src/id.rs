//! Identifiers shared across the workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a question, unique within one voting session.
///
/// Config files may use either integers (`id = 3`) or strings (`id = "q-3"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionId {
    /// Numeric identifier.
    Int(i64),
    /// Textual identifier.
    Text(String),
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for QuestionId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for QuestionId {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for QuestionId {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for QuestionId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Which way a credit unit travels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// From the pool into a diamond (vote level grows).
    ToDiamond,
    /// From a diamond back into the pool (vote level shrinks).
    ToPool,
}

impl Direction {
    /// Returns the wire name used in event keys and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToDiamond => "toDiamond",
            Self::ToPool => "toPool",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        ids: Vec<QuestionId>,
    }

    #[test]
    fn test_question_id_accepts_ints_and_strings() {
        let parsed: Wrapper = toml::from_str(r#"ids = [3, "q-7"]"#).unwrap();

        assert_eq!(parsed.ids[0], QuestionId::Int(3));
        assert_eq!(parsed.ids[1], QuestionId::Text("q-7".to_owned()));
    }

    #[test]
    fn test_question_id_display() {
        assert_eq!(QuestionId::from(12).to_string(), "12");
        assert_eq!(QuestionId::from("transit").to_string(), "transit");
    }
}
