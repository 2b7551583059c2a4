//! Directive keyword classes.

use serde::{Deserialize, Serialize};

/// The two directive classes the grammar recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    /// Deferred work
    Todo,
    /// Known defect
    Fixme,
}

impl Keyword {
    pub const ALL: [Keyword; 2] = [Keyword::Todo, Keyword::Fixme];

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Todo => "todo",
            Keyword::Fixme => "fixme",
        }
    }

    /// Parse a keyword case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "todo" => Some(Keyword::Todo),
            "fixme" => Some(Keyword::Fixme),
            _ => None,
        }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Keyword::Todo => write!(f, "TODO"),
            Keyword::Fixme => write!(f, "FIXME"),
        }
    }
}
