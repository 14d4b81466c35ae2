//! ``src/composition/token.rs``
//!
//! Composition tokens and the default layouts. In config files tokens are
//! plain strings: `__title__`, `__sep__`, `__dynamic_filter__`, or a group.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TITLE_TOKEN: &str = "__title__";
pub const SEPARATOR_TOKEN: &str = "__sep__";
pub const DYNAMIC_TOKEN: &str = "__dynamic_filter__";

/// Named, ordered token sequences.
pub type Compositions = IndexMap<String, Vec<Token>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Token {
    /// Disabled title named after the composition.
    Title,
    /// Separator; consecutive ones collapse.
    Separator,
    /// Filterable groups picked by the runtime mode.
    Dynamic,
    /// A registry group, expanded in stored order.
    Group(String),
}

impl Token {
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        !matches!(self, Self::Group(_))
    }

    #[must_use]
    pub fn group_name(&self) -> Option<&str> {
        match self {
            Self::Group(name) => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for Token {
    fn from(raw: &str) -> Self {
        match raw {
            TITLE_TOKEN => Self::Title,
            SEPARATOR_TOKEN => Self::Separator,
            DYNAMIC_TOKEN => Self::Dynamic,
            group => Self::Group(group.to_string()),
        }
    }
}

impl From<String> for Token {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            TITLE_TOKEN | SEPARATOR_TOKEN | DYNAMIC_TOKEN => Self::from(raw.as_str()),
            _ => Self::Group(raw),
        }
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        match token {
            Token::Group(name) => name,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => f.write_str(TITLE_TOKEN),
            Self::Separator => f.write_str(SEPARATOR_TOKEN),
            Self::Dynamic => f.write_str(DYNAMIC_TOKEN),
            Self::Group(name) => f.write_str(name),
        }
    }
}

/// Parse a whole layout from raw strings.
#[must_use]
pub fn tokens(raw: &[&str]) -> Vec<Token> {
    raw.iter().copied().map(Token::from).collect()
}

/// Layouts shipped with the application.
#[must_use]
pub fn default_compositions() -> Compositions {
    let mut compositions = Compositions::new();
    compositions.insert(
        "tb_info".into(),
        tokens(&["__title__", "__sep__", "tb_info", "__sep__", "tbox", "help"]),
    );
    compositions.insert(
        "tb_folders".into(),
        tokens(&["__title__", "__sep__", "tb_folders", "__sep__", "tbox", "help"]),
    );
    compositions.insert(
        "tb_debug".into(),
        tokens(&[
            "__title__", "__sep__", "tb_debug", "__sep__", "tools", "tbox", "help",
        ]),
    );
    compositions.insert(
        "tb_settings".into(),
        tokens(&["__title__", "__sep__", "tb_settings", "__sep__", "tbox", "help"]),
    );
    compositions.insert(
        "lb_files".into(),
        tokens(&["__title__", "__sep__", "__dynamic_filter__", "__sep__", "lbox", "help"]),
    );
    compositions
}
