//! ``src/composition/mode.rs``
//!
//! Runtime filter mode read by the `__dynamic_filter__` token. The mode is
//! owned outside the engine and polled read-only on every build.

use serde::{Deserialize, Serialize};
use std::{
    convert::Infallible,
    fmt,
    str::FromStr,
    sync::{Arc, PoisonError, RwLock},
};

/// Current file filter, e.g. `Videos`, `Subtitles` or `All`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterMode {
    /// Expand every filterable group in priority order.
    #[default]
    All,
    /// Expand only the named group (stored lowercase).
    Only(String),
}

impl FilterMode {
    #[must_use]
    pub fn only(group: &str) -> Self {
        Self::Only(group.to_lowercase())
    }

    /// Whether a group name passes this mode. Nested groups such as
    /// `lb_files/videos` match on their last segment.
    #[must_use]
    pub fn admits(&self, group: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => {
                let leaf = group.rsplit('/').next().unwrap_or(group);
                wanted.eq_ignore_ascii_case(group) || wanted.eq_ignore_ascii_case(leaf)
            }
        }
    }
}

impl FromStr for FilterMode {
    type Err = Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("all") || raw.is_empty() {
            Ok(Self::All)
        } else {
            Ok(Self::only(raw))
        }
    }
}

impl From<String> for FilterMode {
    fn from(raw: String) -> Self {
        let Ok(mode) = raw.parse::<Self>();
        mode
    }
}

impl From<FilterMode> for String {
    fn from(mode: FilterMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(group) => {
                let mut chars = group.chars();
                if let Some(first) = chars.next() {
                    write!(f, "{}{}", first.to_uppercase(), chars.as_str())?;
                }
                Ok(())
            }
        }
    }
}

/// Resolver injected into the composition engine.
pub trait ModeSource {
    fn current_mode(&self) -> FilterMode;
}

impl ModeSource for FilterMode {
    fn current_mode(&self) -> FilterMode {
        self.clone()
    }
}

impl<F> ModeSource for F
where
    F: Fn() -> FilterMode,
{
    fn current_mode(&self) -> FilterMode {
        self()
    }
}

/// Shared, mutable mode cell. The control thread writes it when the user
/// switches filters; the engine reads it at build time.
#[derive(Debug, Clone, Default)]
pub struct ModeCell(Arc<RwLock<FilterMode>>);

impl ModeCell {
    #[must_use]
    pub fn new(mode: FilterMode) -> Self {
        Self(Arc::new(RwLock::new(mode)))
    }

    pub fn set(&self, mode: FilterMode) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    #[must_use]
    pub fn get(&self) -> FilterMode {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ModeSource for ModeCell {
    fn current_mode(&self) -> FilterMode {
        self.get()
    }
}

/// Filterable groups in fixed priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicFilter {
    pub groups: Vec<String>,
    /// Mode used until the operator picks one.
    pub initial_mode: FilterMode,
}

impl Default for DynamicFilter {
    fn default() -> Self {
        Self {
            groups: vec!["lb_files/videos".to_string(), "lb_files/subtitles".to_string()],
            initial_mode: FilterMode::All,
        }
    }
}

impl DynamicFilter {
    /// Groups to expand for a mode, in priority order.
    #[must_use]
    pub fn groups_for<'a>(&'a self, mode: &FilterMode) -> Vec<&'a str> {
        self.groups
            .iter()
            .map(String::as_str)
            .filter(|group| mode.admits(group))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("All".parse::<FilterMode>(), Ok(FilterMode::All));
        assert_eq!("Videos".parse::<FilterMode>(), Ok(FilterMode::only("videos")));
        assert_eq!(FilterMode::only("subtitles").to_string(), "Subtitles");
    }

    #[test]
    fn test_groups_for_mode() {
        let filter = DynamicFilter::default();
        assert_eq!(
            filter.groups_for(&FilterMode::All),
            vec!["lb_files/videos", "lb_files/subtitles"]
        );
        assert_eq!(
            filter.groups_for(&FilterMode::only("Subtitles")),
            vec!["lb_files/subtitles"]
        );
        assert!(filter.groups_for(&FilterMode::only("audio")).is_empty());
    }

    #[test]
    fn test_flat_groups_match_by_name() {
        let filter = DynamicFilter {
            groups: vec!["videos".to_string(), "subtitles".to_string()],
            ..DynamicFilter::default()
        };
        assert_eq!(filter.groups_for(&FilterMode::only("videos")), vec!["videos"]);
        assert!(FilterMode::only("lb_files/videos").admits("lb_files/videos"));
        assert!(!FilterMode::only("files").admits("lb_files/videos"));
    }

    #[test]
    fn test_mode_cell_is_shared() {
        let cell = ModeCell::new(FilterMode::All);
        let reader = cell.clone();
        cell.set(FilterMode::only("videos"));
        assert_eq!(reader.current_mode(), FilterMode::only("videos"));
    }

    #[test]
    fn test_closure_source() {
        let source = || FilterMode::only("videos");
        assert_eq!(source.current_mode(), FilterMode::only("videos"));
    }
}
