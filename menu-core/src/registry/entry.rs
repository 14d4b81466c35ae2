//! ``src/registry/entry.rs``

use crate::registry::handler::HandlerRef;

/// A registered action: one label bound to one handler.
#[derive(Debug, Clone)]
pub struct ActionEntry {
    pub label: String,
    /// Internal identifier; defaults to the handler's name.
    pub tag: String,
    /// Semantic category, e.g. `subtitles`.
    pub symbol: String,
    pub icon: Option<String>,
    /// Group the entry was first registered under.
    pub group: String,
    pub handler: HandlerRef,
}

impl ActionEntry {
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.handler.is_enabled()
    }
}

/// A registration request. Only the handler and the group are required.
#[derive(Debug, Clone)]
pub struct Registration {
    pub handler: HandlerRef,
    pub group: String,
    pub tag: Option<String>,
    pub label: Option<String>,
    pub icon: Option<String>,
    pub symbol: String,
}

impl Registration {
    #[must_use]
    pub fn new(handler: HandlerRef, group: impl Into<String>) -> Self {
        Self {
            handler,
            group: group.into(),
            tag: None,
            label: None,
            icon: None,
            symbol: String::new(),
        }
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn maybe_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn maybe_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    #[must_use]
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Tag used for deduplication: explicit tag, else the handler name.
    #[must_use]
    pub fn resolved_tag(&self) -> String {
        self.tag
            .clone()
            .unwrap_or_else(|| self.handler.name().to_string())
    }

    /// Display label: explicit label, else `"{symbol} {tag}"` trimmed.
    #[must_use]
    pub fn resolved_label(&self) -> String {
        match &self.label {
            Some(label) if !label.is_empty() => label.clone(),
            _ => format!("{} {}", self.symbol, self.resolved_tag())
                .trim()
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_falls_back_to_tag() {
        let reg = Registration::new(HandlerRef::new("purge_files", || {}), "tools");
        assert_eq!(reg.resolved_tag(), "purge_files");
        assert_eq!(reg.resolved_label(), "purge_files");
    }

    #[test]
    fn test_label_uses_symbol_prefix() {
        let reg = Registration::new(HandlerRef::new("purge_files", || {}), "tools")
            .tag("purge")
            .symbol("🧹");
        assert_eq!(reg.resolved_label(), "🧹 purge");
    }

    #[test]
    fn test_explicit_label_wins() {
        let reg = Registration::new(HandlerRef::new("purge_files", || {}), "tools")
            .symbol("🧹")
            .label("Purge Files");
        assert_eq!(reg.resolved_label(), "Purge Files");
    }
}
