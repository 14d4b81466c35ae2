//! ``src/composition/engine.rs``
//!
//! # `CompositionEngine`: Token Sequences → Render Items
//!
//! Resolves a named composition against the registry at build time. Nothing
//! is cached: the registry and the runtime mode may both have changed since
//! the previous call, so every `build` walks the tokens again.
//!
//! Separator rules: a separator is only emitted after a non-separator item,
//! so leading and doubled separators vanish, and trailing ones are trimmed
//! when the build finishes.

use std::fmt::{self, Write as _};
use tracing::{debug, trace, warn};

use crate::{
    composition::{
        mode::{DynamicFilter, FilterMode, ModeSource},
        token::{Compositions, Token},
    },
    registry::{action_registry::ActionRegistry, handler::HandlerRef},
};

/// One renderable menu element.
#[derive(Debug, Clone)]
pub enum MenuItem {
    /// Disabled title carrying the composition name.
    Title(String),
    Separator,
    Action {
        label: String,
        icon: Option<String>,
        handler: HandlerRef,
    },
    /// Child composition rendered as a cascade.
    Submenu { label: String, items: Vec<MenuItem> },
}

impl MenuItem {
    #[must_use]
    pub const fn is_separator(&self) -> bool {
        matches!(self, Self::Separator)
    }

    /// Titles and placeholder actions are shown disabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        match self {
            Self::Title(_) => false,
            Self::Separator => false,
            Self::Action { handler, .. } => handler.is_enabled(),
            Self::Submenu { .. } => true,
        }
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Action { label, .. } | Self::Submenu { label, .. } => Some(label.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title(name) => write!(f, "━━━ {} ━━━", name.to_uppercase()),
            Self::Separator => f.write_str("────────────────"),
            Self::Action {
                label,
                icon,
                handler,
            } => {
                if let Some(icon) = icon {
                    write!(f, "{icon} ")?;
                }
                f.write_str(label)?;
                if !handler.is_enabled() {
                    f.write_str(" (disabled)")?;
                }
                Ok(())
            }
            Self::Submenu { label, .. } => write!(f, "{label} ▸"),
        }
    }
}

/// Indented text rendering for CLI and log sinks.
#[must_use]
pub fn render_text(items: &[MenuItem]) -> String {
    let mut out = String::new();
    write_items(items, 0, &mut out);
    out
}

fn write_items(items: &[MenuItem], indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    for item in items {
        let _ = writeln!(out, "{pad}{item}");
        if let MenuItem::Submenu { items, .. } = item {
            write_items(items, indent + 2, out);
        }
    }
}

/// Accumulates items while enforcing the separator rules.
#[derive(Debug, Default)]
struct MenuBuilder {
    items: Vec<MenuItem>,
}

impl MenuBuilder {
    fn push(&mut self, item: MenuItem) {
        if item.is_separator() {
            self.push_separator();
        } else {
            self.items.push(item);
        }
    }

    fn push_separator(&mut self) {
        if self.items.last().is_some_and(|last| !last.is_separator()) {
            self.items.push(MenuItem::Separator);
        }
    }

    fn finish(mut self) -> Vec<MenuItem> {
        while self.items.last().is_some_and(MenuItem::is_separator) {
            self.items.pop();
        }
        self.items
    }
}

pub struct CompositionEngine {
    compositions: Compositions,
    filter: DynamicFilter,
    mode: Box<dyn ModeSource>,
}

impl CompositionEngine {
    pub fn new(
        compositions: Compositions,
        filter: DynamicFilter,
        mode: impl ModeSource + 'static,
    ) -> Self {
        Self {
            compositions,
            filter,
            mode: Box::new(mode),
        }
    }

    #[must_use]
    pub const fn compositions(&self) -> &Compositions {
        &self.compositions
    }

    #[must_use]
    pub fn composition(&self, name: &str) -> Option<&[Token]> {
        self.compositions.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub const fn filter(&self) -> &DynamicFilter {
        &self.filter
    }

    /// Build using the mode reported by the injected resolver.
    #[must_use]
    pub fn build(&self, name: &str, registry: &ActionRegistry) -> Vec<MenuItem> {
        let mode = self.mode.current_mode();
        self.build_with_mode(name, registry, &mode)
    }

    /// Build against an explicit mode.
    #[must_use]
    pub fn build_with_mode(
        &self,
        name: &str,
        registry: &ActionRegistry,
        mode: &FilterMode,
    ) -> Vec<MenuItem> {
        let Some(tokens) = self.compositions.get(name) else {
            warn!(composition = name, "No composition registered under this name");
            return Vec::new();
        };

        let mut builder = MenuBuilder::default();
        self.expand_tokens(name, tokens, registry, mode, &mut builder);
        self.inject_submenus(name, registry, mode, &mut builder);

        let items = builder.finish();
        debug!(
            composition = name,
            mode = %mode,
            items = items.len(),
            "Composition built"
        );
        items
    }

    fn expand_tokens(
        &self,
        name: &str,
        tokens: &[Token],
        registry: &ActionRegistry,
        mode: &FilterMode,
        builder: &mut MenuBuilder,
    ) {
        for token in tokens {
            match token {
                Token::Title => builder.push(MenuItem::Title(name.to_string())),
                Token::Separator => builder.push_separator(),
                Token::Group(group) => {
                    for item in group_items(registry, group) {
                        builder.push(item);
                    }
                }
                Token::Dynamic => self.expand_dynamic(registry, mode, builder),
            }
        }
    }

    /// One separator between successive non-empty expansions, none around.
    fn expand_dynamic(
        &self,
        registry: &ActionRegistry,
        mode: &FilterMode,
        builder: &mut MenuBuilder,
    ) {
        let mut expanded_any = false;
        for group in self.filter.groups_for(mode) {
            let items = group_items(registry, group);
            if items.is_empty() {
                continue;
            }
            if expanded_any {
                builder.push_separator();
            }
            for item in items {
                builder.push(item);
            }
            expanded_any = true;
        }

        if !expanded_any {
            trace!(mode = %mode, "Dynamic filter expanded nothing");
        }
    }

    /// Compositions named `"{name}/{child}"` become trailing submenus,
    /// filtered by the runtime mode.
    fn inject_submenus(
        &self,
        name: &str,
        registry: &ActionRegistry,
        mode: &FilterMode,
        builder: &mut MenuBuilder,
    ) {
        let prefix = format!("{name}/");
        let mut separated = false;

        for (key, tokens) in &self.compositions {
            let Some(child) = key.strip_prefix(&prefix) else {
                continue;
            };
            if child.contains('/') || !mode.admits(child) {
                continue;
            }

            let mut sub = MenuBuilder::default();
            self.expand_tokens(key, tokens, registry, mode, &mut sub);
            self.inject_submenus(key, registry, mode, &mut sub);
            let items = sub.finish();
            if items.is_empty() {
                continue;
            }

            if !separated {
                builder.push_separator();
                separated = true;
            }
            builder.push(MenuItem::Submenu {
                label: capitalize(child),
                items,
            });
        }
    }
}

impl fmt::Debug for CompositionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionEngine")
            .field("compositions", &self.compositions.len())
            .field("filter", &self.filter)
            .field("mode", &self.mode.current_mode())
            .finish()
    }
}

/// Action items of a group in stored order; labels without an entry are
/// dropped with a warning.
fn group_items(registry: &ActionRegistry, group: &str) -> Vec<MenuItem> {
    let Some(labels) = registry.group(group) else {
        trace!(group, "Group not registered, nothing to expand");
        return Vec::new();
    };

    labels
        .iter()
        .filter_map(|label| match registry.get(label) {
            Some(entry) => Some(MenuItem::Action {
                label: entry.label.clone(),
                icon: entry.icon.clone(),
                handler: entry.handler.clone(),
            }),
            None => {
                warn!(group, label = %label, "No entry found for label, dropping item");
                None
            }
        })
        .collect()
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        composition::{mode::ModeCell, token::tokens},
        registry::entry::Registration,
    };

    fn registry_with(groups: &[(&str, &[&str])]) -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        for (group, labels) in groups {
            for label in *labels {
                let handler = HandlerRef::new(label.to_lowercase(), || {});
                registry.register(Registration::new(handler, *group).label(*label));
            }
        }
        registry
    }

    fn engine(layouts: &[(&str, &[&str])], mode: impl ModeSource + 'static) -> CompositionEngine {
        let compositions = layouts
            .iter()
            .map(|(name, raw)| ((*name).to_string(), tokens(raw)))
            .collect();
        let filter = DynamicFilter {
            groups: vec!["videos".to_string(), "subtitles".to_string()],
            ..DynamicFilter::default()
        };
        CompositionEngine::new(compositions, filter, mode)
    }

    fn labels(items: &[MenuItem]) -> Vec<String> {
        items
            .iter()
            .map(|item| match item {
                MenuItem::Separator => "|".to_string(),
                MenuItem::Title(name) => format!("#{name}"),
                other => other.label().unwrap_or_default().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_separators_and_empty_group_render_nothing() {
        let mut registry = registry_with(&[]);
        registry.ensure_group("emptyGroup");
        let engine = engine(
            &[("menu", &["__sep__", "__sep__", "emptyGroup", "__sep__"])],
            FilterMode::All,
        );

        assert!(engine.build("menu", &registry).is_empty());
    }

    #[test]
    fn test_title_groups_and_collapsed_separators() {
        let registry = registry_with(&[("tb_info", &["Info"]), ("help", &["Show Help"])]);
        let engine = engine(
            &[(
                "tb_info",
                &["__title__", "__sep__", "tb_info", "__sep__", "missing", "__sep__", "help"],
            )],
            FilterMode::All,
        );

        let items = engine.build("tb_info", &registry);
        assert_eq!(
            labels(&items),
            vec!["#tb_info", "|", "Info", "|", "Show Help"]
        );
        assert_eq!(items[0].to_string(), "━━━ TB_INFO ━━━");
        assert!(!items[0].is_enabled());
    }

    #[test]
    fn test_dynamic_follows_runtime_mode() {
        let registry = registry_with(&[
            ("videos", &["Remux", "Inspect"]),
            ("subtitles", &["Extract"]),
        ]);
        let mode = ModeCell::new(FilterMode::only("Videos"));
        let engine = engine(&[("lb_files", &["__dynamic_filter__"])], mode.clone());

        assert_eq!(labels(&engine.build("lb_files", &registry)), vec!["Remux", "Inspect"]);

        mode.set(FilterMode::All);
        assert_eq!(
            labels(&engine.build("lb_files", &registry)),
            vec!["Remux", "Inspect", "|", "Extract"]
        );

        mode.set(FilterMode::only("subtitles"));
        assert_eq!(labels(&engine.build("lb_files", &registry)), vec!["Extract"]);
    }

    #[test]
    fn test_dynamic_skips_empty_expansions() {
        let registry = registry_with(&[("subtitles", &["Extract"])]);
        let engine = engine(
            &[("lb_files", &["__title__", "__sep__", "__dynamic_filter__", "__sep__", "help"])],
            FilterMode::All,
        );

        assert_eq!(
            labels(&engine.build("lb_files", &registry)),
            vec!["#lb_files", "|", "Extract"]
        );
    }

    #[test]
    fn test_build_sees_registry_changes() {
        let mut registry = registry_with(&[("tools", &["Purge"])]);
        let engine = engine(&[("tb_debug", &["tools"])], FilterMode::All);
        assert_eq!(engine.build("tb_debug", &registry).len(), 1);

        registry.register(Registration::new(HandlerRef::new("dump", || {}), "tools"));
        assert_eq!(engine.build("tb_debug", &registry).len(), 2);
    }

    #[test]
    fn test_dangling_labels_are_dropped() {
        let mut registry = registry_with(&[("tools", &["Purge"])]);
        registry.link_dangling("tools", "ghost");
        let engine = engine(&[("tb_debug", &["tools"])], FilterMode::All);

        assert_eq!(labels(&engine.build("tb_debug", &registry)), vec!["Purge"]);
    }

    #[test]
    fn test_placeholders_render_disabled() {
        let mut registry = ActionRegistry::new();
        registry.register(Registration::new(HandlerRef::placeholder("gone"), "tools").label("Gone"));
        let engine = engine(&[("tb_debug", &["tools"])], FilterMode::All);

        let items = engine.build("tb_debug", &registry);
        assert_eq!(items.len(), 1);
        assert!(!items[0].is_enabled());
        assert_eq!(items[0].to_string(), "Gone (disabled)");
    }

    #[test]
    fn test_child_compositions_become_filtered_submenus() {
        let registry = registry_with(&[
            ("tb_folders", &["Open"]),
            ("videos", &["Remux"]),
            ("subtitles", &["Extract"]),
        ]);
        let engine = engine(
            &[
                ("tb_folders", &["__title__", "tb_folders"]),
                ("tb_folders/videos", &["videos"]),
                ("tb_folders/subtitles", &["subtitles"]),
            ],
            FilterMode::All,
        );

        let items = engine.build("tb_folders", &registry);
        assert_eq!(
            labels(&items),
            vec!["#tb_folders", "Open", "|", "Videos", "Subtitles"]
        );

        let only_subs = engine.build_with_mode("tb_folders", &registry, &FilterMode::only("subtitles"));
        assert_eq!(labels(&only_subs), vec!["#tb_folders", "Open", "|", "Subtitles"]);
        let rendered = render_text(&only_subs);
        assert!(rendered.ends_with("Subtitles ▸\n  Extract\n"));
    }

    #[test]
    fn test_unknown_composition_is_empty() {
        let registry = registry_with(&[("tools", &["Purge"])]);
        let engine = engine(&[], FilterMode::All);
        assert!(engine.build("nope", &registry).is_empty());
    }
}
