//! ``src/registry/action_registry.rs``
//!
//! # `ActionRegistry`: Labels, Entries and Ordered Groups
//!
//! One registry instance is created at startup and passed by reference to
//! discovery, the composition engine, the auditor and the serializer.
//!
//! - `entries`: label → entry, first write wins
//! - `groups`: group → labels in insertion order (render order)
//! - `seen`: (handler identity, tag, group) triples already processed
//!
//! Entries are never removed one by one; `clear` resets everything.

use ahash::AHashSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, trace};

use crate::registry::{
    entry::{ActionEntry, Registration},
    handler::{HandlerId, HandlerRef},
};

/// What a `register` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// New label, new entry.
    Inserted,
    /// Label already owned by an earlier entry; only the group link was kept.
    Linked,
    /// Exact (handler, tag, group) triple seen before; nothing changed.
    Duplicate,
}

/// Heuristic used to find groups of cross-cutting utility actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedGroupRules {
    pub keywords: Vec<String>,
    pub label_prefixes: Vec<String>,
}

impl Default for SharedGroupRules {
    fn default() -> Self {
        Self {
            keywords: ["shared", "common", "global", "utils"]
                .map(String::from)
                .to_vec(),
            label_prefixes: ["clear", "reset", "sanitize", "normalize"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl SharedGroupRules {
    #[must_use]
    pub fn with_keywords(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|kw| (*kw).to_string()).collect(),
            ..Self::default()
        }
    }
}

/// Group names split on `/` into a nested tree.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MenuTree {
    pub labels: Vec<String>,
    pub children: IndexMap<String, MenuTree>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryView {
    Flat,
    #[default]
    Tree,
}

#[derive(Debug, Default)]
pub struct ActionRegistry {
    entries: IndexMap<String, ActionEntry>,
    groups: IndexMap<String, Vec<String>>,
    seen: AHashSet<(HandlerId, String, String)>,
}

impl ActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a group. Never fails; repeating the same
    /// (handler, tag, group) triple is a no-op, and a label collision keeps
    /// the first entry while still linking the label into the new group.
    pub fn register(&mut self, registration: Registration) -> RegisterOutcome {
        let tag = registration.resolved_tag();
        let label = registration.resolved_label();
        let Registration {
            handler,
            group,
            icon,
            symbol,
            ..
        } = registration;

        if !self.seen.insert((handler.id(), tag.clone(), group.clone())) {
            trace!(label = %label, group = %group, "Duplicate registration ignored");
            return RegisterOutcome::Duplicate;
        }

        let outcome = if self.entries.contains_key(&label) {
            debug!(
                label = %label,
                group = %group,
                handler = handler.name(),
                "Label already registered, keeping first handler"
            );
            RegisterOutcome::Linked
        } else {
            self.entries.insert(
                label.clone(),
                ActionEntry {
                    label: label.clone(),
                    tag,
                    symbol,
                    icon,
                    group: group.clone(),
                    handler,
                },
            );
            RegisterOutcome::Inserted
        };

        let members = self.groups.entry(group).or_default();
        if !members.contains(&label) {
            members.push(label);
        }

        outcome
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&ActionEntry> {
        self.entries.get(label)
    }

    #[must_use]
    pub fn handler_by_label(&self, label: &str) -> Option<&HandlerRef> {
        self.entries.get(label).map(|entry| &entry.handler)
    }

    /// Every entry keyed by label, in registration order.
    #[must_use]
    pub const fn all(&self) -> &IndexMap<String, ActionEntry> {
        &self.entries
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read-only group → labels view.
    #[must_use]
    pub const fn grouped(&self) -> &IndexMap<String, Vec<String>> {
        &self.groups
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Entries of a group in stored order, skipping labels without an entry.
    #[must_use]
    pub fn entries_by_group(&self, group: &str) -> Vec<&ActionEntry> {
        self.groups
            .get(group)
            .map(|labels| labels.iter().filter_map(|l| self.entries.get(l)).collect())
            .unwrap_or_default()
    }

    /// Create an empty group if it does not exist. Returns true if created.
    pub fn ensure_group(&mut self, name: &str) -> bool {
        if self.groups.contains_key(name) {
            return false;
        }
        self.groups.insert(name.to_string(), Vec::new());
        true
    }

    /// Whole-registry reset.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.groups.clear();
        self.seen.clear();
    }

    /// Best-effort guess at groups holding shared utility actions: the group
    /// name contains a keyword, or one of its labels starts with a known
    /// utility prefix. Not a correctness path.
    #[must_use]
    pub fn discover_shared_groups(&self, rules: &SharedGroupRules) -> Vec<String> {
        self.groups
            .iter()
            .filter(|(group, labels)| {
                let group = group.to_lowercase();
                rules.keywords.iter().any(|kw| group.contains(kw.as_str()))
                    || labels.iter().any(|label| {
                        let label = label.to_lowercase();
                        rules
                            .label_prefixes
                            .iter()
                            .any(|prefix| label.starts_with(prefix.as_str()))
                    })
            })
            .map(|(group, _)| group.clone())
            .collect()
    }

    /// Handler name → live handler, first registration wins. Placeholders
    /// are left out.
    #[must_use]
    pub fn handler_index(&self) -> IndexMap<String, HandlerRef> {
        let mut index: IndexMap<String, HandlerRef> = IndexMap::new();
        for entry in self.entries.values().filter(|e| e.is_enabled()) {
            index
                .entry(entry.handler.name().to_string())
                .or_insert_with(|| entry.handler.clone());
        }
        index
    }

    #[must_use]
    pub fn menu_tree(&self) -> MenuTree {
        let mut root = MenuTree::default();
        for (group, labels) in &self.groups {
            let mut node = &mut root;
            for part in group.split('/').filter(|p| !p.is_empty()) {
                node = node.children.entry(part.to_string()).or_default();
            }
            node.labels.extend(labels.iter().cloned());
        }
        root
    }

    #[must_use]
    pub fn summary(&self, view: SummaryView) -> String {
        let mut out = String::from("Menu Registry Summary:\n");
        match view {
            SummaryView::Flat => {
                for (group, labels) in &self.groups {
                    let _ = writeln!(out, " - {group}:");
                    for label in labels {
                        let _ = writeln!(out, "    • {label} → {}", self.handler_name(label));
                    }
                }
            }
            SummaryView::Tree => self.write_tree(&self.menu_tree(), 0, &mut out),
        }
        out
    }

    fn write_tree(&self, node: &MenuTree, indent: usize, out: &mut String) {
        let pad = " ".repeat(indent);
        for label in &node.labels {
            let _ = writeln!(out, "{pad}• {label} → {}", self.handler_name(label));
        }
        for (name, child) in &node.children {
            let _ = writeln!(out, "{pad}{name}/");
            self.write_tree(child, indent + 4, out);
        }
    }

    fn handler_name(&self, label: &str) -> &str {
        self.get(label).map_or("<missing>", |e| e.handler.name())
    }

    /// Link a label into a group without an entry, as a partial import would.
    #[cfg(test)]
    pub(crate) fn link_dangling(&mut self, group: &str, label: &str) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .push(label.to_string());
    }
}
