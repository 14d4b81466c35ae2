//! ``src/serializer.rs``
//!
//! # Menu Document: Export and Import of the Registry
//!
//! The registry is persisted as a TOML document keyed by group:
//!
//! ```toml
//! [metadata]
//! generated_at = "2026-01-01T00:00:00Z"
//! source = "menu_registry"
//! version = "2.0.0"
//!
//! [[Menus.tools]]
//! label = "Purge Files"
//! action = "purge_files"
//! icon = "🧹"
//! ```
//!
//! Import resolves action names back to handlers. Names that cannot be
//! resolved get a disabled placeholder so the menu still shows the item.

use ahash::AHashSet;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, hash::BuildHasher, path::Path};
use tokio::fs as TokioFs;
use tracing::{debug, info, warn};

use crate::{
    error::{MenuError, MenuResult},
    registry::{action_registry::ActionRegistry, entry::Registration, handler::HandlerRef},
};

pub const DOCUMENT_SOURCE: &str = "menu_registry";
pub const DOCUMENT_VERSION: &str = "2.0.0";
const UNNAMED_LABEL: &str = "Unnamed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    pub source: String,
    pub version: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            generated_at: None,
            source: DOCUMENT_SOURCE.to_string(),
            version: DOCUMENT_VERSION.to_string(),
        }
    }
}

/// One menu item as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuRecord {
    pub label: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuDocument {
    pub metadata: Metadata,
    #[serde(rename = "Menus")]
    pub menus: IndexMap<String, Vec<MenuRecord>>,
}

impl MenuDocument {
    pub fn to_toml_string(&self) -> MenuResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn from_toml_str(text: &str) -> MenuResult<Self> {
        Ok(toml::from_str(text)?)
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.menus.values().map(Vec::len).sum()
    }
}

/// Resolves an action name from a document to a live handler.
pub trait HandlerLookup {
    fn lookup(&self, action: &str) -> Option<HandlerRef>;
}

impl<S: BuildHasher> HandlerLookup for HashMap<String, HandlerRef, S> {
    fn lookup(&self, action: &str) -> Option<HandlerRef> {
        self.get(action).cloned()
    }
}

impl<S: BuildHasher> HandlerLookup for IndexMap<String, HandlerRef, S> {
    fn lookup(&self, action: &str) -> Option<HandlerRef> {
        self.get(action).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Clear the registry first.
    #[default]
    Reset,
    /// Add on top of what is registered.
    Merge,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub groups: usize,
    pub records: usize,
    pub placeholders: usize,
}

/// Snapshot the registry as a document, optionally keeping only groups whose
/// name starts with `filter_prefix`. Labels repeated within a group and
/// labels with no entry are left out.
#[must_use]
pub fn export(registry: &ActionRegistry, filter_prefix: Option<&str>) -> MenuDocument {
    let mut menus: IndexMap<String, Vec<MenuRecord>> = IndexMap::new();

    for (group, labels) in registry.grouped() {
        if filter_prefix.is_some_and(|prefix| !group.starts_with(prefix)) {
            continue;
        }

        let mut seen: AHashSet<&str> = AHashSet::with_capacity(labels.len());
        let records = menus.entry(group.clone()).or_default();

        for label in labels {
            if !seen.insert(label.as_str()) {
                continue;
            }
            let Some(entry) = registry.get(label) else {
                warn!(group = %group, label = %label, "Label has no entry, not exported");
                continue;
            };
            records.push(MenuRecord {
                label: label.clone(),
                action: entry.handler.name().to_string(),
                icon: entry.icon.clone(),
            });
        }
    }

    debug!(groups = menus.len(), "Exported menu document");

    MenuDocument {
        metadata: Metadata {
            generated_at: Some(Utc::now()),
            ..Metadata::default()
        },
        menus,
    }
}

/// Rebuild registry contents from a document.
pub fn import(
    document: &MenuDocument,
    lookup: &impl HandlerLookup,
    registry: &mut ActionRegistry,
    mode: ImportMode,
) -> ImportReport {
    if mode == ImportMode::Reset {
        registry.clear();
    }

    let mut report = ImportReport::default();

    for (group, records) in &document.menus {
        registry.ensure_group(group);
        report.groups += 1;

        for record in records {
            let label = first_non_empty(&[&record.label, &record.action], UNNAMED_LABEL);

            let registration = match lookup.lookup(&record.action) {
                Some(handler) => {
                    Registration::new(handler, group.as_str()).tag(record.action.as_str())
                }
                None => {
                    let tag = first_non_empty(&[&record.action, &record.label], UNNAMED_LABEL);
                    debug!(group = %group, action = %record.action, "No handler for action, using placeholder");
                    report.placeholders += 1;
                    Registration::new(HandlerRef::placeholder(tag.as_str()), group.as_str())
                        .tag(tag)
                }
            };

            registry.register(
                registration
                    .label(label)
                    .maybe_icon(record.icon.clone()),
            );
            report.records += 1;
        }
    }

    info!(
        groups = report.groups,
        records = report.records,
        placeholders = report.placeholders,
        "Imported menu document"
    );

    report
}

fn first_non_empty(candidates: &[&String], fallback: &str) -> String {
    candidates
        .iter()
        .find(|value| !value.is_empty())
        .map_or_else(|| fallback.to_string(), |value| (*value).clone())
}

pub async fn write_document(path: &Path, document: &MenuDocument) -> MenuResult<()> {
    let io_error = |source| MenuError::DocumentIo {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        TokioFs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let text = document.to_toml_string()?;
    TokioFs::write(path, text).await.map_err(io_error)?;

    info!("Wrote menu document to {}", path.display());
    Ok(())
}

pub async fn read_document(path: &Path) -> MenuResult<MenuDocument> {
    let text = TokioFs::read_to_string(path)
        .await
        .map_err(|source| MenuError::DocumentIo {
            path: path.to_path_buf(),
            source,
        })?;

    toml::from_str(&text).map_err(|source| MenuError::DocumentParse {
        path: path.to_path_buf(),
        source,
    })
}
