//! ``src/discovery.rs``
//!
//! # Discovery: Populate the Registry from a Module Tree
//!
//! Walks the action directory, turns every module file (and every package
//! directory with at least one sibling module) into a [`ModuleUnit`], asks a
//! [`ModuleLoader`] for the handlers that unit exposes, and registers each
//! one under its explicit groups or a group derived from its location.
//!
//! A unit that fails to load is logged and skipped; the scan never aborts.
//! Scanning the same tree twice leaves the registry unchanged.

use ahash::AHashSet;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::{
    config::DiscoveryConfig,
    error::MenuResult,
    registry::{
        action_registry::{ActionRegistry, RegisterOutcome},
        entry::Registration,
        handler::HandlerRef,
    },
};

/// Group used when no known root appears in a module's path.
pub const UNKNOWN_GROUP: &str = "unknown";

const MODULE_SEPARATOR: &str = "::";

/// Tag metadata attached to a handler by its module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTags {
    /// One registry entry per tag; empty means "use the handler name".
    pub tags: SmallVec<[String; 2]>,
    pub symbol: String,
    pub label: Option<String>,
    pub icon: Option<String>,
    /// Pre-resolved groups. When set, location is ignored and the handler
    /// is registered once per group.
    pub groups: SmallVec<[String; 2]>,
}

impl ActionTags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.groups.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TaggedHandler {
    pub handler: HandlerRef,
    pub tags: ActionTags,
}

/// Everything a loaded module unit exposes to discovery.
#[derive(Debug, Clone, Default)]
pub struct LoadedModule {
    /// Module opted out of discovery.
    pub skip_scan: bool,
    pub handlers: Vec<TaggedHandler>,
}

/// One importable unit found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleUnit {
    /// Path-derived name, e.g. `lb_files::videos::vids_mgr`.
    pub name: String,
    pub path: PathBuf,
    /// Directories from the base down to the unit.
    pub dirs: Vec<String>,
    pub is_package: bool,
}

/// Turns a module unit into its tagged handlers.
pub trait ModuleLoader {
    fn load(&self, unit: &ModuleUnit) -> MenuResult<LoadedModule>;
}

impl<F> ModuleLoader for F
where
    F: Fn(&ModuleUnit) -> MenuResult<LoadedModule>,
{
    fn load(&self, unit: &ModuleUnit) -> MenuResult<LoadedModule> {
        self(unit)
    }
}

/// Side table of module metadata, filled in by the application at startup.
/// Modules that were never described load as empty.
#[derive(Debug, Clone, Default)]
pub struct ModuleTable {
    modules: IndexMap<String, LoadedModule>,
}

impl ModuleTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a tagged handler to a module.
    pub fn describe(&mut self, module: &str, handler: HandlerRef, tags: ActionTags) -> &mut Self {
        self.modules
            .entry(module.to_string())
            .or_default()
            .handlers
            .push(TaggedHandler { handler, tags });
        self
    }

    /// Mark a module as opted out of discovery.
    pub fn skip(&mut self, module: &str) -> &mut Self {
        self.modules.entry(module.to_string()).or_default().skip_scan = true;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for ModuleTable {
    fn load(&self, unit: &ModuleUnit) -> MenuResult<LoadedModule> {
        Ok(self.modules.get(&unit.name).cloned().unwrap_or_default())
    }
}

/// Outcome of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Label count per registry group after the scan.
    pub group_counts: IndexMap<String, usize>,
    pub modules_loaded: usize,
    pub modules_failed: usize,
    /// Opted-out modules and packages with no sibling modules.
    pub modules_skipped: usize,
    /// Units reached twice by name or by file.
    pub duplicates: usize,
    pub inserted: usize,
    pub linked: usize,
}

impl ScanReport {
    fn record(&mut self, outcome: RegisterOutcome) {
        match outcome {
            RegisterOutcome::Inserted => self.inserted += 1,
            RegisterOutcome::Linked => self.linked += 1,
            RegisterOutcome::Duplicate => {}
        }
    }
}

/// Derive a group from the directories leading to a module: the first known
/// root, extended with the following directory when configured.
#[must_use]
pub fn infer_group(dirs: &[String], config: &DiscoveryConfig) -> String {
    dirs.iter()
        .position(|dir| config.known_roots.contains(dir))
        .map_or_else(
            || UNKNOWN_GROUP.to_string(),
            |index| match dirs.get(index + 1) {
                Some(child) if config.extend_with_child => format!("{}/{child}", dirs[index]),
                _ => dirs[index].clone(),
            },
        )
}

pub struct Scanner<'a, L: ModuleLoader> {
    config: &'a DiscoveryConfig,
    loader: &'a L,
}

impl<'a, L: ModuleLoader> Scanner<'a, L> {
    pub const fn new(config: &'a DiscoveryConfig, loader: &'a L) -> Self {
        Self { config, loader }
    }

    /// Scan the configured base path.
    pub fn scan_configured(&self, registry: &mut ActionRegistry) -> ScanReport {
        self.scan(&self.config.base_path, registry)
    }

    #[instrument(level = "info", skip(self, base, registry), fields(base = %base.display()))]
    pub fn scan(&self, base: &Path, registry: &mut ActionRegistry) -> ScanReport {
        let mut report = ScanReport::default();

        if !base.is_dir() {
            warn!("Discovery base path is not a directory, nothing to scan");
            report.group_counts = group_counts(registry);
            return report;
        }

        let mut seen_modules: AHashSet<String> = AHashSet::new();
        let mut seen_files: AHashSet<PathBuf> = AHashSet::new();

        let walker = WalkDir::new(base)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable path during discovery: {err}");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(unit) = self.unit_for(base, entry.path()) else {
                continue;
            };

            if unit.is_package && self.is_bare_package(&unit.path) {
                debug!(module = %unit.name, "Package has no sibling modules, skipping");
                report.modules_skipped += 1;
                continue;
            }

            let canonical = fs::canonicalize(&unit.path).unwrap_or_else(|_| unit.path.clone());
            if !seen_modules.insert(unit.name.clone()) || !seen_files.insert(canonical) {
                debug!(module = %unit.name, "Module already scanned");
                report.duplicates += 1;
                continue;
            }

            let module = match self.loader.load(&unit) {
                Ok(module) => module,
                Err(err) => {
                    warn!(module = %unit.name, "Failed to load module: {err}");
                    report.modules_failed += 1;
                    continue;
                }
            };

            if module.skip_scan {
                debug!(module = %unit.name, "Module opted out of discovery");
                report.modules_skipped += 1;
                continue;
            }

            report.modules_loaded += 1;
            self.register_module(&unit, module, registry, &mut report);
        }

        report.group_counts = group_counts(registry);

        info!(
            loaded = report.modules_loaded,
            failed = report.modules_failed,
            skipped = report.modules_skipped,
            inserted = report.inserted,
            groups = report.group_counts.len(),
            "Discovery scan complete"
        );

        report
    }

    fn register_module(
        &self,
        unit: &ModuleUnit,
        module: LoadedModule,
        registry: &mut ActionRegistry,
        report: &mut ScanReport,
    ) {
        for TaggedHandler { handler, tags } in module.handlers {
            let groups: SmallVec<[String; 2]> = if tags.is_resolved() {
                tags.groups.clone()
            } else {
                SmallVec::from_elem(infer_group(&unit.dirs, self.config), 1)
            };
            let names: SmallVec<[String; 2]> = if tags.tags.is_empty() {
                SmallVec::from_elem(handler.name().to_string(), 1)
            } else {
                tags.tags.clone()
            };

            // one entry per (group, tag) pair in either case
            for group in &groups {
                for tag in &names {
                    debug!(module = %unit.name, group = %group, tag = %tag, "Registering tagged handler");
                    let registration = Registration::new(handler.clone(), group.as_str())
                        .tag(tag.as_str())
                        .symbol(tags.symbol.as_str())
                        .maybe_label(tags.label.clone())
                        .maybe_icon(tags.icon.clone());
                    report.record(registry.register(registration));
                }
            }
        }
    }

    /// Map a file under `base` to a module unit, if it is one.
    fn unit_for(&self, base: &Path, path: &Path) -> Option<ModuleUnit> {
        let file_name = path.file_name()?.to_str()?;
        let is_package = file_name == self.config.initializer;

        if !is_package
            && path.extension().and_then(|ext| ext.to_str())
                != Some(self.config.module_extension.as_str())
        {
            return None;
        }

        let relative = path.strip_prefix(base).ok()?;
        let dirs: Vec<String> = relative
            .parent()
            .into_iter()
            .flat_map(Path::components)
            .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
            .collect();

        let mut segments = dirs.clone();
        if !is_package {
            segments.push(path.file_stem()?.to_str()?.to_string());
        }
        if segments.is_empty() {
            segments.push(base.file_name()?.to_str()?.to_string());
        }

        Some(ModuleUnit {
            name: segments.join(MODULE_SEPARATOR),
            path: path.to_path_buf(),
            dirs,
            is_package,
        })
    }

    /// A package whose directory holds no other module file.
    fn is_bare_package(&self, initializer: &Path) -> bool {
        let Some(dir) = initializer.parent() else {
            return true;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return true;
        };

        !entries.filter_map(Result::ok).any(|entry| {
            let path = entry.path();
            path.is_file()
                && path.file_name().and_then(|n| n.to_str()) != Some(self.config.initializer.as_str())
                && path.extension().and_then(|ext| ext.to_str())
                    == Some(self.config.module_extension.as_str())
        })
    }
}

fn group_counts(registry: &ActionRegistry) -> IndexMap<String, usize> {
    registry
        .grouped()
        .iter()
        .map(|(group, labels)| (group.clone(), labels.len()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        composition::{CompositionEngine, FilterMode, MenuItem},
        config::Config,
        error::MenuError,
    };

    fn touch(base: &Path, relative: &str) {
        let path = base.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, "").expect("write");
    }

    fn action_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path();
        touch(base, "help/help.rs");
        touch(base, "lb_files/videos/vids_mgr.rs");
        touch(base, "lb_files/subtitles/mod.rs");
        touch(base, "tools/mod.rs");
        touch(base, "tools/config_popup.rs");
        touch(base, "misc/thing.rs");
        touch(base, "tb_debug/debug_control.rs");
        touch(base, "README.md");
        dir
    }

    fn module_table() -> ModuleTable {
        let mut table = ModuleTable::new();
        table
            .describe(
                "help::help",
                HandlerRef::new("show_help", || {}),
                ActionTags::new(["help"]).symbol("❓"),
            )
            .describe(
                "lb_files::videos::vids_mgr",
                HandlerRef::new("remux", || {}),
                ActionTags::new(["remux", "convert"]).symbol("🎬"),
            )
            .describe(
                "tools::config_popup",
                HandlerRef::new("config_popup", || {}),
                ActionTags::default().label("Config").group("tools").group("tbox"),
            )
            .describe("misc::thing", HandlerRef::new("thing", || {}), ActionTags::default())
            .describe(
                "tb_debug::debug_control",
                HandlerRef::new("debug_control", || {}),
                ActionTags::new(["debug"]),
            )
            .skip("tb_debug::debug_control");
        table
    }

    #[test]
    fn test_infer_group() {
        let config = DiscoveryConfig::default();
        let dirs = |raw: &[&str]| raw.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();

        assert_eq!(infer_group(&dirs(&["lb_files", "videos"]), &config), "lb_files/videos");
        assert_eq!(infer_group(&dirs(&["nested", "tools"]), &config), "tools");
        assert_eq!(infer_group(&dirs(&["misc"]), &config), UNKNOWN_GROUP);

        let flat = DiscoveryConfig {
            extend_with_child: false,
            ..DiscoveryConfig::default()
        };
        assert_eq!(infer_group(&dirs(&["lb_files", "videos"]), &flat), "lb_files");
    }

    #[test]
    fn test_scan_registers_by_location_and_explicit_groups() {
        let dir = action_tree();
        let table = module_table();
        let config = DiscoveryConfig::default();
        let mut registry = ActionRegistry::new();

        let report = Scanner::new(&config, &table).scan(dir.path(), &mut registry);

        assert_eq!(report.modules_loaded, 5);
        assert_eq!(report.modules_skipped, 2);
        assert_eq!(report.modules_failed, 0);
        assert_eq!(report.group_counts.get("help"), Some(&1));
        assert_eq!(report.group_counts.get("lb_files/videos"), Some(&2));
        assert_eq!(report.group_counts.get("tools"), Some(&1));
        assert_eq!(report.group_counts.get("tbox"), Some(&1));
        assert_eq!(report.group_counts.get(UNKNOWN_GROUP), Some(&1));
        assert!(!registry.has_group("tb_debug"));

        assert!(registry.get("❓ help").is_some());
        assert_eq!(registry.group("lb_files/videos"), Some(&["🎬 remux".to_string(), "🎬 convert".to_string()][..]));
        assert_eq!(registry.get("Config").map(|e| e.group.as_str()), Some("tools"));
    }

    #[test]
    fn test_explicit_groups_register_every_tag() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "tools/convert.rs");
        let mut table = ModuleTable::new();
        table.describe(
            "tools::convert",
            HandlerRef::new("convert", || {}),
            ActionTags::new(["to_mp4", "to_mkv"])
                .symbol("🎞")
                .group("tools")
                .group("tbox"),
        );
        let config = DiscoveryConfig::default();
        let mut registry = ActionRegistry::new();

        let report = Scanner::new(&config, &table).scan(dir.path(), &mut registry);

        let expected = vec!["🎞 to_mp4".to_string(), "🎞 to_mkv".to_string()];
        assert_eq!(registry.group("tools").map(<[String]>::to_vec), Some(expected.clone()));
        assert_eq!(registry.group("tbox").map(<[String]>::to_vec), Some(expected));
        assert_eq!(report.inserted, 2);
        assert_eq!(report.linked, 2);
    }

    #[test]
    fn test_default_config_renders_scanned_dynamic_groups() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "lb_files/videos/vids_mgr.rs");
        touch(dir.path(), "lb_files/subtitles/subs_mgr.rs");
        let mut table = ModuleTable::new();
        table
            .describe(
                "lb_files::videos::vids_mgr",
                HandlerRef::new("remux", || {}),
                ActionTags::default().label("Remux"),
            )
            .describe(
                "lb_files::subtitles::subs_mgr",
                HandlerRef::new("extract", || {}),
                ActionTags::default().label("Extract"),
            );
        let config = Config::default();
        let mut registry = ActionRegistry::new();
        Scanner::new(&config.discovery, &table).scan(dir.path(), &mut registry);

        let engine = CompositionEngine::new(
            config.compositions.clone(),
            config.dynamic_filter.clone(),
            config.dynamic_filter.initial_mode.clone(),
        );
        let labels = |items: &[MenuItem]| -> Vec<String> {
            items
                .iter()
                .filter_map(|item| item.label().map(str::to_string))
                .collect()
        };

        let items = engine.build("lb_files", &registry);
        assert_eq!(labels(&items), vec!["Remux", "Extract"]);
        assert_eq!(items.iter().filter(|item| item.is_separator()).count(), 2);

        let videos = engine.build_with_mode("lb_files", &registry, &FilterMode::only("Videos"));
        assert_eq!(labels(&videos), vec!["Remux"]);
    }

    #[test]
    fn test_scan_twice_is_idempotent() {
        let dir = action_tree();
        let table = module_table();
        let config = DiscoveryConfig::default();
        let mut registry = ActionRegistry::new();
        let scanner = Scanner::new(&config, &table);

        let first = scanner.scan(dir.path(), &mut registry);
        let size = registry.len();
        let second = scanner.scan(dir.path(), &mut registry);

        assert_eq!(registry.len(), size);
        assert_eq!(first.group_counts, second.group_counts);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.linked, 0);
    }

    #[test]
    fn test_load_failure_is_skipped() {
        let dir = action_tree();
        touch(dir.path(), "tools/broken.rs");
        let config = DiscoveryConfig::default();
        let loader = |unit: &ModuleUnit| -> MenuResult<LoadedModule> {
            if unit.name == "tools::broken" {
                return Err(MenuError::module_load(&unit.name, "initializer panicked"));
            }
            Ok(LoadedModule {
                skip_scan: false,
                handlers: vec![TaggedHandler {
                    handler: HandlerRef::new(unit.name.clone(), || {}),
                    tags: ActionTags::default(),
                }],
            })
        };
        let mut registry = ActionRegistry::new();

        let report = Scanner::new(&config, &loader).scan(dir.path(), &mut registry);

        assert_eq!(report.modules_failed, 1);
        assert!(registry.get("tools::broken").is_none());
        assert!(registry.get("tools::config_popup").is_some());
    }

    #[test]
    fn test_missing_base_is_empty_scan() {
        let dir = tempfile::tempdir().expect("tempdir");
        let table = ModuleTable::new();
        let config = DiscoveryConfig::default();
        let mut registry = ActionRegistry::new();

        let report = Scanner::new(&config, &table).scan(&dir.path().join("absent"), &mut registry);

        assert_eq!(report, ScanReport::default());
        assert!(registry.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_same_file_through_symlink_scanned_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "tools/config_popup.rs");
        std::os::unix::fs::symlink(dir.path().join("tools"), dir.path().join("alias"))
            .expect("symlink");
        let config = DiscoveryConfig::default();
        let table = ModuleTable::new();
        let mut registry = ActionRegistry::new();

        let report = Scanner::new(&config, &table).scan(dir.path(), &mut registry);

        assert_eq!(report.modules_loaded, 1);
        assert_eq!(report.duplicates, 1);
    }
}
