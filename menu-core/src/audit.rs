//! ``src/audit.rs``
//!
//! # Composition Auditor
//!
//! Checks every group referenced by every composition against the registry
//! once discovery has finished, so configuration mistakes show up at start
//! instead of as silently empty menus.
//!
//! The one tolerated side effect: when the first group of a composition is
//! missing, it is created empty so later consumers never hit a missing key.

use ahash::AHashSet;
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::{
    composition::token::{Compositions, Token},
    error::{MenuError, MenuResult},
    registry::action_registry::ActionRegistry,
};

/// Composition name used for findings that concern the registry as a whole.
pub const REGISTRY_SCOPE: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info = 0,
    Warning = 1,
    Error = 2,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub composition: String,
    pub group: Option<String>,
    pub label: Option<String>,
    pub message: String,
}

impl Finding {
    fn new(severity: Severity, composition: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            composition: composition.to_string(),
            group: None,
            label: None,
            message: message.into(),
        }
    }

    fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.composition)?;
        if let Some(group) = &self.group {
            write!(f, " › {group}")?;
        }
        if let Some(label) = &self.label {
            write!(f, " › {label}")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    findings: Vec<Finding>,
}

impl AuditReport {
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.with_severity(severity).count()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Emit every finding through `tracing` at its own level.
    pub fn log(&self) {
        for finding in &self.findings {
            match finding.severity {
                Severity::Info => info!("{finding}"),
                Severity::Warning => warn!("{finding}"),
                Severity::Error => error!("{finding}"),
            }
        }
        info!(
            errors = self.count(Severity::Error),
            warnings = self.count(Severity::Warning),
            "Menu composition audit complete"
        );
    }

    /// Under fail-fast, any error finding turns the report into an error.
    pub fn into_result(self, fail_fast: bool) -> MenuResult<Self> {
        let errors = self.count(Severity::Error);
        if fail_fast && errors > 0 {
            return Err(MenuError::AuditFailed { errors });
        }
        Ok(self)
    }

    fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }
}

/// Audit with no dynamically expanded groups.
pub fn audit(compositions: &Compositions, registry: &mut ActionRegistry) -> AuditReport {
    Auditor::default().run(compositions, registry)
}

#[derive(Debug, Clone, Default)]
pub struct Auditor {
    dynamic_groups: Vec<String>,
}

impl Auditor {
    /// Groups reachable through `__dynamic_filter__` count as referenced.
    #[must_use]
    pub fn with_dynamic_groups(mut self, groups: &[String]) -> Self {
        self.dynamic_groups = groups.to_vec();
        self
    }

    pub fn run(&self, compositions: &Compositions, registry: &mut ActionRegistry) -> AuditReport {
        let mut report = AuditReport::default();
        let mut used: AHashSet<String> = AHashSet::new();

        for (name, tokens) in compositions {
            debug!(composition = %name, tokens = tokens.len(), "Auditing composition");

            let dynamic_count = tokens.iter().filter(|t| **t == Token::Dynamic).count();
            if dynamic_count > 0 {
                used.extend(self.dynamic_groups.iter().cloned());
            }
            if dynamic_count > 1 {
                report.push(Finding::new(
                    Severity::Warning,
                    name,
                    format!("Composition has {dynamic_count} dynamic filter tokens, expected one"),
                ));
            }

            for (index, group) in tokens.iter().filter_map(Token::group_name).enumerate() {
                used.insert(group.to_string());
                Self::check_group(name, group, index == 0, registry, &mut report);
            }
        }

        let mut unused: Vec<&String> = registry
            .grouped()
            .keys()
            .filter(|group| !used.contains(group.as_str()))
            .collect();
        unused.sort();
        for group in unused {
            report.push(
                Finding::new(
                    Severity::Info,
                    REGISTRY_SCOPE,
                    "Unused group: not referenced by any composition",
                )
                .group(group),
            );
        }

        report
    }

    fn check_group(
        composition: &str,
        group: &str,
        primary: bool,
        registry: &mut ActionRegistry,
        report: &mut AuditReport,
    ) {
        if !registry.has_group(group) {
            if primary {
                registry.ensure_group(group);
                report.push(
                    Finding::new(
                        Severity::Info,
                        composition,
                        "Main group has no registered actions, created empty",
                    )
                    .group(group),
                );
            } else {
                report.push(
                    Finding::new(
                        Severity::Error,
                        composition,
                        "Group is in composition but does not exist in registry",
                    )
                    .group(group),
                );
            }
            return;
        }

        let labels = registry.group(group).unwrap_or_default();
        if labels.is_empty() {
            report.push(
                Finding::new(
                    Severity::Warning,
                    composition,
                    "Group exists but has no registered actions",
                )
                .group(group),
            );
            return;
        }

        let mut seen: AHashSet<&str> = AHashSet::with_capacity(labels.len());
        for label in labels {
            if !seen.insert(label.as_str()) {
                report.push(
                    Finding::new(Severity::Warning, composition, "Duplicate label in group")
                        .group(group)
                        .label(label),
                );
            }
            if registry.get(label).is_none() {
                report.push(
                    Finding::new(Severity::Error, composition, "Missing registry entry for label")
                        .group(group)
                        .label(label),
                );
            }
        }
    }
}
