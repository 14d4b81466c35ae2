//! src/config.rs
//! ============================================================================
//! # Config: Menu Engine Configuration Loader and Saver
//!
//! Holds every operator-editable setting of the menu engine: the named
//! compositions, discovery rules, the dynamic filter, audit behavior and
//! logging. Loads and saves TOML from the platform config path resolved with
//! the [`directories`](https://docs.rs/directories) crate.
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load().await?;
//! config.save().await?;
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use tokio::fs as TokioFs;

use crate::{
    composition::{
        mode::DynamicFilter,
        token::{Compositions, default_compositions},
    },
    error::{MenuError, MenuResult},
    logging::LoggingConfig,
    registry::action_registry::SharedGroupRules,
};

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "menukit";
const APPLICATION: &str = "MenuCtl";

/// Rules for turning a module tree into registry groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Root directory holding the action modules.
    pub base_path: PathBuf,

    /// Directory names that start a group when a handler has no explicit one.
    pub known_roots: Vec<String>,

    /// Extend a matched root with the next directory, e.g. `lb_files/videos`.
    pub extend_with_child: bool,

    /// File extension of a module unit.
    pub module_extension: String,

    /// File that turns a directory into a package unit.
    pub initializer: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("actions"),
            known_roots: [
                "lb_files",
                "tb_info",
                "tb_debug",
                "tb_settings",
                "tb_folders",
                "tools",
                "test",
                "help",
            ]
            .map(String::from)
            .to_vec(),
            extend_with_child: true,
            module_extension: "rs".to_string(),
            initializer: "mod.rs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Treat error findings as fatal at startup.
    pub fail_fast: bool,
}

/// Main configuration struct for the menu engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Override for the serialized menu document location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menus_path: Option<PathBuf>,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub dynamic_filter: DynamicFilter,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub shared_groups: SharedGroupRules,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default = "default_compositions")]
    pub compositions: Compositions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            menus_path: None,
            discovery: DiscoveryConfig::default(),
            dynamic_filter: DynamicFilter::default(),
            audit: AuditConfig::default(),
            shared_groups: SharedGroupRules::default(),
            logging: LoggingConfig::default(),
            compositions: default_compositions(),
        }
    }
}

impl Config {
    /// Loads config from the platform config dir, or writes and returns
    /// defaults when no file exists yet.
    pub async fn load() -> MenuResult<Self> {
        Self::load_from(&Self::config_path()?).await
    }

    /// Loads config from an explicit path, creating it with defaults if missing.
    pub async fn load_from(path: &Path) -> MenuResult<Self> {
        if TokioFs::try_exists(path).await? {
            info!("Loading config from {}", path.display());
            let text = TokioFs::read_to_string(path).await?;
            let cfg: Self = toml::from_str(&text)?;

            Ok(cfg)
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save_to(path).await?;

            Ok(default_config)
        }
    }

    /// Saves config to the platform config dir.
    pub async fn save(&self) -> MenuResult<()> {
        self.save_to(&Self::config_path()?).await
    }

    pub async fn save_to(&self, path: &Path) -> MenuResult<()> {
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(path, toml_str).await?;

        Ok(())
    }

    /// Where the serialized menu document lives.
    pub fn menus_path(&self) -> MenuResult<PathBuf> {
        match &self.menus_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("Settings").join("menus.toml")),
        }
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> MenuResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> MenuResult<PathBuf> {
        let proj_dirs =
            ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).ok_or(MenuError::ConfigDir)?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }
}
