// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::edit::EditOptions;
use crate::model::{ParseOptions, Priority, SortTags};
use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_true() -> bool {
    true
}

fn default_done_symbol() -> String {
    "x".to_string()
}

fn default_next_tasks_count() -> usize {
    5
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SavedFilter {
    pub title: String,
    pub filter: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_done_symbol")]
    pub done_symbol: String,
    #[serde(default)]
    pub default_priority: Priority,
    /// Extra URL schemes recognised as links, e.g. `obsidian`.
    #[serde(default)]
    pub link_schemes: Vec<String>,

    #[serde(default = "default_true")]
    pub add_completion_date: bool,
    #[serde(default)]
    pub completion_date_include_time: bool,
    #[serde(default)]
    pub add_creation_date: bool,
    #[serde(default)]
    pub creation_date_include_time: bool,

    #[serde(default)]
    pub sort_tags_view: SortTags,
    #[serde(default)]
    pub saved_filters: Vec<SavedFilter>,
    #[serde(default = "default_next_tasks_count")]
    pub next_tasks_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            done_symbol: default_done_symbol(),
            default_priority: Priority::default(),
            link_schemes: Vec::new(),
            add_completion_date: true,
            completion_date_include_time: false,
            add_creation_date: false,
            creation_date_include_time: false,
            sort_tags_view: SortTags::default(),
            saved_filters: Vec::new(),
            next_tasks_count: default_next_tasks_count(),
        }
    }
}

impl Config {
    /// Load the configuration from disk using an explicit context.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;

        if config.done_symbol.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "Invalid config file '{}': done_symbol must not be empty",
                path.display()
            ));
        }

        Ok(config)
    }

    /// Defaults when the file does not exist. Other errors are still reported.
    pub fn load_or_default(ctx: &dyn AppContext) -> Result<Self> {
        match Self::load(ctx) {
            Ok(config) => Ok(config),
            Err(e) if Self::is_missing_config_error(&e) => {
                log::info!("No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }
        err.chain().any(|cause| {
            cause
                .downcast_ref::<std::io::Error>()
                .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
        })
    }

    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        let toml_str = toml::to_string_pretty(self)?;
        atomic_write(&path, toml_str)?;
        log::debug!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            done_symbol: self.done_symbol.clone(),
            default_priority: self.default_priority,
            link_schemes: self.link_schemes.clone(),
        }
    }

    pub fn edit_options(&self) -> EditOptions {
        EditOptions {
            done_symbol: self.done_symbol.clone(),
            default_priority: self.default_priority,
            add_completion_date: self.add_completion_date,
            completion_date_include_time: self.completion_date_include_time,
            add_creation_date: self.add_creation_date,
            creation_date_include_time: self.creation_date_include_time,
        }
    }

    pub fn saved_filter(&self, title: &str) -> Option<&SavedFilter> {
        self.saved_filters.iter().find(|f| f.title == title)
    }
}

fn atomic_write<C: AsRef<[u8]>>(path: &Path, contents: C) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}
