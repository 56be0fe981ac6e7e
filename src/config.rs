//! Build configuration.
//!
//! Build settings live in the `[build]` table of the content root's
//! `folio.toml`, next to the site fields. Everything else in `folio.toml`
//! describes the site and is handled by the decoder; this module only cares
//! about how the site gets built.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [build]
//! layouts_dir = "layout"    # Template directory, relative to the content root
//! max_threads = 4           # Parallel decode workers (omit for auto = CPU cores)
//!
//! [build.markdown]
//! tables = true
//! footnotes = true
//! strikethrough = true
//! tasklists = true
//! smart_punctuation = true  # "quotes" and -- dashes
//! heading_ids = true        # {#custom-id} on headings
//! ```
//!
//! Loading mirrors a layered config: stock defaults are serialized to a TOML
//! table, the user's `[build]` table is merged on top, and the result is
//! deserialized and validated. Unknown keys are rejected to catch typos
//! early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the site document at the content root.
pub const SITE_FILE: &str = "folio.toml";

/// Key of the build table inside [`SITE_FILE`].
pub const BUILD_KEY: &str = "build";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings for a build, loaded from the `[build]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Template directory, relative to the content root.
    pub layouts_dir: String,
    /// Maximum number of parallel decode workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
    /// Markdown extensions enabled when converting content to HTML.
    pub markdown: MarkdownConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            layouts_dir: "layout".to_string(),
            max_threads: None,
            markdown: MarkdownConfig::default(),
        }
    }
}

impl BuildConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layouts_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "build.layouts_dir must not be empty".into(),
            ));
        }
        if self.max_threads == Some(0) {
            return Err(ConfigError::Validation(
                "build.max_threads must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
    pub smart_punctuation: bool,
    pub heading_ids: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            tasklists: true,
            smart_punctuation: true,
            heading_ids: true,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &BuildConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock defaults as a `toml::Value::Table`, the base layer user overrides
/// are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(BuildConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read the raw `[build]` table from `folio.toml` in `root`.
///
/// Returns `Ok(None)` if the file or the table is absent.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let site_path = root.join(SITE_FILE);
    if !site_path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&site_path)?;
    let mut table: toml::Table = toml::from_str(&text)?;
    Ok(table.remove(BUILD_KEY))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BuildConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the build config of the content directory at `root`.
pub fn load_config(root: &Path) -> Result<BuildConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(root)?)
}

/// Returns a fully-commented stock `[build]` table with all keys explained.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# folio build configuration
# =========================
# Paste this table into folio.toml at the content root.
# All settings are optional; values shown are the defaults.
# Unknown keys will cause an error.

[build]
# Template directory, relative to the content root.
# Reserved templates: index.html, _book.html, _chapter.html,
# _profile.html, _series.html. Everything else is copied to the output.
layouts_dir = "layout"

# Maximum parallel decode workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4

# ---------------------------------------------------------------------------
# Markdown extensions
# ---------------------------------------------------------------------------
[build.markdown]
tables = true
footnotes = true
strikethrough = true
tasklists = true

# Curly quotes, en/em dashes and ellipses.
smart_punctuation = true

# Custom heading anchors: # Title {#anchor}
heading_ids = true
"##
}
