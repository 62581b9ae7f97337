//! YAML configuration for the render command.
//!
//! Every field is optional; command-line flags override what the file sets.
//!
//! ```yaml
//! mode: compact
//! schemas: [public, sales]
//! exclude_tables: ["*_backup", "schema_migrations"]
//! connected_only: true
//! title: Shop
//! export:
//!   theme: dark
//! ```

use crate::export::ExportOptions;
use crate::filter::FilterOptions;
use crate::render::{Layout, Mode, OutputFormat, DEFAULT_MAX_COLUMNS};
use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Image export settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExportConfig {
    pub theme: Option<String>,
    pub background: Option<String>,
    pub scale: Option<u32>,
    /// Path to the `mmdc` binary
    pub mmdc: Option<String>,
}

/// Complete YAML configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ErdConfig {
    pub mode: Mode,
    pub format: OutputFormat,
    /// Schemas to keep (all when empty)
    pub schemas: Vec<String>,
    pub exclude_schemas: Vec<String>,
    /// Table globs to keep (all when empty)
    pub tables: Vec<String>,
    pub exclude_tables: Vec<String>,
    pub connected_only: bool,
    pub keep_dangling: bool,
    /// Normal-mode column limit per table; 0 means unlimited
    pub max_columns: usize,
    pub group_by_schema: bool,
    pub schema_prefix: bool,
    pub title: Option<String>,
    pub export: ExportConfig,
}

impl Default for ErdConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            format: OutputFormat::default(),
            schemas: Vec::new(),
            exclude_schemas: Vec::new(),
            tables: Vec::new(),
            exclude_tables: Vec::new(),
            connected_only: false,
            keep_dangling: false,
            max_columns: DEFAULT_MAX_COLUMNS,
            group_by_schema: false,
            schema_prefix: true,
            title: None,
            export: ExportConfig::default(),
        }
    }
}

impl ErdConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ErdConfig = serde_yaml_ng::from_str(content)?;
        Ok(config)
    }

    /// Compile the filter settings; malformed globs are reported here
    pub fn filter_options(&self) -> anyhow::Result<FilterOptions> {
        Ok(FilterOptions::new()
            .with_schemas(self.schemas.iter().cloned())
            .without_schemas(self.exclude_schemas.iter().cloned())
            .with_tables(&self.tables)?
            .without_tables(&self.exclude_tables)?
            .connected_only(self.connected_only)
            .keep_dangling(self.keep_dangling))
    }

    pub fn layout(&self) -> Layout {
        Layout {
            schema_prefix: self.schema_prefix,
            group_by_schema: self.group_by_schema,
            title: self.title.clone(),
            max_columns: self.max_columns,
            keep_dangling: self.keep_dangling,
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        let defaults = ExportOptions::default();
        ExportOptions {
            theme: self.export.theme.clone().unwrap_or(defaults.theme),
            background: self.export.background.clone().unwrap_or(defaults.background),
            scale: self.export.scale.unwrap_or(defaults.scale),
            command: self.export.mmdc.clone().map(Into::into).unwrap_or(defaults.command),
        }
    }
}
