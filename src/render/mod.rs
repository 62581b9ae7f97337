//! Diagram rendering for a (filtered) schema model.
//!
//! Supported formats:
//! - Mermaid erDiagram text
//! - Mermaid wrapped in a Markdown code fence
//! - JSON (lossless, readable back into a model)

pub mod json;
pub mod mermaid;
pub mod types;

use crate::schema::SchemaModel;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default column limit per table in normal mode
pub const DEFAULT_MAX_COLUMNS: usize = 20;

/// How much column detail to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Only primary-key and foreign-key columns
    Compact,
    /// All columns with simplified types, truncated per table
    #[default]
    Normal,
    /// All columns with declared types, never truncated
    Full,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(Mode::Compact),
            "normal" => Ok(Mode::Normal),
            "full" => Ok(Mode::Full),
            _ => Err(format!(
                "Unknown mode: {}. Valid options: compact, normal, full",
                s
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Compact => write!(f, "compact"),
            Mode::Normal => write!(f, "normal"),
            Mode::Full => write!(f, "full"),
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raw Mermaid erDiagram
    #[default]
    Mermaid,
    /// Mermaid inside a ```mermaid fence
    Markdown,
    /// Structured JSON document
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mermaid" | "mmd" => Ok(OutputFormat::Mermaid),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Unknown format: {}. Valid options: mermaid, markdown, json",
                s
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Mermaid => write!(f, "mermaid"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Structural layout of the diagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Prefix non-`public` tables with their schema
    pub schema_prefix: bool,
    /// Cluster tables under per-schema comments
    pub group_by_schema: bool,
    pub title: Option<String>,
    /// Normal-mode column limit per table; 0 means unlimited
    pub max_columns: usize,
    /// Draw relationships whose target table is not in the model
    pub keep_dangling: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            schema_prefix: true,
            group_by_schema: false,
            title: None,
            max_columns: DEFAULT_MAX_COLUMNS,
            keep_dangling: false,
        }
    }
}

/// Render a model. Mode and layout shape the Mermaid formats; JSON always
/// carries the full model.
pub fn render(model: &SchemaModel, mode: Mode, layout: &Layout, format: OutputFormat) -> String {
    match format {
        OutputFormat::Mermaid => mermaid::to_mermaid(model, mode, layout),
        OutputFormat::Markdown => {
            format!("```mermaid\n{}```\n", mermaid::to_mermaid(model, mode, layout))
        }
        OutputFormat::Json => json::to_json(model),
    }
}
