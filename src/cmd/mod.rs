mod render;
mod schema;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

use crate::render::OutputFormat;

#[derive(Parser)]
#[command(name = "pg-erd")]
#[command(version)]
#[command(about = "Turn PostgreSQL schema dumps into Mermaid entity-relationship diagrams", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render an ER diagram from a schema dump (pg_dump --schema-only)
    Render(RenderArgs),

    /// Print the JSON Schema of the JSON output or the config file
    Schema {
        /// Schema to print: erd or config
        #[arg(default_value = "erd")]
        name: String,

        /// List available schema names
        #[arg(long)]
        list: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct RenderArgs {
    /// Input SQL file, or - for stdin
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Output file (default: stdout; required for image export)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show only primary-key and foreign-key columns
    #[arg(long, group = "mode")]
    pub compact: bool,

    /// Show all columns with simplified types (default)
    #[arg(long, group = "mode")]
    pub normal: bool,

    /// Show all columns with declared types, no truncation
    #[arg(long, group = "mode")]
    pub full: bool,

    /// Output format: mermaid, markdown, json
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Only include these schemas (repeatable or comma-separated)
    #[arg(short, long = "schema", value_delimiter = ',')]
    pub schemas: Vec<String>,

    /// Exclude these schemas (repeatable or comma-separated)
    #[arg(long = "exclude-schema", value_delimiter = ',')]
    pub exclude_schemas: Vec<String>,

    /// Only include tables matching these glob patterns (e.g. "user*", "sales.*")
    #[arg(short, long = "table", value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Exclude tables matching these glob patterns (e.g. "*_backup")
    #[arg(short, long = "exclude", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Only include tables that take part in a relationship
    #[arg(short, long)]
    pub connected_only: bool,

    /// Keep relationships whose target table is not defined in the dump
    #[arg(long)]
    pub keep_dangling: bool,

    /// Maximum columns per table in normal mode (0 = unlimited)
    #[arg(long)]
    pub max_columns: Option<usize>,

    /// Group tables by schema
    #[arg(short, long)]
    pub group_by_schema: bool,

    /// Do not prefix non-public tables with their schema name
    #[arg(long)]
    pub no_schema_prefix: bool,

    /// Diagram title
    #[arg(long)]
    pub title: Option<String>,

    /// YAML config file with default options
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Export an SVG image via mermaid-cli (requires -o)
    #[arg(long, group = "image")]
    pub svg: bool,

    /// Export a PNG image via mermaid-cli (requires -o)
    #[arg(long, group = "image")]
    pub png: bool,

    /// Export a PDF via mermaid-cli (requires -o)
    #[arg(long, group = "image")]
    pub pdf: bool,

    /// Mermaid theme for image export: default, dark, forest, neutral
    #[arg(long)]
    pub theme: Option<String>,

    /// Background color for image export
    #[arg(long)]
    pub background: Option<String>,

    /// Scale factor for PNG export
    #[arg(long)]
    pub scale: Option<u32>,

    /// Print parse statistics and warnings to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Render(args) => render::run(args),
        Commands::Schema { name, list } => schema::run(&name, list),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "pg-erd", &mut io::stdout());
            Ok(())
        }
    }
}
