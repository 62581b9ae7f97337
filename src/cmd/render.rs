use super::RenderArgs;
use crate::config::ErdConfig;
use crate::export::{export_diagram, ImageFormat};
use crate::filter::filter;
use crate::render::{render, Mode, OutputFormat};
use crate::schema::{parse, ParseStats, SchemaModel};
use anyhow::{bail, Context};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let config = merge_config(&args)?;
    let image = image_format(&args);

    if image.is_some() {
        if args.output.is_none() {
            bail!("image export requires an output file (-o)");
        }
        if config.format == OutputFormat::Json {
            bail!("image export needs mermaid output, not json");
        }
    }

    let filter_options = config.filter_options()?;
    let sql = read_input(&args.input)?;
    if sql.trim().is_empty() {
        bail!("input is empty");
    }

    let result = parse(&sql);
    if args.verbose {
        print_stats(&result.stats);
    }

    let model = filter(&result.model, &filter_options);
    if args.verbose {
        print_filtered(&result.model, &model);
    }

    let layout = config.layout();

    if let (Some(format), Some(out_path)) = (image, args.output.as_deref()) {
        let diagram = render(&model, config.mode, &layout, OutputFormat::Mermaid);
        let bytes = export_diagram(&diagram, format, &config.export_options())?;
        fs::write(out_path, bytes)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        eprintln!("Rendered to: {}", out_path.display());
        return Ok(());
    }

    let mut text = render(&model, config.mode, &layout, config.format);
    if !text.ends_with('\n') {
        text.push('\n');
    }

    match args.output.as_deref() {
        Some(out_path) => {
            fs::write(out_path, &text)
                .with_context(|| format!("failed to write {}", out_path.display()))?;
            if args.verbose {
                eprintln!("ERD written to: {}", out_path.display());
            }
        }
        None => io::stdout().write_all(text.as_bytes())?,
    }

    Ok(())
}

/// Config file settings with command-line flags applied on top
fn merge_config(args: &RenderArgs) -> anyhow::Result<ErdConfig> {
    let mut config = match &args.config {
        Some(path) => ErdConfig::load(path)?,
        None => ErdConfig::default(),
    };

    if args.compact {
        config.mode = Mode::Compact;
    } else if args.normal {
        config.mode = Mode::Normal;
    } else if args.full {
        config.mode = Mode::Full;
    }
    if let Some(format) = args.format {
        config.format = format;
    }

    if !args.schemas.is_empty() {
        config.schemas = args.schemas.clone();
    }
    if !args.exclude_schemas.is_empty() {
        config.exclude_schemas = args.exclude_schemas.clone();
    }
    if !args.tables.is_empty() {
        config.tables = args.tables.clone();
    }
    if !args.exclude.is_empty() {
        config.exclude_tables = args.exclude.clone();
    }

    config.connected_only |= args.connected_only;
    config.keep_dangling |= args.keep_dangling;
    config.group_by_schema |= args.group_by_schema;
    if args.no_schema_prefix {
        config.schema_prefix = false;
    }
    if let Some(max) = args.max_columns {
        config.max_columns = max;
    }
    if args.title.is_some() {
        config.title = args.title.clone();
    }

    if args.theme.is_some() {
        config.export.theme = args.theme.clone();
    }
    if args.background.is_some() {
        config.export.background = args.background.clone();
    }
    if args.scale.is_some() {
        config.export.scale = args.scale;
    }

    Ok(config)
}

fn image_format(args: &RenderArgs) -> Option<ImageFormat> {
    if args.svg {
        Some(ImageFormat::Svg)
    } else if args.png {
        Some(ImageFormat::Png)
    } else if args.pdf {
        Some(ImageFormat::Pdf)
    } else {
        None
    }
}

fn read_input(input: &Path) -> anyhow::Result<String> {
    if input == Path::new("-") {
        let mut sql = String::new();
        io::stdin()
            .read_to_string(&mut sql)
            .context("failed to read stdin")?;
        return Ok(sql);
    }

    if !input.exists() {
        bail!("input file does not exist: {}", input.display());
    }
    fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))
}

fn print_stats(stats: &ParseStats) {
    eprintln!(
        "Parsed {} statements ({} skipped)",
        stats.statements, stats.statements_skipped
    );
    eprintln!(
        "  {} tables, {} columns, {} relationships ({} dangling)",
        stats.tables, stats.columns, stats.relationships, stats.dangling_relationships
    );
    if stats.duplicate_tables > 0 {
        eprintln!("  {} duplicate table definitions ignored", stats.duplicate_tables);
    }
    for warning in &stats.warnings {
        eprintln!("warning: {}", warning);
    }
}

fn print_filtered(before: &SchemaModel, after: &SchemaModel) {
    if before.len() != after.len()
        || before.relationships().len() != after.relationships().len()
    {
        eprintln!(
            "Filtered to {} of {} tables, {} of {} relationships",
            after.len(),
            before.len(),
            after.relationships().len(),
            before.relationships().len()
        );
    }
}
