//! Mermaid erDiagram output.

use super::types::{mermaid_type, simplify_type};
use super::{Layout, Mode};
use crate::schema::{Cardinality, Column, Relationship, SchemaModel, Table, TableName};
use ahash::AHashSet;
use std::fmt::Write;

/// Generate a Mermaid erDiagram from a schema model
pub fn to_mermaid(model: &SchemaModel, mode: Mode, layout: &Layout) -> String {
    let mut output = String::new();

    if let Some(title) = layout.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let _ = writeln!(output, "---\ntitle: {}\n---", title);
    }
    output.push_str("erDiagram\n");

    if model.is_empty() {
        output.push_str("    %% No tables to display\n");
        return output;
    }

    let tables = model.sorted_tables();
    if layout.group_by_schema {
        for schema in model.schemas() {
            let _ = writeln!(output, "    %% Schema: {}", schema);
            for table in tables.iter().filter(|t| t.schema == schema) {
                render_table(&mut output, table, mode, layout);
            }
            output.push('\n');
        }
    } else {
        for table in &tables {
            render_table(&mut output, table, mode, layout);
        }
    }

    let relationships = relationship_lines(model, layout);
    if !relationships.is_empty() {
        if !layout.group_by_schema {
            output.push('\n');
        }
        output.push_str("    %% Relationships\n");
        for line in relationships {
            let _ = writeln!(output, "    {}", line);
        }
    }

    output
}

fn render_table(output: &mut String, table: &Table, mode: Mode, layout: &Layout) {
    let id = table_id(&table.qualified_name(), layout);
    let (columns, omitted) = select_columns(table, mode, layout.max_columns);

    let _ = writeln!(output, "    {} {{", id);
    for col in columns {
        let _ = writeln!(output, "        {}", render_column(col, mode));
    }
    if omitted > 0 {
        let _ = writeln!(output, "        %% ... {} more columns", omitted);
    }
    output.push_str("    }\n");
}

/// Columns to draw for a table, and how many were left out.
///
/// Normal mode keeps every key column when truncating, fills the remaining
/// slots with the earliest other columns, and preserves declaration order.
pub(crate) fn select_columns(
    table: &Table,
    mode: Mode,
    max_columns: usize,
) -> (Vec<&Column>, usize) {
    match mode {
        Mode::Compact => (table.columns.iter().filter(|c| c.is_key()).collect(), 0),
        Mode::Full => (table.columns.iter().collect(), 0),
        Mode::Normal if max_columns == 0 || table.columns.len() <= max_columns => {
            (table.columns.iter().collect(), 0)
        }
        Mode::Normal => {
            let keys = table.columns.iter().filter(|c| c.is_key()).count();
            let mut slots = max_columns.saturating_sub(keys);
            let shown: Vec<&Column> = table
                .columns
                .iter()
                .filter(|c| {
                    if c.is_key() {
                        return true;
                    }
                    if slots > 0 {
                        slots -= 1;
                        return true;
                    }
                    false
                })
                .collect();
            let omitted = table.columns.len() - shown.len();
            (shown, omitted)
        }
    }
}

fn render_column(col: &Column, mode: Mode) -> String {
    let col_type = match mode {
        Mode::Full => mermaid_type(&col.data_type),
        Mode::Compact | Mode::Normal => mermaid_type(&simplify_type(&col.data_type)),
    };
    let name = escape_mermaid_id(&col.name);

    let mut markers = Vec::with_capacity(3);
    if col.is_primary_key {
        markers.push("PK");
    }
    if col.is_foreign_key {
        markers.push("FK");
    }
    if col.is_unique {
        markers.push("UK");
    }

    if markers.is_empty() {
        format!("{} {}", col_type, name)
    } else {
        format!("{} {} {}", col_type, name, markers.join(","))
    }
}

/// Relationship lines in model order, duplicates dropped. Relationships to
/// tables missing from the model are drawn only with `keep_dangling`.
fn relationship_lines(model: &SchemaModel, layout: &Layout) -> Vec<String> {
    let mut seen = AHashSet::new();
    model
        .relationships()
        .iter()
        .filter(|rel| model.contains(&rel.source))
        .filter(|rel| layout.keep_dangling || model.contains(&rel.target))
        .map(|rel| relationship_line(model, rel, layout))
        .filter(|line| seen.insert(line.clone()))
        .collect()
}

fn relationship_line(model: &SchemaModel, rel: &Relationship, layout: &Layout) -> String {
    let target_side = if model.is_optional(rel) { "|o" } else { "||" };
    let source_side = match model.cardinality(rel) {
        Cardinality::OneToOne => "o|",
        Cardinality::ManyToOne => "o{",
    };
    let label = rel.source_columns.join(",").replace('"', "'");

    format!(
        "{} {}--{} {} : \"{}\"",
        table_id(&rel.target, layout),
        target_side,
        source_side,
        table_id(&rel.source, layout),
        label
    )
}

/// Entity ID for a table, prefixed with its schema outside `public`
pub fn table_id(table: &TableName, layout: &Layout) -> String {
    if layout.schema_prefix && !table.is_public() {
        escape_mermaid_id(&format!("{}__{}", table.schema, table.name))
    } else {
        escape_mermaid_id(&table.name)
    }
}

/// Escape a string for use as a Mermaid entity or attribute name
pub fn escape_mermaid_id(s: &str) -> String {
    let escaped: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    match escaped.chars().next() {
        None => "_".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{}", escaped),
        Some(_) => escaped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse;

    const SQL: &str = "
        CREATE TABLE users (id serial PRIMARY KEY, email varchar(255) NOT NULL UNIQUE);
        CREATE TABLE posts (id serial PRIMARY KEY, user_id integer, FOREIGN KEY (user_id) REFERENCES users(id));
    ";

    #[test]
    fn test_basic_diagram() {
        let model = parse(SQL).model;
        let out = to_mermaid(&model, Mode::Normal, &Layout::default());

        assert!(out.starts_with("erDiagram\n"));
        assert!(out.contains("    posts {\n        serial id PK\n        int user_id FK\n    }"));
        assert!(out.contains("        varchar email UK\n"));
        assert!(out.contains("    users |o--o{ posts : \"user_id\"\n"));
    }

    #[test]
    fn test_mandatory_and_one_to_one() {
        let model = parse(
            "CREATE TABLE users (id int PRIMARY KEY);
             CREATE TABLE profiles (user_id int NOT NULL PRIMARY KEY REFERENCES users(id));",
        )
        .model;
        let out = to_mermaid(&model, Mode::Compact, &Layout::default());
        assert!(out.contains("users ||--o| profiles : \"user_id\""));
        assert!(out.contains("int user_id PK,FK"));
    }

    #[test]
    fn test_empty_model() {
        let out = to_mermaid(&SchemaModel::new(), Mode::Normal, &Layout::default());
        assert_eq!(out, "erDiagram\n    %% No tables to display\n");
    }

    #[test]
    fn test_title_front_matter() {
        let layout = Layout {
            title: Some("Shop".to_string()),
            ..Layout::default()
        };
        let out = to_mermaid(&parse(SQL).model, Mode::Normal, &layout);
        assert!(out.starts_with("---\ntitle: Shop\n---\nerDiagram\n"));
    }

    #[test]
    fn test_schema_prefix_and_grouping() {
        let model = parse(
            "CREATE TABLE sales.orders (id int PRIMARY KEY, customer_id int REFERENCES customers(id));
             CREATE TABLE customers (id int PRIMARY KEY);",
        )
        .model;

        let grouped = Layout {
            group_by_schema: true,
            ..Layout::default()
        };
        let out = to_mermaid(&model, Mode::Normal, &grouped);
        let public = out.find("%% Schema: public").unwrap();
        let sales = out.find("%% Schema: sales").unwrap();
        assert!(public < sales);
        assert!(out.contains("    sales__orders {"));
        assert!(out.contains("customers |o--o{ sales__orders"));

        let bare = Layout {
            schema_prefix: false,
            ..Layout::default()
        };
        let out = to_mermaid(&model, Mode::Normal, &bare);
        assert!(out.contains("    orders {"));
        assert!(!out.contains("sales__"));
    }

    #[test]
    fn test_truncation_keeps_keys_in_order() {
        let model = parse(
            "CREATE TABLE wide (a text, b text, c text, id int PRIMARY KEY, d text, e text);",
        )
        .model;
        let table = &model.tables()[0];
        let (cols, omitted) = select_columns(table, Mode::Normal, 3);
        let names: Vec<_> = cols.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "id"]);
        assert_eq!(omitted, 3);

        let layout = Layout {
            max_columns: 3,
            ..Layout::default()
        };
        let out = to_mermaid(&model, Mode::Normal, &layout);
        assert!(out.contains("        %% ... 3 more columns\n"));

        let out = to_mermaid(&model, Mode::Full, &layout);
        assert!(!out.contains("more columns"));
    }

    #[test]
    fn test_full_mode_keeps_raw_types() {
        let model = parse("CREATE TABLE t (amount numeric(10,2), at timestamp with time zone);").model;
        let out = to_mermaid(&model, Mode::Full, &Layout::default());
        assert!(out.contains("numeric(10_2) amount"));
        assert!(out.contains("timestamp_with_time_zone at"));

        let out = to_mermaid(&model, Mode::Normal, &Layout::default());
        assert!(out.contains("numeric amount"));
        assert!(out.contains("timestamp at"));
    }

    #[test]
    fn test_duplicate_relationship_lines_suppressed() {
        let model = parse(
            "CREATE TABLE a (id int PRIMARY KEY);
             CREATE TABLE b (a_id int REFERENCES a(id));
             ALTER TABLE b ADD CONSTRAINT b_a_fk FOREIGN KEY (a_id) REFERENCES a(id);",
        )
        .model;
        assert_eq!(model.relationships().len(), 2);
        let out = to_mermaid(&model, Mode::Normal, &Layout::default());
        assert_eq!(out.matches("a |o--o{ b").count(), 1);
    }

    #[test]
    fn test_dangling_relationship_drawn_only_on_request() {
        let model =
            parse("CREATE TABLE a (id int, ghost_id int REFERENCES ghost(id));").model;
        assert_eq!(model.relationships().len(), 1);

        let out = to_mermaid(&model, Mode::Normal, &Layout::default());
        assert!(!out.contains("ghost |o--o{ a"));
        assert!(!out.contains("%% Relationships"));
        assert!(out.contains("int ghost_id FK"));

        let layout = Layout {
            keep_dangling: true,
            ..Layout::default()
        };
        let out = to_mermaid(&model, Mode::Normal, &layout);
        assert!(out.contains("    ghost |o--o{ a : \"ghost_id\"\n"));
    }

    #[test]
    fn test_escape_mermaid_id() {
        assert_eq!(escape_mermaid_id("order-items"), "order_items");
        assert_eq!(escape_mermaid_id("2fa_codes"), "_2fa_codes");
        assert_eq!(escape_mermaid_id("Straße"), "Stra_e");
    }
}
