//! Schema model recovered from a PostgreSQL dump.
//!
//! This module provides:
//! - Data models for tables, columns, and foreign-key relationships
//! - DDL parsing for `CREATE TABLE` and `ALTER TABLE` statements
//! - A builder that resolves forward references once all statements are seen

mod builder;
mod ddl;

pub use builder::*;
pub use ddl::*;

use crate::parser::Splitter;
use ahash::AHashMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema assumed for unqualified table names
pub const DEFAULT_SCHEMA: &str = "public";

/// Table identity: `(schema, name)` after identifier case folding
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct TableName {
    pub schema: String,
    pub name: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// A name in the default `public` schema
    pub fn public(name: impl Into<String>) -> Self {
        Self::new(DEFAULT_SCHEMA, name)
    }

    pub fn is_public(&self) -> bool {
        self.schema == DEFAULT_SCHEMA
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Column definition within a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type, as written (whitespace collapsed)
    #[serde(rename = "type")]
    pub data_type: String,
    /// Whether this column allows NULL values
    pub nullable: bool,
    /// Raw DEFAULT expression
    #[serde(default)]
    pub default: Option<String>,
    /// Whether this column is part of the primary key
    #[serde(default)]
    pub is_primary_key: bool,
    /// Whether this column is the source of a foreign key
    #[serde(default)]
    pub is_foreign_key: bool,
    /// Whether a single-column unique constraint covers this column
    #[serde(default)]
    pub is_unique: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            is_primary_key: false,
            is_foreign_key: false,
            is_unique: false,
        }
    }

    /// Columns shown in compact mode
    pub fn is_key(&self) -> bool {
        self.is_primary_key || self.is_foreign_key
    }
}

/// Complete table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    pub schema: String,
    pub name: String,
    /// Column definitions in declaration order
    pub columns: Vec<Column>,
    /// Primary key column names (ordered for composite keys)
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Unique constraints spanning more than one column
    #[serde(default)]
    pub unique_constraints: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: TableName) -> Self {
        Self {
            schema: name.schema,
            name: name.name,
            columns: Vec::new(),
            primary_key: Vec::new(),
            unique_constraints: Vec::new(),
        }
    }

    pub fn qualified_name(&self) -> TableName {
        TableName::new(self.schema.clone(), self.name.clone())
    }

    /// Get a column by its (already normalized) name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Whether the given column set is guaranteed unique in this table
    pub fn is_unique_set(&self, columns: &[String]) -> bool {
        if columns.is_empty() {
            return false;
        }
        if same_set(columns, &self.primary_key) {
            return true;
        }
        if let [single] = columns {
            if self.get_column(single).is_some_and(|c| c.is_unique) {
                return true;
            }
        }
        self.unique_constraints.iter().any(|u| same_set(columns, u))
    }
}

fn same_set(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().all(|c| b.contains(c))
}

/// A foreign-key relationship, always pointing from the referencing table
/// (source) to the referenced table (target). Columns pair up by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Relationship {
    pub source: TableName,
    pub source_columns: Vec<String>,
    pub target: TableName,
    pub target_columns: Vec<String>,
    #[serde(default)]
    pub constraint_name: Option<String>,
    #[serde(default)]
    pub on_delete: Option<String>,
    #[serde(default)]
    pub on_update: Option<String>,
}

impl Relationship {
    /// Ordered `(source column, target column)` pairs
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.source_columns
            .iter()
            .zip(self.target_columns.iter())
            .map(|(s, t)| (s.as_str(), t.as_str()))
    }
}

/// Relationship shape as seen from the referencing side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Many source rows reference one target row
    #[default]
    ManyToOne,
    /// The FK columns are unique, so at most one source row per target row
    OneToOne,
}

/// All tables and relationships recovered from a dump
#[derive(Debug, Clone, Default)]
pub struct SchemaModel {
    tables: Vec<Table>,
    relationships: Vec<Relationship>,
    index: AHashMap<TableName, usize>,
}

impl PartialEq for SchemaModel {
    fn eq(&self, other: &Self) -> bool {
        self.tables == other.tables && self.relationships == other.relationships
    }
}

impl Eq for SchemaModel {}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from parts. Later tables with an identity already seen
    /// are dropped (first definition wins).
    pub fn from_parts(tables: Vec<Table>, relationships: Vec<Relationship>) -> Self {
        let mut model = Self::new();
        for table in tables {
            model.insert_table(table);
        }
        model.relationships = relationships;
        model
    }

    /// Read back a model rendered in the JSON format
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        crate::render::json::from_json(text)
    }

    /// Insert a table; returns false (and keeps the existing one) on duplicates
    pub fn insert_table(&mut self, table: Table) -> bool {
        let name = table.qualified_name();
        if self.index.contains_key(&name) {
            return false;
        }
        self.index.insert(name, self.tables.len());
        self.tables.push(table);
        true
    }

    pub fn push_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    /// Tables in insertion order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn table(&self, name: &TableName) -> Option<&Table> {
        self.index.get(name).map(|&i| &self.tables[i])
    }

    pub fn table_mut(&mut self, name: &TableName) -> Option<&mut Table> {
        match self.index.get(name) {
            Some(&i) => self.tables.get_mut(i),
            None => None,
        }
    }

    pub fn contains(&self, name: &TableName) -> bool {
        self.index.contains_key(name)
    }

    /// Both endpoints of the relationship exist in this model
    pub fn is_resolved(&self, relationship: &Relationship) -> bool {
        self.contains(&relationship.source) && self.contains(&relationship.target)
    }

    /// Find a table by bare name, preferring the given schema, then `public`,
    /// then any schema holding exactly one table of that name.
    pub fn find_by_name(&self, name: &str, preferred_schema: &str) -> Option<&Table> {
        if let Some(t) = self.table(&TableName::new(preferred_schema, name)) {
            return Some(t);
        }
        if let Some(t) = self.table(&TableName::public(name)) {
            return Some(t);
        }
        let mut candidates = self.tables.iter().filter(|t| t.name == name);
        match (candidates.next(), candidates.next()) {
            (Some(t), None) => Some(t),
            _ => None,
        }
    }

    pub fn cardinality(&self, relationship: &Relationship) -> Cardinality {
        match self.table(&relationship.source) {
            Some(t) if t.is_unique_set(&relationship.source_columns) => Cardinality::OneToOne,
            _ => Cardinality::ManyToOne,
        }
    }

    /// Whether a referencing row may exist without a referenced row
    /// (any FK column nullable, or the column is unknown).
    pub fn is_optional(&self, relationship: &Relationship) -> bool {
        let Some(table) = self.table(&relationship.source) else {
            return true;
        };
        relationship
            .source_columns
            .iter()
            .any(|c| !table.get_column(c).is_some_and(|col| !col.nullable))
    }

    /// Distinct schema names, sorted
    pub fn schemas(&self) -> Vec<&str> {
        let mut schemas: Vec<&str> = self.tables.iter().map(|t| t.schema.as_str()).collect();
        schemas.sort_unstable();
        schemas.dedup();
        schemas
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    /// Tables sorted by `(schema, name)`
    pub fn sorted_tables(&self) -> Vec<&Table> {
        let mut tables: Vec<&Table> = self.tables.iter().collect();
        tables.sort_by(|a, b| (&a.schema, &a.name).cmp(&(&b.schema, &b.name)));
        tables
    }
}

/// Outcome of parsing a dump: the model plus what happened along the way
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub model: SchemaModel,
    pub stats: ParseStats,
}

/// Parse dump text into a schema model.
///
/// Never fails: statements it cannot use are skipped and counted, and
/// problems are reported as warnings in the returned statistics.
pub fn parse(sql: &str) -> ParseResult {
    let mut splitter = Splitter::new(sql);
    let mut builder = SchemaBuilder::new();

    for stmt in splitter.by_ref() {
        builder.add_statement(stmt);
    }
    if let Some(open) = splitter.unterminated() {
        builder.warn(ParseWarning::Unterminated(open));
    }

    builder.build()
}
