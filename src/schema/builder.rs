//! Accumulates parsed DDL facts into a [`SchemaModel`].
//!
//! Facts are collected in one left-to-right pass. Foreign keys and
//! constraints added through ALTER TABLE are deferred and applied in a
//! resolution pass once every table is known, so statement order never
//! matters for references.

use super::ddl::{
    parse_statement, AlterAction, ColumnDef, ConstraintDef, DdlFact, ForeignKeyDef,
    StatementOutcome, TableDef,
};
use super::{ParseResult, Relationship, SchemaModel, Table, TableName};
use crate::parser::{strip_comments, OpenSpan};
use std::fmt;

/// Problems noticed while parsing; none of them stop the parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// A second CREATE TABLE for an identity already defined (ignored)
    DuplicateTable { table: TableName },
    /// A foreign key whose target table was never defined
    DanglingRelationship {
        source: TableName,
        target: TableName,
    },
    /// A constraint names a column the table does not have
    UnknownColumn { table: TableName, column: String },
    /// An ALTER TABLE targets a table that was never defined
    UnknownTable { table: TableName },
    /// Input ended inside a literal or comment
    Unterminated(OpenSpan),
    /// A CREATE/ALTER TABLE statement that could not be decomposed
    UnparseableStatement {
        reason: String,
        statement_preview: String,
    },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::DuplicateTable { table } => {
                write!(f, "duplicate CREATE TABLE for {} (keeping the first)", table)
            }
            ParseWarning::DanglingRelationship { source, target } => {
                write!(f, "foreign key from {} references unknown table {}", source, target)
            }
            ParseWarning::UnknownColumn { table, column } => {
                write!(f, "constraint on {} names unknown column {}", table, column)
            }
            ParseWarning::UnknownTable { table } => {
                write!(f, "ALTER TABLE targets unknown table {}", table)
            }
            ParseWarning::Unterminated(open) => {
                write!(f, "input ended inside an unterminated {}", open)
            }
            ParseWarning::UnparseableStatement {
                reason,
                statement_preview,
            } => write!(f, "skipped statement ({}): {}", reason, statement_preview),
        }
    }
}

/// Parsing statistics, returned alongside the model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Statements seen by the builder
    pub statements: usize,
    /// Statements that contributed no facts
    pub statements_skipped: usize,
    pub tables: usize,
    pub columns: usize,
    pub relationships: usize,
    pub dangling_relationships: usize,
    pub duplicate_tables: usize,
    pub warnings: Vec<ParseWarning>,
}

/// A constraint waiting for the resolution pass
#[derive(Debug, Clone)]
enum Deferred {
    AddColumn(TableName, ColumnDef),
    Constraint(TableName, ConstraintDef),
}

/// Builder for constructing a schema model from DDL statements
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    model: SchemaModel,
    stats: ParseStats,
    deferred: Vec<Deferred>,
    foreign_keys: Vec<(TableName, ForeignKeyDef)>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one statement from the splitter
    pub fn add_statement(&mut self, stmt: &str) {
        self.stats.statements += 1;

        match parse_statement(stmt) {
            StatementOutcome::Fact(DdlFact::CreateTable(def)) => self.add_table(def),
            StatementOutcome::Fact(DdlFact::AlterTable { table, actions }) => {
                let table = table.qualified();
                for action in actions {
                    self.deferred.push(match action {
                        AlterAction::AddColumn(col) => Deferred::AddColumn(table.clone(), col),
                        AlterAction::AddConstraint(c) => Deferred::Constraint(table.clone(), c),
                    });
                }
            }
            StatementOutcome::Ignored => self.stats.statements_skipped += 1,
            StatementOutcome::Unparseable(reason) => {
                self.stats.statements_skipped += 1;
                self.warn(ParseWarning::UnparseableStatement {
                    reason,
                    statement_preview: preview(stmt),
                });
            }
        }
    }

    pub fn warn(&mut self, warning: ParseWarning) {
        self.stats.warnings.push(warning);
    }

    fn add_table(&mut self, def: TableDef) {
        let name = def.name.qualified();
        if self.model.contains(&name) {
            self.stats.duplicate_tables += 1;
            self.warn(ParseWarning::DuplicateTable { table: name });
            return;
        }

        let mut table = Table::new(name.clone());
        let mut inline = Vec::new();
        for col in def.columns {
            inline.extend(push_column(&mut table, col));
        }
        self.model.insert_table(table);

        for constraint in inline.into_iter().chain(def.constraints) {
            self.apply_constraint(&name, constraint);
        }
    }

    fn apply_constraint(&mut self, table_name: &TableName, constraint: ConstraintDef) {
        if let ConstraintDef::ForeignKey(fk) = constraint {
            self.foreign_keys.push((table_name.clone(), fk));
            return;
        }

        let Some(table) = self.model.table_mut(table_name) else {
            self.stats.warnings.push(ParseWarning::UnknownTable {
                table: table_name.clone(),
            });
            return;
        };

        let mut unknown = Vec::new();
        match constraint {
            ConstraintDef::PrimaryKey(cols) => {
                for col_name in cols {
                    match table.get_column_mut(&col_name) {
                        Some(col) => col.is_primary_key = true,
                        None => unknown.push(col_name.clone()),
                    }
                    if !table.primary_key.contains(&col_name) {
                        table.primary_key.push(col_name);
                    }
                }
            }
            ConstraintDef::Unique(cols) => {
                unknown.extend(
                    cols.iter()
                        .filter(|c| table.get_column(c).is_none())
                        .cloned(),
                );
                if let [single] = cols.as_slice() {
                    if let Some(col) = table.get_column_mut(single) {
                        col.is_unique = true;
                    }
                } else if !table.unique_constraints.contains(&cols) {
                    table.unique_constraints.push(cols);
                }
            }
            ConstraintDef::ForeignKey(_) => {}
        }

        for column in unknown {
            self.warn(ParseWarning::UnknownColumn {
                table: table_name.clone(),
                column,
            });
        }
    }

    /// Apply deferred ALTER TABLE facts and resolve every foreign key
    fn resolve(&mut self) {
        for deferred in std::mem::take(&mut self.deferred) {
            match deferred {
                Deferred::AddColumn(table_name, def) => {
                    let Some(mut table) = self.model.table(&table_name).cloned() else {
                        self.warn(ParseWarning::UnknownTable { table: table_name });
                        continue;
                    };
                    if table.get_column(&def.column.name).is_some() {
                        continue;
                    }
                    let inline = push_column(&mut table, def);
                    if let Some(slot) = self.model.table_mut(&table_name) {
                        *slot = table;
                    }
                    for constraint in inline {
                        self.apply_constraint(&table_name, constraint);
                    }
                }
                Deferred::Constraint(table_name, constraint) => {
                    self.apply_constraint(&table_name, constraint);
                }
            }
        }

        for (source, fk) in std::mem::take(&mut self.foreign_keys) {
            let relationship = self.resolve_foreign_key(source, fk);
            self.model.push_relationship(relationship);
        }
    }

    fn resolve_foreign_key(&mut self, source: TableName, fk: ForeignKeyDef) -> Relationship {
        let target = match &fk.target.schema {
            Some(_) => fk.target.qualified(),
            None => self
                .model
                .find_by_name(&fk.target.name, &source.schema)
                .map(Table::qualified_name)
                .unwrap_or_else(|| fk.target.qualified()),
        };

        let mut target_columns = fk.target_columns;
        let target_pk = self.model.table(&target).map(|t| t.primary_key.clone());
        let source_known = self.model.contains(&source);
        match target_pk {
            Some(pk) if target_columns.is_empty() => target_columns = pk,
            Some(_) => {}
            None => self.warn(ParseWarning::DanglingRelationship {
                source: source.clone(),
                target: target.clone(),
            }),
        }
        if !source_known || !self.model.contains(&target) {
            self.stats.dangling_relationships += 1;
        }

        match self.model.table_mut(&source) {
            Some(table) => {
                let mut unknown = Vec::new();
                for col_name in &fk.columns {
                    match table.get_column_mut(col_name) {
                        Some(col) => col.is_foreign_key = true,
                        None => unknown.push(col_name.clone()),
                    }
                }
                for column in unknown {
                    self.warn(ParseWarning::UnknownColumn {
                        table: source.clone(),
                        column,
                    });
                }
            }
            None => self.warn(ParseWarning::UnknownTable {
                table: source.clone(),
            }),
        }

        Relationship {
            source,
            source_columns: fk.columns,
            target,
            target_columns,
            constraint_name: fk.name,
            on_delete: fk.on_delete,
            on_update: fk.on_update,
        }
    }

    /// Finish the build: run the resolution pass and fill in the statistics
    pub fn build(mut self) -> ParseResult {
        self.resolve();

        self.stats.tables = self.model.len();
        self.stats.columns = self.model.column_count();
        self.stats.relationships = self.model.relationships().len();

        ParseResult {
            model: self.model,
            stats: self.stats,
        }
    }
}

/// Push a column, returning the constraints it declared inline
fn push_column(table: &mut Table, def: ColumnDef) -> Vec<ConstraintDef> {
    let mut constraints = Vec::new();
    let column_name = def.column.name.clone();
    if def.primary_key {
        constraints.push(ConstraintDef::PrimaryKey(vec![column_name.clone()]));
    }
    if def.unique {
        constraints.push(ConstraintDef::Unique(vec![column_name]));
    }
    if let Some(fk) = def.references {
        constraints.push(ConstraintDef::ForeignKey(fk));
    }
    table.columns.push(def.column);
    constraints
}

/// Statement text without comments, shortened for warnings
fn preview(stmt: &str) -> String {
    let text = strip_comments(stmt);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() > 60 {
        let cut: String = text.chars().take(57).collect();
        format!("{}...", cut)
    } else {
        text
    }
}
