//! Inclusion and exclusion policies over a [`SchemaModel`].
//!
//! Filtering is a single pass: admit tables by schema and name, keep the
//! relationships whose endpoints were admitted, then (with connected-only)
//! narrow the tables to relationship endpoints.

mod matcher;

pub use matcher::TableMatcher;

use crate::schema::{SchemaModel, TableName};
use ahash::AHashSet;

/// Filter policies; categories AND together, entries within one OR together
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Keep only these schemas (all when empty)
    pub include_schemas: Vec<String>,
    /// Drop these schemas
    pub exclude_schemas: Vec<String>,
    /// Keep only matching tables (all when empty)
    pub include_tables: TableMatcher,
    /// Drop matching tables
    pub exclude_tables: TableMatcher,
    /// Drop tables that end up on no relationship
    pub connected_only: bool,
    /// Keep relationships whose target table was never defined
    pub keep_dangling: bool,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_schemas.extend(schemas.into_iter().map(Into::into));
        self
    }

    pub fn without_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_schemas.extend(schemas.into_iter().map(Into::into));
        self
    }

    /// Set include globs; a malformed pattern is a configuration error
    pub fn with_tables<I, S>(mut self, patterns: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.include_tables = TableMatcher::compile(patterns)?;
        Ok(self)
    }

    /// Set exclude globs; a malformed pattern is a configuration error
    pub fn without_tables<I, S>(mut self, patterns: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_tables = TableMatcher::compile(patterns)?;
        Ok(self)
    }

    pub fn connected_only(mut self, enabled: bool) -> Self {
        self.connected_only = enabled;
        self
    }

    pub fn keep_dangling(mut self, enabled: bool) -> Self {
        self.keep_dangling = enabled;
        self
    }

    /// Schema and name predicates for a single table identity
    pub fn admits(&self, table: &TableName) -> bool {
        let schema_in =
            |list: &[String]| list.iter().any(|s| s.eq_ignore_ascii_case(&table.schema));

        if !self.include_schemas.is_empty() && !schema_in(&self.include_schemas) {
            return false;
        }
        if schema_in(&self.exclude_schemas) {
            return false;
        }
        if self.exclude_tables.matches(table) {
            return false;
        }
        self.include_tables.is_empty() || self.include_tables.matches(table)
    }
}

/// Apply the filter policies, producing a new model. The input is untouched
/// and applying the same options to the output changes nothing.
pub fn filter(model: &SchemaModel, options: &FilterOptions) -> SchemaModel {
    let admitted: AHashSet<TableName> = model
        .tables()
        .iter()
        .map(|t| t.qualified_name())
        .filter(|name| options.admits(name))
        .collect();

    let relationships: Vec<_> = model
        .relationships()
        .iter()
        .filter(|rel| {
            if !admitted.contains(&rel.source) {
                return false;
            }
            if admitted.contains(&rel.target) {
                return true;
            }
            options.keep_dangling && !model.contains(&rel.target) && options.admits(&rel.target)
        })
        .cloned()
        .collect();

    let connected: Option<AHashSet<&TableName>> = options.connected_only.then(|| {
        relationships
            .iter()
            .flat_map(|rel| [&rel.source, &rel.target])
            .collect()
    });

    let tables = model
        .tables()
        .iter()
        .filter(|t| {
            let name = t.qualified_name();
            admitted.contains(&name) && connected.as_ref().map_or(true, |c| c.contains(&name))
        })
        .cloned()
        .collect();

    SchemaModel::from_parts(tables, relationships)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse;

    const SQL: &str = "
        CREATE TABLE users (id int PRIMARY KEY);
        CREATE TABLE posts (id int PRIMARY KEY, user_id int REFERENCES users(id));
        CREATE TABLE users_backup (id int PRIMARY KEY);
        CREATE TABLE audit.events (id int PRIMARY KEY, backup_id int REFERENCES users_backup(id));
        CREATE TABLE lonely (id int);
    ";

    fn names(model: &SchemaModel) -> Vec<String> {
        model.tables().iter().map(|t| t.qualified_name().to_string()).collect()
    }

    #[test]
    fn test_noop_keeps_everything() {
        let model = parse(SQL).model;
        let out = filter(&model, &FilterOptions::new());
        assert_eq!(out, model);
    }

    #[test]
    fn test_schema_allow_and_deny() {
        let model = parse(SQL).model;
        let out = filter(&model, &FilterOptions::new().with_schemas(["AUDIT"]));
        assert_eq!(names(&out), vec!["audit.events"]);
        assert!(out.relationships().is_empty());

        let out = filter(&model, &FilterOptions::new().without_schemas(["audit"]));
        assert!(!names(&out).contains(&"audit.events".to_string()));
        assert_eq!(out.relationships().len(), 1);
    }

    #[test]
    fn test_exclude_drops_target_and_its_relationships() {
        let model = parse(SQL).model;
        let opts = FilterOptions::new().without_tables(["*_backup"]).unwrap();
        let out = filter(&model, &opts);
        assert!(!names(&out).contains(&"public.users_backup".to_string()));
        assert!(names(&out).contains(&"audit.events".to_string()));
        assert!(out
            .relationships()
            .iter()
            .all(|r| r.target.name != "users_backup"));
    }

    #[test]
    fn test_connected_only() {
        let model = parse(SQL).model;
        let out = filter(&model, &FilterOptions::new().connected_only(true));
        assert!(!names(&out).contains(&"public.lonely".to_string()));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_connected_only_after_exclusion() {
        let model = parse(SQL).model;
        let opts = FilterOptions::new()
            .without_tables(["users_backup"])
            .unwrap()
            .connected_only(true);
        let out = filter(&model, &opts);
        assert_eq!(names(&out), vec!["public.users", "public.posts"]);
    }

    #[test]
    fn test_dangling_relationships() {
        let model = parse("CREATE TABLE a (id int, ghost_id int REFERENCES ghost(id));").model;
        let out = filter(&model, &FilterOptions::new());
        assert!(out.relationships().is_empty());

        let out = filter(&model, &FilterOptions::new().keep_dangling(true));
        assert_eq!(out.relationships().len(), 1);
    }

    #[test]
    fn test_idempotent() {
        let model = parse(SQL).model;
        let opts = FilterOptions::new()
            .with_tables(["*s", "events"])
            .unwrap()
            .connected_only(true)
            .keep_dangling(true);
        let once = filter(&model, &opts);
        let twice = filter(&once, &opts);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_malformed_glob_is_error() {
        assert!(FilterOptions::new().with_tables(["[abc"]).is_err());
    }
}
