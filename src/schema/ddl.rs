//! PostgreSQL DDL parsing for schema extraction.
//!
//! Parses CREATE TABLE and ALTER TABLE statements to extract:
//! - Column definitions with raw types, nullability and defaults
//! - Primary key and unique constraints (inline and table-level)
//! - Foreign key constraints, including ON DELETE / ON UPDATE actions
//!
//! Parsing is best-effort: clauses that are not understood are skipped.

use super::{Column, TableName, DEFAULT_SCHEMA};
use crate::parser::{
    parse_ident_list, split_items, strip_comments, tokenize, StatementType, Token, TokenKind,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// Everything up to the table name of a CREATE TABLE statement
static CREATE_TABLE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^\s*CREATE\s+(?:(?:GLOBAL|LOCAL)\s+)?(?:(?:TEMP|TEMPORARY|UNLOGGED)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?",
    )
    .unwrap()
});

/// Everything up to the table name of an ALTER TABLE statement
static ALTER_TABLE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?").unwrap()
});

/// Keywords that end a column's type and start its constraint list
const COLUMN_CONSTRAINT_KEYWORDS: &[&str] = &[
    "CONSTRAINT",
    "NOT",
    "NULL",
    "DEFAULT",
    "PRIMARY",
    "UNIQUE",
    "REFERENCES",
    "CHECK",
    "COLLATE",
    "GENERATED",
];

/// Keywords that open a table-level item other than a column
const TABLE_CONSTRAINT_KEYWORDS: &[&str] = &["PRIMARY", "FOREIGN", "UNIQUE", "CHECK"];

/// A possibly schema-qualified table reference as written in the statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    /// Identity with the default schema filled in
    pub fn qualified(&self) -> TableName {
        TableName::new(
            self.schema.clone().unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            self.name.clone(),
        )
    }
}

/// A foreign key as declared, before its target is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub target: TableRef,
    /// Empty when the statement relies on the target's primary key
    pub target_columns: Vec<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

/// A table-level constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintDef {
    PrimaryKey(Vec<String>),
    Unique(Vec<String>),
    ForeignKey(ForeignKeyDef),
}

/// A column together with the constraints declared inline on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub column: Column,
    pub primary_key: bool,
    pub unique: bool,
    pub references: Option<ForeignKeyDef>,
}

/// Facts recovered from one CREATE TABLE statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: TableRef,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<ConstraintDef>,
}

/// One action of an ALTER TABLE statement that contributes facts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterAction {
    AddColumn(ColumnDef),
    AddConstraint(ConstraintDef),
}

/// Facts recovered from one statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlFact {
    CreateTable(TableDef),
    AlterTable {
        table: TableRef,
        actions: Vec<AlterAction>,
    },
}

/// What the statement parsers made of a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementOutcome {
    Fact(DdlFact),
    /// Not a statement shape this parser models
    Ignored,
    /// A recognised shape that could not be decomposed
    Unparseable(String),
}

/// Parse one statement into DDL facts
pub fn parse_statement(stmt: &str) -> StatementOutcome {
    let clean = strip_comments(stmt);
    let clean = clean.trim().trim_end_matches(';');

    match StatementType::classify(clean) {
        StatementType::CreateTable => parse_create_table(clean),
        StatementType::AlterTable => parse_alter_table(clean),
        StatementType::Unknown => StatementOutcome::Ignored,
    }
}

/// Parse a CREATE TABLE statement (comments already stripped)
pub fn parse_create_table(stmt: &str) -> StatementOutcome {
    let Some(prefix) = CREATE_TABLE_PREFIX_RE.find(stmt) else {
        return StatementOutcome::Ignored;
    };

    let tokens = tokenize(&stmt[prefix.end()..]);
    let mut pos = 0;
    let Some(name) = parse_table_ref(&tokens, &mut pos) else {
        return StatementOutcome::Unparseable("missing table name".to_string());
    };

    // CREATE TABLE ... AS / PARTITION OF / OF type carry no column list
    let Some(body) = tokens.get(pos).filter(|t| t.kind == TokenKind::Group) else {
        return StatementOutcome::Ignored;
    };

    let mut def = TableDef {
        name,
        columns: Vec::new(),
        constraints: Vec::new(),
    };

    for item in split_items(body.inner()) {
        let item_tokens = tokenize(item);
        if is_table_constraint(&item_tokens) {
            if let Some(constraint) = parse_table_constraint(&item_tokens) {
                def.constraints.push(constraint);
            }
        } else if let Some(column) = parse_column_def(item, &item_tokens) {
            def.columns.push(column);
        }
    }

    StatementOutcome::Fact(DdlFact::CreateTable(def))
}

/// Parse an ALTER TABLE statement (comments already stripped)
pub fn parse_alter_table(stmt: &str) -> StatementOutcome {
    let Some(prefix) = ALTER_TABLE_PREFIX_RE.find(stmt) else {
        return StatementOutcome::Ignored;
    };

    let rest = &stmt[prefix.end()..];
    let tokens = tokenize(rest);
    let mut pos = 0;
    let Some(table) = parse_table_ref(&tokens, &mut pos) else {
        return StatementOutcome::Unparseable("missing table name".to_string());
    };
    let Some(first_action) = tokens.get(pos) else {
        return StatementOutcome::Ignored;
    };

    let mut actions = Vec::new();
    for item in split_items(&rest[first_action.start..]) {
        let item_tokens = tokenize(item);
        if let Some(action) = parse_alter_action(item, &item_tokens) {
            actions.push(action);
        }
    }

    if actions.is_empty() {
        return StatementOutcome::Ignored;
    }

    StatementOutcome::Fact(DdlFact::AlterTable { table, actions })
}

fn parse_alter_action(item: &str, tokens: &[Token<'_>]) -> Option<AlterAction> {
    if !tokens.first()?.is_keyword("ADD") {
        return None;
    }

    let next = tokens.get(1)?;
    if next.is_keyword("CONSTRAINT") || is_table_constraint(&tokens[1..]) {
        return parse_table_constraint(&tokens[1..]).map(AlterAction::AddConstraint);
    }

    // ADD [COLUMN] [IF NOT EXISTS] name type ...
    let mut start = 1;
    if tokens[start].is_keyword("COLUMN") {
        start += 1;
    }
    if keywords_at(tokens, start, &["IF", "NOT", "EXISTS"]) {
        start += 3;
    }
    parse_column_def(item, tokens.get(start..)?).map(AlterAction::AddColumn)
}

/// Whether an item inside a table body is a table-level constraint
fn is_table_constraint(tokens: &[Token<'_>]) -> bool {
    let Some(first) = tokens.first() else {
        return false;
    };
    if first.is_keyword("CONSTRAINT") || first.is_keyword("LIKE") {
        return true;
    }
    // EXCLUDE is not reserved, so `exclude boolean` is a column
    if first.is_keyword("EXCLUDE") {
        return tokens
            .get(1)
            .is_some_and(|t| t.is_keyword("USING") || t.kind == TokenKind::Group);
    }
    TABLE_CONSTRAINT_KEYWORDS.iter().any(|kw| first.is_keyword(kw))
}

/// Parse `[CONSTRAINT name] PRIMARY KEY (...) | UNIQUE (...) | FOREIGN KEY (...) REFERENCES ...`
pub(crate) fn parse_table_constraint(tokens: &[Token<'_>]) -> Option<ConstraintDef> {
    let mut pos = 0;
    let mut name = None;
    if tokens.first()?.is_keyword("CONSTRAINT") {
        name = tokens.get(1).and_then(Token::ident);
        pos = 2;
    }

    if keywords_at(tokens, pos, &["PRIMARY", "KEY"]) {
        let cols = next_group(tokens, pos + 2).map(parse_ident_list)?;
        return (!cols.is_empty()).then_some(ConstraintDef::PrimaryKey(cols));
    }

    if tokens.get(pos)?.is_keyword("UNIQUE") {
        // the column list follows any NULLS [NOT] DISTINCT
        let cols = next_group(tokens, pos + 1).map(parse_ident_list)?;
        return (!cols.is_empty()).then_some(ConstraintDef::Unique(cols));
    }

    if keywords_at(tokens, pos, &["FOREIGN", "KEY"]) {
        let group_pos = tokens
            .iter()
            .skip(pos + 2)
            .position(|t| t.kind == TokenKind::Group)?
            + pos
            + 2;
        let columns = parse_ident_list(tokens[group_pos].inner());
        let mut cursor = group_pos + 1;
        if !tokens.get(cursor)?.is_keyword("REFERENCES") {
            return None;
        }
        cursor += 1;
        let mut fk = parse_references(tokens, &mut cursor)?;
        if columns.is_empty() {
            return None;
        }
        fk.name = name;
        fk.columns = columns;
        return Some(ConstraintDef::ForeignKey(fk));
    }

    // CHECK, EXCLUDE, LIKE
    None
}

/// Parse `table [(cols)] [MATCH ...] [ON DELETE action] [ON UPDATE action]`
/// starting just after REFERENCES. Source columns are left empty.
fn parse_references(tokens: &[Token<'_>], pos: &mut usize) -> Option<ForeignKeyDef> {
    let target = parse_table_ref(tokens, pos)?;
    let mut target_columns = Vec::new();
    if let Some(group) = tokens.get(*pos).filter(|t| t.kind == TokenKind::Group) {
        target_columns = parse_ident_list(group.inner());
        *pos += 1;
    }

    let mut fk = ForeignKeyDef {
        name: None,
        columns: Vec::new(),
        target,
        target_columns,
        on_delete: None,
        on_update: None,
    };

    while let Some(tok) = tokens.get(*pos) {
        if tok.is_keyword("MATCH") {
            *pos += 2;
        } else if tok.is_keyword("ON") {
            let event = tokens.get(*pos + 1);
            *pos += 2;
            let action = parse_referential_action(tokens, pos);
            match event {
                Some(e) if e.is_keyword("DELETE") => fk.on_delete = action,
                Some(e) if e.is_keyword("UPDATE") => fk.on_update = action,
                _ => {}
            }
        } else {
            break;
        }
    }

    Some(fk)
}

/// CASCADE | RESTRICT | NO ACTION | SET NULL | SET DEFAULT, optionally with a column list
fn parse_referential_action(tokens: &[Token<'_>], pos: &mut usize) -> Option<String> {
    let first = tokens.get(*pos)?;
    let words = if first.is_keyword("NO") || first.is_keyword("SET") {
        2
    } else if first.is_keyword("CASCADE") || first.is_keyword("RESTRICT") {
        1
    } else {
        return None;
    };

    let action = tokens
        .get(*pos..*pos + words)?
        .iter()
        .map(|t| t.text.to_uppercase())
        .collect::<Vec<_>>()
        .join(" ");
    *pos += words;
    // SET NULL (col, ...) in PostgreSQL 15+
    if tokens.get(*pos).is_some_and(|t| t.kind == TokenKind::Group) {
        *pos += 1;
    }
    Some(action)
}

/// Parse `name type [constraints...]`
fn parse_column_def(item: &str, tokens: &[Token<'_>]) -> Option<ColumnDef> {
    let name = tokens.first()?.ident()?;

    let keyword_at = tokens
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, t)| COLUMN_CONSTRAINT_KEYWORDS.iter().any(|kw| t.is_keyword(kw)))
        .map(|(i, _)| i)
        .unwrap_or(tokens.len());

    // a column needs a type
    if keyword_at < 2 {
        return None;
    }
    let type_end = tokens[keyword_at - 1].end;
    let data_type = collapse_whitespace(&item[tokens[1].start..type_end]);

    let mut def = ColumnDef {
        column: Column::new(name, data_type),
        primary_key: false,
        unique: false,
        references: None,
    };

    let mut pos = keyword_at;
    let mut constraint_name = None;
    while let Some(tok) = tokens.get(pos) {
        if tok.is_keyword("CONSTRAINT") {
            constraint_name = tokens.get(pos + 1).and_then(Token::ident);
            pos += 2;
        } else if keywords_at(tokens, pos, &["NOT", "NULL"]) {
            def.column.nullable = false;
            pos += 2;
        } else if tok.is_keyword("NULL") {
            def.column.nullable = true;
            pos += 1;
        } else if tok.is_keyword("DEFAULT") {
            let expr_start = pos + 1;
            // the first token always belongs to the expression
            let mut end = expr_start + 1;
            while end < tokens.len() && !ends_clause(&tokens[end]) {
                end += 1;
            }
            if let (Some(first), Some(last)) = (tokens.get(expr_start), tokens.get(end - 1)) {
                def.column.default = Some(collapse_whitespace(&item[first.start..last.end]));
            }
            pos = end;
        } else if keywords_at(tokens, pos, &["PRIMARY", "KEY"]) {
            def.primary_key = true;
            pos += 2;
        } else if tok.is_keyword("UNIQUE") {
            def.unique = true;
            pos += 1;
        } else if tok.is_keyword("REFERENCES") {
            pos += 1;
            if let Some(mut fk) = parse_references(tokens, &mut pos) {
                fk.name = constraint_name.take();
                fk.columns = vec![def.column.name.clone()];
                def.references = Some(fk);
            }
        } else if tok.is_keyword("GENERATED") {
            // GENERATED { ALWAYS | BY DEFAULT } AS ...
            pos += 1;
            while pos < tokens.len() && !ends_clause(&tokens[pos]) {
                pos += 1;
            }
        } else {
            // CHECK (...), COLLATE name, DEFERRABLE, ...
            pos += 1;
        }
    }

    Some(def)
}

/// Constraint keywords that end a DEFAULT or GENERATED clause
fn ends_clause(tok: &Token<'_>) -> bool {
    COLUMN_CONSTRAINT_KEYWORDS
        .iter()
        .filter(|kw| **kw != "DEFAULT")
        .any(|kw| tok.is_keyword(kw))
}

/// Parse `ident [. ident [. ident]]`, keeping the last two parts
fn parse_table_ref(tokens: &[Token<'_>], pos: &mut usize) -> Option<TableRef> {
    let mut parts = vec![tokens.get(*pos)?.ident()?];
    *pos += 1;

    while tokens.get(*pos).is_some_and(|t| t.is_punct('.')) {
        let Some(part) = tokens.get(*pos + 1).and_then(Token::ident) else {
            break;
        };
        parts.push(part);
        *pos += 2;
    }

    let name = parts.pop()?;
    Some(TableRef {
        schema: parts.pop(),
        name,
    })
}

/// Whether the tokens at `pos` are exactly the given keywords in order
fn keywords_at(tokens: &[Token<'_>], pos: usize, keywords: &[&str]) -> bool {
    keywords
        .iter()
        .enumerate()
        .all(|(i, kw)| tokens.get(pos + i).is_some_and(|t| t.is_keyword(kw)))
}

/// Inner text of the first group at or after `pos`
fn next_group<'a>(tokens: &[Token<'a>], pos: usize) -> Option<&'a str> {
    tokens
        .iter()
        .skip(pos)
        .find(|t| t.kind == TokenKind::Group)
        .map(|t| t.inner())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(sql: &str) -> TableDef {
        match parse_statement(sql) {
            StatementOutcome::Fact(DdlFact::CreateTable(def)) => def,
            other => panic!("expected CREATE TABLE fact, got {:?}", other),
        }
    }

    fn alter(sql: &str) -> (TableRef, Vec<AlterAction>) {
        match parse_statement(sql) {
            StatementOutcome::Fact(DdlFact::AlterTable { table, actions }) => (table, actions),
            other => panic!("expected ALTER TABLE fact, got {:?}", other),
        }
    }

    #[test]
    fn test_columns_in_order() {
        let def = create("CREATE TABLE t (a int, b text, c numeric(10,2));");
        let names: Vec<_> = def.columns.iter().map(|c| c.column.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(def.columns[2].column.data_type, "numeric(10,2)");
    }

    #[test]
    fn test_multiword_types() {
        let def = create(
            "CREATE TABLE t (a character varying(255) NOT NULL, b timestamp with time zone DEFAULT now(), c integer[])",
        );
        assert_eq!(def.columns[0].column.data_type, "character varying(255)");
        assert!(!def.columns[0].column.nullable);
        assert_eq!(def.columns[1].column.data_type, "timestamp with time zone");
        assert_eq!(def.columns[1].column.default.as_deref(), Some("now()"));
        assert_eq!(def.columns[2].column.data_type, "integer[]");
    }

    #[test]
    fn test_default_expression_is_whole() {
        let def = create(
            "CREATE TABLE t (id integer DEFAULT nextval('t_id_seq'::regclass) NOT NULL, s text DEFAULT 'a b' UNIQUE)",
        );
        assert_eq!(
            def.columns[0].column.default.as_deref(),
            Some("nextval('t_id_seq'::regclass)")
        );
        assert!(!def.columns[0].column.nullable);
        assert_eq!(def.columns[1].column.default.as_deref(), Some("'a b'"));
        assert!(def.columns[1].unique);
    }

    #[test]
    fn test_qualified_and_quoted_names() {
        let def = create(r#"CREATE TABLE IF NOT EXISTS "Sales"."OrderItems" ("Id" int, Qty INT)"#);
        assert_eq!(def.name.schema.as_deref(), Some("Sales"));
        assert_eq!(def.name.name, "OrderItems");
        assert_eq!(def.columns[0].column.name, "Id");
        assert_eq!(def.columns[1].column.name, "qty");
    }

    #[test]
    fn test_unquoted_names_fold_to_lowercase() {
        let def = create("CREATE TABLE Public.Users (ID int)");
        assert_eq!(def.name.qualified(), TableName::public("users"));
        assert_eq!(def.columns[0].column.name, "id");
    }

    #[test]
    fn test_inline_references() {
        let def = create(
            "CREATE TABLE posts (user_id int CONSTRAINT fk_user REFERENCES auth.users (id) ON DELETE CASCADE)",
        );
        let fk = def.columns[0].references.as_ref().unwrap();
        assert_eq!(fk.name.as_deref(), Some("fk_user"));
        assert_eq!(fk.columns, vec!["user_id"]);
        assert_eq!(fk.target.schema.as_deref(), Some("auth"));
        assert_eq!(fk.target.name, "users");
        assert_eq!(fk.target_columns, vec!["id"]);
        assert_eq!(fk.on_delete.as_deref(), Some("CASCADE"));
    }

    #[test]
    fn test_references_without_columns() {
        let def = create("CREATE TABLE posts (user_id int REFERENCES users)");
        let fk = def.columns[0].references.as_ref().unwrap();
        assert!(fk.target_columns.is_empty());
    }

    #[test]
    fn test_table_level_constraints() {
        let def = create(
            "CREATE TABLE m (a int, b int, PRIMARY KEY (a, b), CONSTRAINT u UNIQUE (b), \
             CONSTRAINT fk FOREIGN KEY (a, b) REFERENCES other(x, y) ON UPDATE SET NULL, CHECK (a > b))",
        );
        assert_eq!(def.columns.len(), 2);
        assert_eq!(def.constraints.len(), 3);
        assert_eq!(
            def.constraints[0],
            ConstraintDef::PrimaryKey(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(def.constraints[1], ConstraintDef::Unique(vec!["b".to_string()]));
        match &def.constraints[2] {
            ConstraintDef::ForeignKey(fk) => {
                assert_eq!(fk.name.as_deref(), Some("fk"));
                assert_eq!(fk.columns, vec!["a", "b"]);
                assert_eq!(fk.target_columns, vec!["x", "y"]);
                assert_eq!(fk.on_update.as_deref(), Some("SET NULL"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_exclude_column_versus_exclude_constraint() {
        let def = create(
            "CREATE TABLE t (id int, exclude boolean, note text, \
             EXCLUDE USING gist (id WITH =), EXCLUDE (note WITH =))",
        );
        let names: Vec<_> = def.columns.iter().map(|c| c.column.name.as_str()).collect();
        assert_eq!(names, vec!["id", "exclude", "note"]);
        assert_eq!(def.columns[1].column.data_type, "boolean");
        assert!(def.constraints.is_empty());
    }

    #[test]
    fn test_generated_identity_does_not_read_as_default() {
        let def = create("CREATE TABLE t (id bigint GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY)");
        assert_eq!(def.columns[0].column.data_type, "bigint");
        assert!(def.columns[0].column.default.is_none());
        assert!(def.columns[0].primary_key);
    }

    #[test]
    fn test_alter_add_foreign_key() {
        let (table, actions) = alter(
            "ALTER TABLE ONLY public.posts\n    ADD CONSTRAINT posts_user_fk FOREIGN KEY (user_id) REFERENCES public.users(id) ON DELETE SET NULL;",
        );
        assert_eq!(table.qualified(), TableName::public("posts"));
        match &actions[0] {
            AlterAction::AddConstraint(ConstraintDef::ForeignKey(fk)) => {
                assert_eq!(fk.name.as_deref(), Some("posts_user_fk"));
                assert_eq!(fk.on_delete.as_deref(), Some("SET NULL"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_alter_add_primary_key_and_unique() {
        let (_, actions) = alter(
            "ALTER TABLE t ADD CONSTRAINT t_pkey PRIMARY KEY (id), ADD CONSTRAINT t_email UNIQUE (email)",
        );
        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[0],
            AlterAction::AddConstraint(ConstraintDef::PrimaryKey(vec!["id".to_string()]))
        );
        assert_eq!(
            actions[1],
            AlterAction::AddConstraint(ConstraintDef::Unique(vec!["email".to_string()]))
        );
    }

    #[test]
    fn test_alter_add_column() {
        let (_, actions) = alter("ALTER TABLE t ADD COLUMN IF NOT EXISTS note text NOT NULL");
        match &actions[0] {
            AlterAction::AddColumn(def) => {
                assert_eq!(def.column.name, "note");
                assert_eq!(def.column.data_type, "text");
                assert!(!def.column.nullable);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_other_statements_are_ignored() {
        assert_eq!(
            parse_statement("ALTER TABLE public.t OWNER TO postgres;"),
            StatementOutcome::Ignored
        );
        assert_eq!(
            parse_statement("CREATE VIEW v AS SELECT 1;"),
            StatementOutcome::Ignored
        );
        assert_eq!(
            parse_statement("CREATE TABLE t2 AS SELECT * FROM t;"),
            StatementOutcome::Ignored
        );
    }

    #[test]
    fn test_missing_name_is_unparseable() {
        assert!(matches!(
            parse_statement("CREATE TABLE (id int);"),
            StatementOutcome::Unparseable(_)
        ));
    }
}
