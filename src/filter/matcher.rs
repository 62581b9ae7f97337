//! Glob matching of table names for include/exclude filters.

use crate::schema::TableName;
use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A compiled set of table-name globs.
///
/// A pattern containing `.` is matched against `schema.name`; any other
/// pattern is matched against the bare table name. Matching ignores case
/// and is anchored to the whole string.
#[derive(Debug, Clone, Default)]
pub struct TableMatcher {
    patterns: Vec<CompiledPattern>,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    pattern: Pattern,
    qualified: bool,
}

impl TableMatcher {
    /// Compile patterns, failing on the first malformed one
    pub fn compile<I, S>(patterns: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for raw in patterns {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            let pattern = Pattern::new(raw)
                .map_err(|e| anyhow::anyhow!("invalid table pattern '{}': {}", raw, e))?;
            compiled.push(CompiledPattern {
                pattern,
                qualified: raw.contains('.'),
            });
        }
        Ok(Self { patterns: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether any pattern matches the table
    pub fn matches(&self, table: &TableName) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let qualified = table.to_string();
        self.patterns.iter().any(|p| {
            let subject = if p.qualified {
                qualified.as_str()
            } else {
                table.name.as_str()
            };
            p.pattern.matches_with(subject, MATCH_OPTIONS)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_pattern_matches_name_only() {
        let m = TableMatcher::compile(["*_backup"]).unwrap();
        assert!(m.matches(&TableName::public("users_backup")));
        assert!(m.matches(&TableName::new("archive", "orders_backup")));
        assert!(!m.matches(&TableName::public("users")));
    }

    #[test]
    fn test_qualified_pattern() {
        let m = TableMatcher::compile(["sales.*"]).unwrap();
        assert!(m.matches(&TableName::new("sales", "orders")));
        assert!(!m.matches(&TableName::public("orders")));
    }

    #[test]
    fn test_case_insensitive_and_anchored() {
        let m = TableMatcher::compile(["User*"]).unwrap();
        assert!(m.matches(&TableName::public("users")));
        assert!(!m.matches(&TableName::public("app_users")));
    }

    #[test]
    fn test_question_mark_and_class() {
        let m = TableMatcher::compile(["log_202?", "t[0-9]"]).unwrap();
        assert!(m.matches(&TableName::public("log_2024")));
        assert!(m.matches(&TableName::public("t7")));
        assert!(!m.matches(&TableName::public("log_20245")));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let err = TableMatcher::compile(["users[", "ok"]).unwrap_err();
        assert!(err.to_string().contains("users["));
    }

    #[test]
    fn test_empty_matcher_matches_nothing() {
        let m = TableMatcher::compile(Vec::<String>::new()).unwrap();
        assert!(m.is_empty());
        assert!(!m.matches(&TableName::public("users")));
    }
}
