//! Type name simplification for normal-mode diagrams.
//!
//! The table maps declared PostgreSQL types onto a small vocabulary. Entries
//! are tried in order against the type with any array suffix removed; the
//! first match wins. Unmatched types just lose their parameters.
//!
//! Mermaid attribute types only accept `[A-Za-z0-9_-[]()]`, so even full mode
//! cannot show a declared type verbatim: commas and spaces become `_`
//! (`numeric(10,2)` is drawn as `numeric(10_2)`). The JSON format keeps the
//! declared text unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

const TYPE_TABLE: &[(&str, &str)] = &[
    (r"^(character\s+varying|varchar|character|char|bpchar|nchar)\b", "varchar"),
    (r"^(numeric|decimal)\b", "numeric"),
    (r"^(timestamptz|timestamp)\b", "timestamp"),
    (r"^(timetz|time)\b", "time"),
    (r"^(integer|int4|int)\b", "int"),
    (r"^(smallint|int2)\b", "smallint"),
    (r"^(bigint|int8)\b", "bigint"),
    (r"^(double\s+precision|float8|float)\b", "float8"),
    (r"^(real|float4)\b", "float4"),
    (r"^(boolean|bool)\b", "bool"),
    (r"^(bit\s+varying|varbit)\b", "varbit"),
    (r"^interval\b", "interval"),
];

static SIMPLIFICATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    TYPE_TABLE
        .iter()
        .map(|(pattern, canonical)| {
            (Regex::new(&format!("(?i){}", pattern)).unwrap(), *canonical)
        })
        .collect()
});

static ARRAY_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\s*\[\s*\d*\s*\])+\s*$").unwrap());

static PARAMS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());

/// Canonical short name for a declared type, keeping a `[]` array marker
pub fn simplify_type(declared: &str) -> String {
    let declared = declared.trim();
    let (base, is_array) = match ARRAY_SUFFIX_RE.find(declared) {
        Some(m) => (declared[..m.start()].trim_end(), true),
        None => (declared, false),
    };

    let simplified = SIMPLIFICATIONS
        .iter()
        .find(|(re, _)| re.is_match(base))
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| PARAMS_RE.replace_all(base, "").trim().to_string());

    if is_array {
        format!("{}[]", simplified)
    } else {
        simplified
    }
}

/// Make a type string usable as a Mermaid attribute type; characters outside
/// the attribute grammar become `_`
pub fn mermaid_type(t: &str) -> String {
    let compact = t.trim().replace(", ", ",");
    let escaped: String = compact
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c,
            '_' | '-' | '[' | ']' | '(' | ')' => c,
            _ => '_',
        })
        .collect();

    match escaped.chars().next() {
        None => "unknown".to_string(),
        Some(c) if !c.is_ascii_alphabetic() && c != '_' => format!("_{}", escaped),
        Some(_) => escaped,
    }
}
