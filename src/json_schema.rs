//! JSON Schema generation for the structured output and the config file.
//!
//! Schemas are generated with schemars and printed by the `schema` subcommand.

use schemars::{schema_for, Schema};
use std::collections::BTreeMap;

/// All schemas by name. BTreeMap keeps the listing order stable.
pub fn all_schemas() -> BTreeMap<&'static str, Schema> {
    let mut schemas = BTreeMap::new();

    // render --format json
    schemas.insert("erd", schema_for!(crate::render::json::ErdJson));

    // render --config
    schemas.insert("config", schema_for!(crate::config::ErdConfig));

    schemas
}

/// Generate a single schema by name.
pub fn get_schema(name: &str) -> Option<Schema> {
    all_schemas().remove(name)
}

/// List all available schema names.
pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names() {
        assert_eq!(schema_names(), vec!["config", "erd"]);
        assert!(get_schema("nope").is_none());
    }

    #[test]
    fn test_erd_schema_mentions_fields() {
        let schema = get_schema("erd").unwrap();
        let text = serde_json::to_string(&schema).unwrap();
        for field in ["tables", "relationships", "cardinality", "primary_key", "nullable"] {
            assert!(text.contains(field), "missing {}", field);
        }
    }
}
