//! JSON format output for ERD data.
//!
//! The document carries every table, column and relationship field, so it
//! can be read back into an equal [`SchemaModel`].

use crate::schema::{Cardinality, Relationship, SchemaModel, Table};
use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// JSON representation of the ERD
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ErdJson {
    pub tables: Vec<Table>,
    pub relationships: Vec<RelationshipJson>,
    pub stats: ErdStats,
}

/// A relationship plus the shape derived from the source table's constraints
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RelationshipJson {
    #[serde(flatten)]
    pub relationship: Relationship,
    pub cardinality: Cardinality,
    /// Whether a source row may have no target row (a nullable FK column)
    pub optional: bool,
}

/// ERD statistics
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ErdStats {
    pub table_count: usize,
    pub column_count: usize,
    pub relationship_count: usize,
    pub schema_count: usize,
}

/// Generate JSON output from a schema model
pub fn to_json(model: &SchemaModel) -> String {
    let erd = build_erd_json(model);
    serde_json::to_string_pretty(&erd).unwrap_or_else(|_| "{}".to_string())
}

/// Build the JSON structure
pub fn build_erd_json(model: &SchemaModel) -> ErdJson {
    let relationships = model
        .relationships()
        .iter()
        .map(|rel| RelationshipJson {
            relationship: rel.clone(),
            cardinality: model.cardinality(rel),
            optional: model.is_optional(rel),
        })
        .collect();

    ErdJson {
        tables: model.tables().to_vec(),
        relationships,
        stats: ErdStats {
            table_count: model.len(),
            column_count: model.column_count(),
            relationship_count: model.relationships().len(),
            schema_count: model.schemas().len(),
        },
    }
}

impl ErdJson {
    /// Drop the derived fields, keeping tables and relationships
    pub fn into_model(self) -> SchemaModel {
        let relationships = self
            .relationships
            .into_iter()
            .map(|r| r.relationship)
            .collect();
        SchemaModel::from_parts(self.tables, relationships)
    }
}

/// Read a JSON document produced by [`to_json`] back into a model
pub fn from_json(text: &str) -> anyhow::Result<SchemaModel> {
    let erd: ErdJson = serde_json::from_str(text).context("invalid ERD JSON document")?;
    Ok(erd.into_model())
}
