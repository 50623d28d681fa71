use super::lookup::collection_mapping;
use super::types::{FieldType, MappingConfig, DEFAULT_PK_TYPE};
use crate::error::MappingResult;
use std::fmt;

/// A destination column derived from a collection mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
    pub primary_key: bool,
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.sql_type)?;
        if self.primary_key {
            write!(f, " PRIMARY KEY")?;
        }
        Ok(())
    }
}

/// Columns of the destination table for a namespace, ordered by name.
///
/// Every scalar field with a `dest` becomes a column. When no column carries
/// the primary key name, a `SERIAL` key column is added.
pub fn table_columns(config: &MappingConfig, namespace: &str) -> MappingResult<Vec<ColumnDef>> {
    let mapping = collection_mapping(config, namespace)?;

    let mut columns: Vec<ColumnDef> = mapping
        .fields
        .values()
        .filter_map(|field| match (&field.field_type, field.dest.as_deref()) {
            (FieldType::Column(sql_type), Some(dest)) => Some(ColumnDef {
                name: dest.to_string(),
                sql_type: sql_type.clone(),
                primary_key: dest == mapping.pk,
            }),
            _ => None,
        })
        .collect();

    if !columns.iter().any(|column| column.primary_key) {
        columns.push(ColumnDef {
            name: mapping.pk.clone(),
            sql_type: DEFAULT_PK_TYPE.to_string(),
            primary_key: true,
        });
    }

    columns.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(columns)
}
