//! Configuration validator.
//!
//! Runs once over a [`MappingConfig`] before it is put into service. Checks,
//! per database and collection:
//!
//! 1. structure (type-dependent required properties),
//! 2. unique output names and compilable transforms,
//! 3. primary key resolution, directly or through a linked collection,
//! 4. for every array field: linked collection, foreign key, foreign key type
//!    and (for arrays of scalars) value field.
//!
//! Databases and collections are visited in name order, so the first error
//! reported is deterministic.

use super::structure::check_typed_structure;
use super::types::{CollectionMapping, DatabaseMapping, FieldMapping, FieldType, MappingConfig, TransformKind};
use crate::error::{MappingError, MappingResult};
use crate::transform::parser::TransformParser;
use crate::transform::registry::{parse_reference, DEFAULT_TRANSFORM_MODULE};
use log::{debug, warn};
use std::collections::HashMap;

/// Validates a configuration, stopping at the first failure.
pub fn validate(config: &MappingConfig) -> MappingResult<()> {
    match ConfigValidator::new(config, true).run().into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Validates a configuration and returns every failure found.
///
/// A structural failure is returned on its own, since the referential checks
/// assume a well-formed tree.
pub fn validate_all(config: &MappingConfig) -> Vec<MappingError> {
    ConfigValidator::new(config, false).run()
}

struct ConfigValidator<'a> {
    config: &'a MappingConfig,
    fail_fast: bool,
    parser: TransformParser,
    errors: Vec<MappingError>,
}

impl<'a> ConfigValidator<'a> {
    fn new(config: &'a MappingConfig, fail_fast: bool) -> Self {
        Self {
            config,
            fail_fast,
            parser: TransformParser::new(),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<MappingError> {
        if let Err(err) = check_typed_structure(self.config) {
            return vec![err];
        }

        let config = self.config;
        'databases: for (database, db_mapping) in &config.databases {
            for (collection, mapping) in &db_mapping.collections {
                self.check_collection(database, db_mapping, collection, mapping);
                if self.should_stop() {
                    break 'databases;
                }
            }
        }

        debug!("Mapping validation finished with {} error(s)", self.errors.len());
        self.errors
    }

    fn should_stop(&self) -> bool {
        self.fail_fast && !self.errors.is_empty()
    }

    fn report(&mut self, err: MappingError) {
        if !self.should_stop() {
            self.errors.push(err);
        }
    }

    fn check_collection(
        &mut self,
        database: &str,
        db_mapping: &DatabaseMapping,
        collection: &str,
        mapping: &CollectionMapping,
    ) {
        self.check_destinations(database, collection, mapping);
        self.check_transforms(database, collection, mapping);
        self.check_primary_key(database, db_mapping, collection, mapping);

        for (field, field_mapping) in mapping.array_fields() {
            if self.should_stop() {
                return;
            }
            if let Err(err) = check_link(database, db_mapping, collection, mapping, field, field_mapping) {
                self.report(err);
            }
        }
    }

    fn check_destinations(&mut self, database: &str, collection: &str, mapping: &CollectionMapping) {
        let mut seen: HashMap<&str, &str> = HashMap::new();

        for (field, field_mapping) in &mapping.fields {
            if field_mapping.is_array() {
                continue;
            }
            let output = field_mapping.dest.as_deref().unwrap_or(field);
            if let Some(first) = seen.insert(output, field) {
                self.report(MappingError::DuplicateDestination {
                    database: database.to_string(),
                    collection: collection.to_string(),
                    dest: output.to_string(),
                    first: first.to_string(),
                    second: field.to_string(),
                });
            }
        }
    }

    fn check_transforms(&mut self, database: &str, collection: &str, mapping: &CollectionMapping) {
        for (field, field_mapping) in &mapping.fields {
            let Some(kind) = field_mapping.transform_kind() else {
                continue;
            };
            if field_mapping.is_array() {
                warn!(
                    "Transform on array field {}.{}.{} is ignored",
                    database, collection, field
                );
                continue;
            }

            let compiled = match kind {
                TransformKind::Reference(path) => {
                    parse_reference(path, DEFAULT_TRANSFORM_MODULE).map(|_| ())
                }
                TransformKind::Expression(source) => self.parser.parse_expression(source).map(|_| ()),
            };
            if let Err(err) = compiled {
                self.report(MappingError::InvalidTransform {
                    database: database.to_string(),
                    collection: collection.to_string(),
                    field: field.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    fn check_primary_key(
        &mut self,
        database: &str,
        db_mapping: &DatabaseMapping,
        collection: &str,
        mapping: &CollectionMapping,
    ) {
        if mapping.primary_key_field().is_some() {
            return;
        }
        if db_mapping.is_linked(collection) {
            debug!(
                "Primary key {} of {}.{} is provided by a linked collection",
                mapping.pk, database, collection
            );
            return;
        }
        self.report(MappingError::PrimaryKeyNotFound {
            database: database.to_string(),
            collection: collection.to_string(),
            pk: mapping.pk.clone(),
        });
    }
}

/// Checks one array field against the collection it links to.
fn check_link(
    database: &str,
    db_mapping: &DatabaseMapping,
    collection: &str,
    mapping: &CollectionMapping,
    field: &str,
    field_mapping: &FieldMapping,
) -> MappingResult<()> {
    // presence of dest/fk/valueField is guaranteed by the structural check
    let dest = field_mapping.dest.as_deref().unwrap_or_default();
    let fk = field_mapping.fk.as_deref().unwrap_or_default();

    let linked = db_mapping
        .collection(dest)
        .ok_or_else(|| MappingError::CollectionNotFound {
            database: database.to_string(),
            collection: dest.to_string(),
        })?;

    let fk_mapping = linked.field(fk).ok_or_else(|| MappingError::ForeignKeyNotFound {
        database: database.to_string(),
        collection: dest.to_string(),
        fk: fk.to_string(),
    })?;

    let pk_type = mapping.primary_key_type();
    if fk_mapping.field_type != pk_type {
        return Err(MappingError::ForeignKeyTypeMismatch {
            database: database.to_string(),
            collection: collection.to_string(),
            pk: mapping.pk.clone(),
            pk_type: pk_type.to_string(),
            dest: dest.to_string(),
            fk: fk.to_string(),
            fk_type: fk_mapping.field_type.to_string(),
        });
    }

    if field_mapping.field_type == FieldType::ArrayOfScalars {
        let value_field = field_mapping.value_field.as_deref().unwrap_or_default();
        if !linked.contains_field(value_field) {
            return Err(MappingError::ValueFieldNotMapped {
                database: database.to_string(),
                collection: collection.to_string(),
                value_field: value_field.to_string(),
                dest: dest.to_string(),
            });
        }
    }

    debug!("Link {}.{}.{} -> {}.{} is valid", database, collection, field, dest, fk);
    Ok(())
}
