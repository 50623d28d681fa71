//! Read-only accessors used by the surrounding synchronization pipeline.
//!
//! Every accessor except [`is_mapped`] fails with [`MappingError::NotMapped`]
//! when the namespace or field has no mapping entry.

use super::namespace::Namespace;
use super::types::{CollectionMapping, FieldMapping, FieldType, MappingConfig};
use crate::error::{MappingError, MappingResult};

/// Collection mapping for a namespace.
pub fn collection_mapping<'a>(
    config: &'a MappingConfig,
    namespace: &str,
) -> MappingResult<&'a CollectionMapping> {
    let ns = Namespace::parse(namespace)?;
    config
        .collection(&ns.database, &ns.collection)
        .ok_or_else(|| MappingError::NotMapped(namespace.to_string()))
}

/// Mapping of one source field.
pub fn field_mapping<'a>(
    config: &'a MappingConfig,
    namespace: &str,
    field: &str,
) -> MappingResult<&'a FieldMapping> {
    collection_mapping(config, namespace)?
        .field(field)
        .ok_or_else(|| MappingError::NotMapped(format!("{}.{}", namespace, field)))
}

/// Name of the primary key of a namespace.
pub fn primary_key<'a>(config: &'a MappingConfig, namespace: &str) -> MappingResult<&'a str> {
    Ok(collection_mapping(config, namespace)?.pk.as_str())
}

/// Destination name of a source field. A field without `dest` keeps its name.
pub fn mapped_field<'a>(
    config: &'a MappingConfig,
    namespace: &str,
    field: &'a str,
) -> MappingResult<&'a str> {
    collection_mapping(config, namespace)?
        .output_name(field)
        .ok_or_else(|| MappingError::NotMapped(format!("{}.{}", namespace, field)))
}

/// Whether a namespace, and optionally one of its fields, is mapped.
pub fn is_mapped(config: &MappingConfig, namespace: &str, field: Option<&str>) -> bool {
    match collection_mapping(config, namespace) {
        Ok(mapping) => field.map_or(true, |field| mapping.contains_field(field)),
        Err(_) => false,
    }
}

/// Whether the destination store generates the collection's identity, i.e.
/// no field is mapped onto the primary key.
pub fn is_id_autogenerated(config: &MappingConfig, namespace: &str) -> MappingResult<bool> {
    let mapping = collection_mapping(config, namespace)?;
    Ok(!mapping
        .fields
        .values()
        .any(|field| field.dest.as_deref() == Some(mapping.pk.as_str())))
}

/// Fields of a namespace stored as arrays of scalars.
pub fn scalar_array_fields<'a>(
    config: &'a MappingConfig,
    namespace: &str,
) -> MappingResult<Vec<&'a str>> {
    Ok(collection_mapping(config, namespace)?
        .fields
        .iter()
        .filter(|(_, field)| field.field_type == FieldType::ArrayOfScalars)
        .map(|(name, _)| name.as_str())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::types::DatabaseMapping;

    fn config() -> MappingConfig {
        MappingConfig::new().with_database(
            "shop",
            DatabaseMapping::new()
                .with_collection(
                    "products",
                    CollectionMapping::new("id")
                        .with_field("_id", FieldMapping::column("TEXT").with_dest("id"))
                        .with_field("label", FieldMapping::column("TEXT"))
                        .with_field(
                            "tags",
                            FieldMapping::array_of_scalars("product_tags", "product_id", "tag"),
                        ),
                )
                .with_collection(
                    "product_tags",
                    CollectionMapping::new("id")
                        .with_field("product_id", FieldMapping::column("TEXT").with_dest("product_id"))
                        .with_field("tag", FieldMapping::column("TEXT").with_dest("tag")),
                ),
        )
    }

    #[test]
    fn test_resolves_names() {
        let config = config();
        assert_eq!(primary_key(&config, "shop.products"), Ok("id"));
        assert_eq!(mapped_field(&config, "shop.products", "_id"), Ok("id"));
        assert_eq!(mapped_field(&config, "shop.products", "label"), Ok("label"));
        assert!(matches!(
            mapped_field(&config, "shop.products", "price"),
            Err(MappingError::NotMapped(_))
        ));
    }

    #[test]
    fn test_reports_mapped_namespaces_and_fields() {
        let config = config();
        assert!(is_mapped(&config, "shop.products", None));
        assert!(is_mapped(&config, "shop.products", Some("tags")));
        assert!(!is_mapped(&config, "shop.products", Some("price")));
        assert!(!is_mapped(&config, "shop.orders", None));
        assert!(!is_mapped(&config, "not-a-namespace", None));
    }

    #[test]
    fn test_detects_autogenerated_ids() {
        let config = config();
        assert_eq!(is_id_autogenerated(&config, "shop.products"), Ok(false));
        assert_eq!(is_id_autogenerated(&config, "shop.product_tags"), Ok(true));
        assert!(is_id_autogenerated(&config, "shop.orders").is_err());
    }

    #[test]
    fn test_lists_scalar_array_fields() {
        let config = config();
        assert_eq!(scalar_array_fields(&config, "shop.products"), Ok(vec!["tags"]));
        assert_eq!(scalar_array_fields(&config, "shop.product_tags"), Ok(vec![]));
        assert!(matches!(
            scalar_array_fields(&config, "shop.orders"),
            Err(MappingError::NotMapped(_))
        ));
    }
}
