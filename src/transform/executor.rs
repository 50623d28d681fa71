//! Executor for value transforms.
//!
//! Applies the `transform` of a field mapping to one value. Expressions are
//! parsed once and cached; references are resolved through the
//! [`TransformRegistry`] and cached once found.

use super::ast::{Expression, Value};
use super::interpreter::Interpreter;
use super::parser::TransformParser;
use super::registry::{ReferenceFunction, TransformRegistry};
use crate::config::EngineConfig;
use crate::error::{TransformError, TransformResult};
use crate::mapping::{FieldMapping, TransformKind};
use log::{error, trace};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Name the input value is bound to inside an expression.
pub const INPUT_VARIABLE: &str = "val";

/// Applies field transforms to values.
///
/// Safe to share between threads: caches sit behind locks and are only
/// filled with successful resolutions.
pub struct ValueTransformer {
    registry: Arc<TransformRegistry>,
    parser: TransformParser,
    cache_enabled: bool,
    expressions: RwLock<HashMap<String, Arc<Expression>>>,
    references: RwLock<ReferenceCache>,
}

/// Resolved references, valid for one registry generation.
#[derive(Default)]
struct ReferenceCache {
    generation: u64,
    functions: HashMap<String, ReferenceFunction>,
}

impl fmt::Debug for ValueTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTransformer")
            .field("registry", &self.registry)
            .field("cache_enabled", &self.cache_enabled)
            .finish_non_exhaustive()
    }
}

impl Default for ValueTransformer {
    fn default() -> Self {
        Self::new(Arc::new(TransformRegistry::default()))
    }
}

impl ValueTransformer {
    pub fn new(registry: Arc<TransformRegistry>) -> Self {
        Self {
            registry,
            parser: TransformParser::new(),
            cache_enabled: true,
            expressions: RwLock::new(HashMap::new()),
            references: RwLock::new(ReferenceCache::default()),
        }
    }

    pub fn from_config(config: &EngineConfig, registry: Arc<TransformRegistry>) -> Self {
        let mut transformer = Self::new(registry);
        transformer.cache_enabled = config.cache_transforms;
        transformer
    }

    pub fn registry(&self) -> &Arc<TransformRegistry> {
        &self.registry
    }

    /// Applies the field's transform to `value`.
    ///
    /// Array fields and fields without a transform pass through unchanged.
    /// A transform that fails is logged and the original value is kept.
    pub fn apply(&self, field: &FieldMapping, value: JsonValue) -> JsonValue {
        if field.is_array() {
            return value;
        }
        let Some(transform) = field.transform.as_deref() else {
            return value;
        };

        match self.try_apply(transform, &value) {
            Ok(transformed) => transformed,
            Err(err) => {
                error!(
                    "Transform '{}' failed on value {}: {}",
                    transform, value, err
                );
                value
            }
        }
    }

    /// Applies a transform string to `value`, reporting any failure.
    pub fn try_apply(&self, transform: &str, value: &JsonValue) -> TransformResult<JsonValue> {
        trace!("Applying transform '{}'", transform);
        match TransformKind::parse(transform) {
            TransformKind::Reference(path) => {
                let function = self.reference(path)?;
                function(value).map_err(|reason| TransformError::Reference {
                    reference: path.to_string(),
                    reason,
                })
            }
            TransformKind::Expression(source) => {
                let expression = self.expression(source)?;
                let mut variables = HashMap::new();
                variables.insert(INPUT_VARIABLE.to_string(), Value::from(value.clone()));
                let result = Interpreter::with_variables(variables).evaluate(&expression)?;
                JsonValue::try_from(result)
            }
        }
    }

    fn expression(&self, source: &str) -> TransformResult<Arc<Expression>> {
        if self.cache_enabled {
            let cached = self
                .expressions
                .read()
                .unwrap_or_else(|p| p.into_inner())
                .get(source)
                .cloned();
            if let Some(expression) = cached {
                return Ok(expression);
            }
        }

        let expression = Arc::new(self.parser.parse_expression(source)?);
        if self.cache_enabled {
            self.expressions
                .write()
                .unwrap_or_else(|p| p.into_inner())
                .insert(source.to_string(), Arc::clone(&expression));
        }
        Ok(expression)
    }

    fn reference(&self, path: &str) -> TransformResult<ReferenceFunction> {
        if !self.cache_enabled {
            return self.registry.resolve(path);
        }

        let generation = self.registry.generation();
        {
            let cache = self.references.read().unwrap_or_else(|p| p.into_inner());
            if cache.generation == generation {
                if let Some(function) = cache.functions.get(path) {
                    return Ok(Arc::clone(function));
                }
            }
        }

        let function = self.registry.resolve(path)?;
        let mut cache = self.references.write().unwrap_or_else(|p| p.into_inner());
        if cache.generation != generation {
            cache.functions.clear();
            cache.generation = generation;
        }
        cache.functions.insert(path.to_string(), Arc::clone(&function));
        Ok(function)
    }
}
