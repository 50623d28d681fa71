//! Named transform functions that mapping fields reach with `@module.name`.
//!
//! Functions are registered by the embedding application; nothing is loaded
//! from disk or imported dynamically. A reference whose path has no module
//! part resolves against the registry's default module.

use crate::config::EngineConfig;
use crate::error::{TransformError, TransformResult};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Module a reference resolves against when its path names only a function.
pub const DEFAULT_TRANSFORM_MODULE: &str = "transforms";

/// A registered transform function.
pub type ReferenceFunction = Arc<dyn Fn(&JsonValue) -> Result<JsonValue, String> + Send + Sync>;

static REFERENCE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("reference path pattern is valid")
});

/// Splits a reference path (without the leading `@`) into module and
/// function name. The split happens at the last `.`.
///
/// ```
/// use relmap::transform::registry::parse_reference;
///
/// assert_eq!(parse_reference("text.slug", "transforms").unwrap(), ("text", "slug"));
/// assert_eq!(parse_reference("a.b.c", "transforms").unwrap(), ("a.b", "c"));
/// assert_eq!(parse_reference("double", "transforms").unwrap(), ("transforms", "double"));
/// ```
pub fn parse_reference<'a>(
    path: &'a str,
    default_module: &'a str,
) -> TransformResult<(&'a str, &'a str)> {
    if !REFERENCE_PATH.is_match(path) {
        return Err(TransformError::InvalidReference(path.to_string()));
    }
    Ok(path.rsplit_once('.').unwrap_or((default_module, path)))
}

fn qualified(module: &str, name: &str) -> String {
    format!("{}.{}", module, name)
}

/// Registry of named transform functions.
///
/// Every registration bumps [`generation`](TransformRegistry::generation), so
/// holders of resolved functions can tell when theirs may be stale.
pub struct TransformRegistry {
    default_module: String,
    functions: RwLock<HashMap<String, ReferenceFunction>>,
    generation: AtomicU64,
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_default_module(DEFAULT_TRANSFORM_MODULE)
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let functions = self.functions.read().unwrap_or_else(|p| p.into_inner());
        let mut names: Vec<&String> = functions.keys().collect();
        names.sort();
        f.debug_struct("TransformRegistry")
            .field("default_module", &self.default_module)
            .field("functions", &names)
            .finish()
    }
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_module(module: impl Into<String>) -> Self {
        Self {
            default_module: module.into(),
            functions: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_default_module(config.default_transform_module.clone())
    }

    pub fn default_module(&self) -> &str {
        &self.default_module
    }

    /// Registers `f` as `module.name`, replacing any earlier registration.
    pub fn register<F>(&self, module: &str, name: &str, f: F)
    where
        F: Fn(&JsonValue) -> Result<JsonValue, String> + Send + Sync + 'static,
    {
        let key = qualified(module, name);
        debug!("Registering transform function {}", key);
        self.functions
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key, Arc::new(f));
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Registers `f` under the default module.
    pub fn register_default<F>(&self, name: &str, f: F)
    where
        F: Fn(&JsonValue) -> Result<JsonValue, String> + Send + Sync + 'static,
    {
        let module = self.default_module.clone();
        self.register(&module, name, f);
    }

    /// Looks up the function a reference path names.
    pub fn resolve(&self, path: &str) -> TransformResult<ReferenceFunction> {
        let (module, name) = parse_reference(path, &self.default_module)?;
        self.functions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&qualified(module, name))
            .cloned()
            .ok_or_else(|| TransformError::Unregistered {
                module: module.to_string(),
                name: name.to_string(),
            })
    }

    /// Number of registrations made so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_registered(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }
}
