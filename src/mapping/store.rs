use super::types::MappingConfig;
use super::validation::validate;
use crate::error::MappingResult;
use log::info;
use std::sync::{Arc, RwLock};

/// Shared handle to the active mapping configuration.
///
/// Readers take an `Arc` snapshot and keep using it for as long as they need;
/// [`install`](MappingStore::install) replaces the whole configuration in one
/// swap, so a reader never observes a partially updated tree.
#[derive(Debug)]
pub struct MappingStore {
    current: RwLock<Arc<MappingConfig>>,
}

impl MappingStore {
    /// Validates `config` and wraps it in a new store.
    pub fn new(config: MappingConfig) -> MappingResult<Self> {
        validate(&config)?;
        info!("Mapping store initialized with {} database(s)", config.databases.len());
        Ok(Self {
            current: RwLock::new(Arc::new(config)),
        })
    }

    /// Current configuration.
    pub fn snapshot(&self) -> Arc<MappingConfig> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Validates `config` and makes it the current configuration.
    ///
    /// On validation failure the previous configuration stays active.
    pub fn install(&self, config: MappingConfig) -> MappingResult<()> {
        validate(&config)?;
        let config = Arc::new(config);
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = config;
        info!("Mapping configuration replaced");
        Ok(())
    }
}
