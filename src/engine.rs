use crate::collection::{Collection, CollectionBuilder};
use crate::errors::EngineError;
use crate::query::Query;
use crate::view::{CapabilityFn, PresenterBuilder};
use bson::Bson;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Key value used to build the never-matching sub-query that an empty
    /// has-many-through resolution returns. The host must guarantee no record
    /// ever carries this value in a relation target key.
    pub missing_relation_sentinel: Bson,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { missing_relation_sentinel: Bson::Int64(-1) }
    }
}

/// The collection registry and entry point for queries.
///
/// `Engine` is a cheap-clone handle; clones share the same registry. The
/// lifecycle is explicit: [`Engine::define`] registers or wholesale-replaces
/// a collection, [`Engine::present`] registers its derived-value
/// capabilities, [`Engine::reset`] drops everything.
#[derive(Clone, Default)]
pub struct Engine {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    options: EngineOptions,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    capabilities: RwLock<HashMap<String, Arc<HashMap<String, CapabilityFn>>>>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: EngineOptions) -> Self {
        Self { inner: Arc::new(Inner { options, ..Inner::default() }) }
    }

    pub(crate) fn options(&self) -> &EngineOptions {
        &self.inner.options
    }

    /// Defines (or wholesale-replaces) a named collection.
    pub fn define<F>(&self, name: &str, f: F)
    where
        F: FnOnce(&mut CollectionBuilder),
    {
        let mut builder = CollectionBuilder::new(name);
        f(&mut builder);
        let collection = Arc::new(builder.build());
        log::debug!(
            "defined collection `{name}` ({} records, {} relations)",
            collection.records().len(),
            collection.relations().len()
        );
        let replaced =
            self.inner.collections.write().insert(name.to_string(), collection).is_some();
        if replaced {
            log::warn!("collection `{name}` redefined; existing queries keep the old snapshot");
        }
    }

    /// Registers the derived-value capability table for a collection name,
    /// replacing any previous table.
    pub fn present<F>(&self, name: &str, f: F)
    where
        F: FnOnce(&mut PresenterBuilder),
    {
        let mut builder = PresenterBuilder::new();
        f(&mut builder);
        self.inner.capabilities.write().insert(name.to_string(), Arc::new(builder.build()));
    }

    /// Drops all collections and capability tables.
    pub fn reset(&self) {
        log::debug!("engine reset");
        self.inner.collections.write().clear();
        self.inner.capabilities.write().clear();
    }

    /// Starts a query over the named collection. Fails immediately when the
    /// collection is not defined.
    pub fn query(&self, name: &str) -> Result<Query, EngineError> {
        Ok(Query::new(self.clone(), self.collection(name)?))
    }

    pub(crate) fn collection(&self, name: &str) -> Result<Arc<Collection>, EngineError> {
        self.inner
            .collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UndefinedCollection(name.to_string()))
    }

    pub(crate) fn capabilities_for(&self, name: &str) -> Arc<HashMap<String, CapabilityFn>> {
        self.inner.capabilities.read().get(name).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn defined_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("collections", &self.defined_collections()).finish()
    }
}
