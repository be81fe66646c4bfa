use crate::collection::Collection;
use crate::engine::Engine;
use crate::errors::EngineError;
use crate::record::Record;
use crate::relations::{self, Related};
use bson::Bson;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// A derived-value capability: computes a value from a record view and the
/// call-site arguments. Registered per collection via `Engine::present`.
pub type CapabilityFn = Arc<dyn Fn(&RecordView, &[Bson]) -> Result<Bson, EngineError> + Send + Sync>;

/// Registration surface handed to `Engine::present`.
#[derive(Default)]
pub struct PresenterBuilder {
    capabilities: HashMap<String, CapabilityFn>,
}

impl PresenterBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn capability<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&RecordView, &[Bson]) -> Result<Bson, EngineError> + Send + Sync + 'static,
    {
        self.capabilities.insert(name.to_string(), Arc::new(f));
        self
    }

    pub(crate) fn build(self) -> HashMap<String, CapabilityFn> {
        self.capabilities
    }
}

/// Field names that [`RecordView::lookup`] never resolves as record fields.
/// These are identity/introspection names; records carrying them stay
/// reachable through [`RecordView::get`]. This list is authoritative.
pub const RESERVED_FIELDS: &[&str] = &[
    "class",
    "clone",
    "dup",
    "eq",
    "equal",
    "fields",
    "freeze",
    "frozen",
    "hash",
    "inspect",
    "instance_of",
    "is_a",
    "kind_of",
    "method",
    "methods",
    "nil",
    "object_id",
    "respond_to",
    "send",
    "to_h",
    "to_hash",
    "to_s",
];

/// A successful [`RecordView::lookup`]: either a field/derived value or a
/// resolved relation.
#[derive(Debug, Clone)]
pub enum Attr {
    Value(Bson),
    Relation(Related),
}

/// The read-only handle through which a consumer accesses one record's
/// fields, relations, and derived values.
///
/// Views are created per materialization and are cheap to clone (clones share
/// the same memo tables). Relations resolve lazily and memoize per relation
/// name; capabilities memoize per (name, arguments). The memo tables use
/// interior mutability without synchronization, so a view is not `Sync`;
/// concurrent first-access must be serialized by the host.
#[derive(Clone)]
pub struct RecordView {
    inner: Rc<ViewInner>,
}

struct ViewInner {
    engine: Engine,
    collection: Arc<Collection>,
    record: Record,
    capabilities: Arc<HashMap<String, CapabilityFn>>,
    relation_memo: RefCell<HashMap<String, Related>>,
    value_memo: RefCell<HashMap<(String, String), Bson>>,
}

impl RecordView {
    pub(crate) fn new(engine: Engine, collection: Arc<Collection>, record: Record) -> Self {
        let capabilities = engine.capabilities_for(collection.name());
        Self {
            inner: Rc::new(ViewInner {
                engine,
                collection,
                record,
                capabilities,
                relation_memo: RefCell::new(HashMap::new()),
                value_memo: RefCell::new(HashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn collection_name(&self) -> &str {
        self.inner.collection.name()
    }

    #[must_use]
    pub fn record(&self) -> &Record {
        &self.inner.record
    }

    #[must_use]
    pub fn fields(&self) -> &bson::Document {
        self.inner.record.fields()
    }

    /// Raw field access, reserved names included. Missing fields read as
    /// `None`; a stored `Bson::Null` reads as `Some(Bson::Null)`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.inner.record.get(field)
    }

    /// Views never permit mutation of the underlying record; any attempted
    /// write fails.
    pub fn set(&self, field: &str, _value: impl Into<Bson>) -> Result<(), EngineError> {
        Err(EngineError::Immutable {
            collection: self.inner.collection.name().to_string(),
            field: field.to_string(),
        })
    }

    /// Resolves a declared relation, memoized per relation name for this
    /// view's lifetime.
    pub fn relation(&self, name: &str) -> Result<Related, EngineError> {
        if let Some(found) = self.inner.relation_memo.borrow().get(name) {
            return Ok(found.clone());
        }
        let resolved =
            relations::resolve(&self.inner.engine, &self.inner.collection, &self.inner.record, name)?;
        self.inner.relation_memo.borrow_mut().insert(name.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// Invokes a derived-value capability with no arguments.
    pub fn call(&self, name: &str) -> Result<Bson, EngineError> {
        self.call_with(name, &[])
    }

    /// Invokes a derived-value capability, memoized by (name, arguments):
    /// repeat calls with identical arguments return the cached value without
    /// recomputation. A capability's failure is re-raised carrying the
    /// capability name, collection name, and a snapshot of the record.
    pub fn call_with(&self, name: &str, args: &[Bson]) -> Result<Bson, EngineError> {
        let Some(f) = self.inner.capabilities.get(name).cloned() else {
            return Err(EngineError::UnknownAttribute {
                collection: self.inner.collection.name().to_string(),
                name: name.to_string(),
            });
        };
        let key = (name.to_string(), args_key(args));
        if let Some(cached) = self.inner.value_memo.borrow().get(&key) {
            return Ok(cached.clone());
        }
        let value = f(self, args).map_err(|e| EngineError::Capability {
            collection: self.inner.collection.name().to_string(),
            capability: name.to_string(),
            record: format!("{:?}", self.inner.record.fields()),
            message: e.to_string(),
        })?;
        self.inner.value_memo.borrow_mut().insert(key, value.clone());
        Ok(value)
    }

    /// Resolves `name` by the fixed priority: record field (reserved names
    /// excluded), then declared relation, then zero-argument capability.
    pub fn lookup(&self, name: &str) -> Result<Attr, EngineError> {
        if !RESERVED_FIELDS.contains(&name)
            && let Some(value) = self.inner.record.get(name)
        {
            return Ok(Attr::Value(value.clone()));
        }
        if self.inner.collection.relation(name).is_some() {
            return Ok(Attr::Relation(self.relation(name)?));
        }
        if self.inner.capabilities.contains_key(name) {
            return Ok(Attr::Value(self.call(name)?));
        }
        Err(EngineError::UnknownAttribute {
            collection: self.inner.collection.name().to_string(),
            name: name.to_string(),
        })
    }

    /// Whether `name` would resolve through [`RecordView::lookup`].
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        (!RESERVED_FIELDS.contains(&name) && self.inner.record.get(name).is_some())
            || self.inner.collection.relation(name).is_some()
            || self.inner.capabilities.contains_key(name)
    }

    /// The record's fields as a JSON value, for host-side templating.
    pub fn to_json(&self) -> Result<serde_json::Value, EngineError> {
        Ok(serde_json::to_value(self.inner.record.fields())?)
    }
}

impl PartialEq for RecordView {
    fn eq(&self, other: &Self) -> bool {
        self.inner.record == other.inner.record
            && self.inner.collection.name() == other.inner.collection.name()
    }
}

impl std::fmt::Debug for RecordView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordView")
            .field("collection", &self.inner.collection.name())
            .field("record", self.inner.record.fields())
            .finish()
    }
}

// Capability memo key: arguments rendered to a stable string, since Bson
// values are not hashable.
fn args_key(args: &[Bson]) -> String {
    format!("{args:?}")
}
