use crate::errors::EngineError;
use crate::query::Query;
use crate::record::Record;
use crate::relations::{RelationSpec, pluralize, singularize};
use bson::{Bson, Document as Fields};
use std::collections::HashMap;
use std::sync::Arc;

/// A registered scope: a reusable query transformation bound to a collection.
/// Scopes receive the current query plus any call-site arguments and return
/// the transformed query.
pub type ScopeFn = Arc<dyn Fn(Query, &[Bson]) -> Result<Query, EngineError> + Send + Sync>;

/// A named, immutable set of records plus its scope and relation declarations.
/// Built once through [`CollectionBuilder`]; redefinition replaces it wholesale.
pub struct Collection {
    name: String,
    records: Vec<Record>,
    scopes: HashMap<String, ScopeFn>,
    // Declaration order matters: through-source inference walks this in order.
    relations: Vec<(String, RelationSpec)>,
}

impl Collection {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn scope(&self, name: &str) -> Option<&ScopeFn> {
        self.scopes.get(name)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.iter().find(|(n, _)| n == name).map(|(_, spec)| spec)
    }

    #[must_use]
    pub fn relations(&self) -> &[(String, RelationSpec)] {
        &self.relations
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("records", &self.records.len())
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .field("relations", &self.relations)
            .finish()
    }
}

/// Overrides for a relation declaration. Unset keys fall back to the
/// conventional defaults (see the `belongs_to`/`has_one`/`has_many` docs).
#[derive(Debug, Clone, Default)]
pub struct RelationOpts {
    /// Target collection name.
    pub target: Option<String>,
    pub foreign_key: Option<String>,
    /// Key on the target collection (belongs-to only).
    pub target_key: Option<String>,
    /// Key on the owning record (has-one / has-many only).
    pub owner_key: Option<String>,
    /// Name of the direct has-many relation to hop through (has-many only).
    pub through: Option<String>,
    /// Name of the belongs-to on the intermediate collection (has-many
    /// through only; defaults to the singularized relation name).
    pub source: Option<String>,
}

/// The definition surface handed to `Engine::define`. Loading records from
/// files or other sources is the host's concern; this builder only receives
/// already-built field mappings.
pub struct CollectionBuilder {
    name: String,
    records: Vec<Record>,
    scopes: HashMap<String, ScopeFn>,
    relations: Vec<(String, RelationSpec)>,
}

impl CollectionBuilder {
    pub(crate) fn new(name: &str) -> Self {
        Self { name: name.to_string(), records: Vec::new(), scopes: HashMap::new(), relations: Vec::new() }
    }

    /// Supplies the collection's records, in order.
    pub fn records<I>(&mut self, docs: I) -> &mut Self
    where
        I: IntoIterator<Item = Fields>,
    {
        self.records = docs.into_iter().map(Record::new).collect();
        self
    }

    /// Registers a named scope.
    pub fn scope<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(Query, &[Bson]) -> Result<Query, EngineError> + Send + Sync + 'static,
    {
        self.scopes.insert(name.to_string(), Arc::new(f));
        self
    }

    /// Declares a belongs-to relation with conventional keys: target
    /// collection `pluralize(name)`, foreign key `{name}_id`, target key `id`.
    pub fn belongs_to(&mut self, name: &str) -> &mut Self {
        self.belongs_to_with(name, RelationOpts::default())
    }

    pub fn belongs_to_with(&mut self, name: &str, opts: RelationOpts) -> &mut Self {
        let spec = RelationSpec::BelongsTo {
            target: opts.target.unwrap_or_else(|| pluralize(name)),
            foreign_key: opts.foreign_key.unwrap_or_else(|| format!("{name}_id")),
            target_key: opts.target_key.unwrap_or_else(|| "id".to_string()),
        };
        self.relations.push((name.to_string(), spec));
        self
    }

    /// Declares a has-one relation with conventional keys: target collection
    /// `pluralize(name)`, foreign key `{singularize(collection)}_id`, owner
    /// key `id`.
    pub fn has_one(&mut self, name: &str) -> &mut Self {
        self.has_one_with(name, RelationOpts::default())
    }

    pub fn has_one_with(&mut self, name: &str, opts: RelationOpts) -> &mut Self {
        let spec = RelationSpec::HasOne {
            target: opts.target.unwrap_or_else(|| pluralize(name)),
            foreign_key: opts
                .foreign_key
                .unwrap_or_else(|| format!("{}_id", singularize(&self.name))),
            owner_key: opts.owner_key.unwrap_or_else(|| "id".to_string()),
        };
        self.relations.push((name.to_string(), spec));
        self
    }

    /// Declares a direct has-many relation with conventional keys: target
    /// collection `name`, foreign key `{singularize(collection)}_id`, owner
    /// key `id`. Pass `through` in [`RelationOpts`] via
    /// [`CollectionBuilder::has_many_with`] for the two-hop form.
    pub fn has_many(&mut self, name: &str) -> &mut Self {
        self.has_many_with(name, RelationOpts::default())
    }

    pub fn has_many_with(&mut self, name: &str, opts: RelationOpts) -> &mut Self {
        let spec = if let Some(through) = opts.through {
            RelationSpec::HasManyThrough {
                through,
                source: opts.source.unwrap_or_else(|| singularize(name)),
            }
        } else {
            RelationSpec::HasMany {
                target: opts.target.unwrap_or_else(|| name.to_string()),
                foreign_key: opts
                    .foreign_key
                    .unwrap_or_else(|| format!("{}_id", singularize(&self.name))),
                owner_key: opts.owner_key.unwrap_or_else(|| "id".to_string()),
            }
        };
        self.relations.push((name.to_string(), spec));
        self
    }

    pub(crate) fn build(self) -> Collection {
        Collection {
            name: self.name,
            records: self.records,
            scopes: self.scopes,
            relations: self.relations,
        }
    }
}
