use crate::collection::Collection;
use crate::engine::Engine;
use crate::errors::EngineError;
use crate::query::{Cond, Query};
use crate::record::Record;
use crate::view::RecordView;
use bson::Bson;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Naive s-suffix inflection. Collection names that pluralize irregularly must
// spell out `target` in RelationOpts.
pub(crate) fn pluralize(word: &str) -> String {
    if word.ends_with('s') { word.to_string() } else { format!("{word}s") }
}

pub(crate) fn singularize(word: &str) -> String {
    word.strip_suffix('s').unwrap_or(word).to_string()
}

/// A declared navigational link between collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelationSpec {
    BelongsTo { target: String, foreign_key: String, target_key: String },
    HasOne { target: String, owner_key: String, foreign_key: String },
    HasMany { target: String, owner_key: String, foreign_key: String },
    HasManyThrough { through: String, source: String },
}

/// The result of resolving a relation on one record: a single view for
/// belongs-to / has-one, or a live, chainable sub-query for the has-many
/// kinds. `None` means a to-one relation with no match.
#[derive(Clone)]
pub enum Related {
    One(RecordView),
    None,
    Many(Query),
}

impl Related {
    #[must_use]
    pub fn record(&self) -> Option<&RecordView> {
        match self {
            Related::One(view) => Some(view),
            _ => None,
        }
    }

    #[must_use]
    pub fn query(&self) -> Option<&Query> {
        match self {
            Related::Many(query) => Some(query),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Related::None)
    }
}

impl std::fmt::Debug for Related {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Related::One(view) => f.debug_tuple("One").field(view).finish(),
            Related::None => write!(f, "None"),
            Related::Many(query) => {
                f.debug_tuple("Many").field(&query.collection_name()).finish()
            }
        }
    }
}

fn relation_error(collection: &str, relation: &str, message: impl Into<String>) -> EngineError {
    EngineError::Relation {
        collection: collection.to_string(),
        relation: relation.to_string(),
        message: message.into(),
    }
}

/// Resolves the named relation of `owner` (a record of `collection`) against
/// the engine's current collections.
pub(crate) fn resolve(
    engine: &Engine,
    collection: &Arc<Collection>,
    owner: &Record,
    name: &str,
) -> Result<Related, EngineError> {
    let Some(spec) = collection.relation(name) else {
        return Err(relation_error(collection.name(), name, "unknown relation"));
    };
    match spec {
        RelationSpec::BelongsTo { target, foreign_key, target_key } => {
            match owner.value_of(foreign_key) {
                // A null foreign key resolves to no parent, not to an error.
                None => Ok(Related::None),
                Some(value) => {
                    let found = engine
                        .query(target)?
                        .find_by(Cond::new().eq(target_key, value.clone()));
                    Ok(found.map_or(Related::None, Related::One))
                }
            }
        }
        RelationSpec::HasOne { target, owner_key, foreign_key } => {
            let value = owner.get(owner_key).cloned().unwrap_or(Bson::Null);
            let found = engine.query(target)?.find_by(Cond::new().eq(foreign_key, value));
            Ok(found.map_or(Related::None, Related::One))
        }
        RelationSpec::HasMany { target, owner_key, foreign_key } => {
            let value = owner.get(owner_key).cloned().unwrap_or(Bson::Null);
            Ok(Related::Many(engine.query(target)?.filter(Cond::new().eq(foreign_key, value))))
        }
        RelationSpec::HasManyThrough { through, source } => {
            resolve_through(engine, collection, owner, name, through, source)
        }
    }
}

/// Two-hop resolution: materialize the intermediate records named by the
/// `through` relation, then follow the belongs-to `source` on the
/// intermediate collection to the final target.
fn resolve_through(
    engine: &Engine,
    collection: &Arc<Collection>,
    owner: &Record,
    name: &str,
    through: &str,
    source: &str,
) -> Result<Related, EngineError> {
    let Some(RelationSpec::HasMany { target: inter_name, owner_key, foreign_key }) =
        collection.relation(through)
    else {
        return Err(relation_error(
            collection.name(),
            name,
            format!("through relation `{through}` must be a direct has-many"),
        ));
    };

    let intermediate = engine.collection(inter_name)?;
    let (target, source_fk, target_key) =
        find_source_belongs_to(&intermediate, source).ok_or_else(|| {
            relation_error(
                collection.name(),
                name,
                format!(
                    "no belongs-to `{source}` on intermediate collection `{inter_name}`; \
                     declare it there or name the source explicitly"
                ),
            )
        })?;

    let owner_value = owner.get(owner_key).cloned().unwrap_or(Bson::Null);
    let rows = engine
        .query(inter_name)?
        .filter(Cond::new().eq(foreign_key, owner_value))
        .to_vec();

    let mut target_keys: Vec<Bson> = Vec::new();
    for row in &rows {
        if let Some(value) = row.record().value_of(source_fk)
            && !target_keys.iter().any(|seen| crate::query::values_equal(seen, value))
        {
            target_keys.push(value.clone());
        }
    }

    let target_query = engine.query(target)?;
    if target_keys.is_empty() {
        // Keep the empty case chainable: filter on the configured sentinel,
        // a key value the host guarantees never occurs.
        let sentinel = engine.options().missing_relation_sentinel.clone();
        Ok(Related::Many(target_query.filter(Cond::new().eq(target_key, sentinel))))
    } else {
        Ok(Related::Many(target_query.filter(Cond::new().is_in(target_key, target_keys))))
    }
}

/// Finds the source belongs-to on the intermediate collection: an exact name
/// match first, otherwise the first declared belongs-to whose pluralized
/// target collection equals the source name.
fn find_source_belongs_to<'a>(
    intermediate: &'a Collection,
    source: &str,
) -> Option<(&'a str, &'a str, &'a str)> {
    let as_parts = |spec: &'a RelationSpec| match spec {
        RelationSpec::BelongsTo { target, foreign_key, target_key } => {
            Some((target.as_str(), foreign_key.as_str(), target_key.as_str()))
        }
        _ => None,
    };
    if let Some(parts) = intermediate.relation(source).and_then(as_parts) {
        return Some(parts);
    }
    intermediate
        .relations()
        .iter()
        .filter_map(|(_, spec)| as_parts(spec))
        .find(|(target, _, _)| pluralize(target) == source)
}
