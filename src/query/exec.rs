use bson::Bson;
use once_cell::unsync::OnceCell;
use std::cmp::Ordering;
use std::sync::Arc;

use super::eval::{self, cond_matches};
use super::types::{Cond, Condition, Order};
use crate::collection::Collection;
use crate::engine::Engine;
use crate::errors::EngineError;
use crate::record::Record;
use crate::view::RecordView;

/// An immutable description of a pending computation over one collection's
/// records. Every builder method borrows the receiver and returns a new
/// query; nothing is evaluated until a terminal operation runs, and the
/// materialized result is cached on the query instance that produced it.
#[derive(Clone)]
pub struct Query {
    engine: Engine,
    collection: Arc<Collection>,
    conditions: Vec<Condition>,
    order_field: Option<String>,
    order: Order,
    limit: Option<usize>,
    offset: Option<i64>,
    results: OnceCell<Vec<RecordView>>,
}

impl Query {
    pub(crate) fn new(engine: Engine, collection: Arc<Collection>) -> Self {
        Self {
            engine,
            collection,
            conditions: Vec::new(),
            order_field: None,
            order: Order::Asc,
            limit: None,
            offset: None,
            results: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    // A copy of this query with a fresh result cache, for builder methods.
    fn derived(&self) -> Query {
        Query {
            engine: self.engine.clone(),
            collection: self.collection.clone(),
            conditions: self.conditions.clone(),
            order_field: self.order_field.clone(),
            order: self.order,
            limit: self.limit,
            offset: self.offset,
            results: OnceCell::new(),
        }
    }

    // A condition-free query on the same collection, handed to group blocks.
    fn blank(&self) -> Query {
        Query::new(self.engine.clone(), self.collection.clone())
    }

    /// Appends a plain AND condition set.
    #[must_use]
    pub fn filter(&self, cond: Cond) -> Query {
        if cond.is_empty() {
            return self.derived();
        }
        let mut q = self.derived();
        q.conditions.push(Condition::All(cond));
        q
    }

    /// Appends an explicit OR condition set. OR entries match against the
    /// query's original dataset and union into the result; chained OR entries
    /// each disjoin with the AND chain rather than with one another.
    #[must_use]
    pub fn or_filter(&self, cond: Cond) -> Query {
        if cond.is_empty() {
            return self.derived();
        }
        let mut q = self.derived();
        q.conditions.push(Condition::Any(cond));
        q
    }

    /// Builds an isolated sub-query, passes it to the block, and appends the
    /// sub-query's accumulated conditions as one nested AND group.
    #[must_use]
    pub fn filter_group<F>(&self, f: F) -> Query
    where
        F: FnOnce(Query) -> Query,
    {
        let sub = f(self.blank());
        let mut q = self.derived();
        q.conditions.push(Condition::AndGroup(sub.conditions));
        q
    }

    /// Like [`Query::filter_group`], but the captured group unions into the
    /// result as one nested OR group.
    #[must_use]
    pub fn or_filter_group<F>(&self, f: F) -> Query
    where
        F: FnOnce(Query) -> Query,
    {
        let sub = f(self.blank());
        let mut q = self.derived();
        q.conditions.push(Condition::OrGroup(sub.conditions));
        q
    }

    #[must_use]
    pub fn order(&self, field: &str, order: Order) -> Query {
        let mut q = self.derived();
        q.order_field = Some(field.to_string());
        q.order = order;
        q
    }

    #[must_use]
    pub fn limit(&self, count: usize) -> Query {
        let mut q = self.derived();
        q.limit = Some(count);
        q
    }

    /// A negative offset behaves as zero; an offset beyond the result length
    /// yields an empty result.
    #[must_use]
    pub fn offset(&self, count: i64) -> Query {
        let mut q = self.derived();
        q.offset = Some(count);
        q
    }

    /// Runs the named registered scope on this query.
    pub fn scope(&self, name: &str) -> Result<Query, EngineError> {
        self.scope_with(name, &[])
    }

    /// Runs the named registered scope with arguments. A scope's failure is
    /// re-raised carrying the scope and collection names.
    pub fn scope_with(&self, name: &str, args: &[Bson]) -> Result<Query, EngineError> {
        let scope_error = |message: String| EngineError::Scope {
            collection: self.collection.name().to_string(),
            scope: name.to_string(),
            message,
        };
        let Some(f) = self.collection.scope(name) else {
            return Err(scope_error("scope is not defined".to_string()));
        };
        f(self.derived(), args).map_err(|e| scope_error(e.to_string()))
    }

    /// Materializes the query, caching the wrapped views on first call.
    pub fn all(&self) -> &[RecordView] {
        self.results
            .get_or_init(|| self.apply_filters().into_iter().map(|r| self.wrap(r)).collect())
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<RecordView> {
        self.all().to_vec()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordView> {
        self.all().iter()
    }

    #[must_use]
    pub fn first(&self) -> Option<RecordView> {
        self.all().first().cloned()
    }

    #[must_use]
    pub fn last(&self) -> Option<RecordView> {
        self.all().last().cloned()
    }

    /// First record matching the additional conditions, with this query's
    /// ordering and limits still applied.
    #[must_use]
    pub fn find_by(&self, cond: Cond) -> Option<RecordView> {
        self.filter(cond).first()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.all().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all().is_empty()
    }

    /// Filtered record count without wrapping views.
    #[must_use]
    pub fn raw_count(&self) -> usize {
        self.apply_filters().len()
    }

    pub(crate) fn limit_count(&self) -> Option<usize> {
        self.limit
    }

    fn wrap(&self, record: Record) -> RecordView {
        RecordView::new(self.engine.clone(), self.collection.clone(), record)
    }

    pub(crate) fn apply_filters(&self) -> Vec<Record> {
        let filtered = if self.conditions.is_empty() {
            self.collection.records().to_vec()
        } else {
            filter_set(self.collection.records(), &self.conditions)
        };
        self.apply_ordering_and_limits(filtered)
    }

    fn apply_ordering_and_limits(&self, records: Vec<Record>) -> Vec<Record> {
        let mut result = records;

        if let Some(field) = &self.order_field {
            let (mut sorted, nulls): (Vec<Record>, Vec<Record>) =
                result.into_iter().partition(|r| r.value_of(field).is_some());
            sorted.sort_by(|a, b| sort_cmp(a, b, field));
            if self.order == Order::Desc {
                // Nulls stay at the end regardless of direction; only the
                // sorted non-null run is reversed.
                sorted.reverse();
            }
            sorted.extend(nulls);
            result = sorted;
        }

        let offset = self.offset.unwrap_or(0).max(0) as usize;
        if offset > 0 {
            result = if offset >= result.len() { Vec::new() } else { result.split_off(offset) };
        }
        if let Some(limit) = self.limit {
            result.truncate(limit);
        }
        result
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("collection", &self.collection.name())
            .field("conditions", &self.conditions)
            .field("order_field", &self.order_field)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<'a> IntoIterator for &'a Query {
    type Item = &'a RecordView;
    type IntoIter = std::slice::Iter<'a, RecordView>;

    fn into_iter(self) -> Self::IntoIter {
        self.all().iter()
    }
}

/// Walks condition entries in declaration order over `data`. AND entries
/// narrow the accumulator; OR entries (hash and group forms alike) match
/// against `data` itself, the group's original dataset, and union in at the
/// end, deduplicated by value with first-occurrence order preserved.
fn filter_set(data: &[Record], conditions: &[Condition]) -> Vec<Record> {
    let mut and_result: Vec<Record> = data.to_vec();
    let mut or_results: Vec<Record> = Vec::new();

    for condition in conditions {
        match condition {
            Condition::All(cond) => {
                and_result.retain(|r| cond_matches(r, cond));
            }
            Condition::Any(cond) => {
                or_results.extend(data.iter().filter(|r| cond_matches(r, cond)).cloned());
            }
            Condition::AndGroup(subs) => {
                and_result = filter_set(&and_result, subs);
            }
            Condition::OrGroup(subs) => {
                or_results.extend(filter_set(data, subs));
            }
        }
    }

    if or_results.is_empty() {
        return and_result;
    }
    let mut merged: Vec<Record> = Vec::with_capacity(and_result.len());
    for record in and_result.into_iter().chain(or_results) {
        if !merged.contains(&record) {
            merged.push(record);
        }
    }
    merged
}

// Heterogeneous order-field values never error: values group by type rank
// (numeric < string < date/time < other-stringified) and compare within a
// group.
fn sort_cmp(a: &Record, b: &Record, field: &str) -> Ordering {
    let (Some(va), Some(vb)) = (a.value_of(field), b.value_of(field)) else {
        return Ordering::Equal;
    };
    let (ra, rb) = (sort_rank(va), sort_rank(vb));
    if ra != rb {
        return ra.cmp(&rb);
    }
    eval::compare_values(va, vb)
        .unwrap_or_else(|| eval::display_value(Some(va)).cmp(&eval::display_value(Some(vb))))
}

fn sort_rank(v: &Bson) -> u8 {
    if eval::is_numeric(v) {
        return 0;
    }
    match v {
        Bson::String(_) => 1,
        Bson::DateTime(_) => 2,
        _ => 3,
    }
}
