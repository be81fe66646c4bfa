use bson::Bson;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

/// One operator-spec applied to a single field. `Eq` doubles as the plain
/// equality case: an array spec against an array field compares for exact
/// equality, against a scalar field it acts as a membership set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Matcher {
    Eq(Bson),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    GreaterThan(Bson),
    LessThan(Bson),
    GreaterThanOrEqual(Bson),
    LessThanOrEqual(Bson),
    /// Inclusive range membership; either bound may be open.
    Between { from: Option<Bson>, to: Option<Bson> },
    In(Vec<Bson>),
    NotIn(Vec<Bson>),
    Ne(Bson),
    /// True iff the field is non-null (or its negation).
    Exists(bool),
    /// True iff the field is null, an empty string, or an empty
    /// array/document (or its negation).
    Empty(bool),
}

/// An ordered set of field conditions, all of which must match. The building
/// block for both plain-AND and explicit-OR condition entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cond {
    pub(crate) fields: Vec<(String, Matcher)>,
}

impl Cond {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn matcher(mut self, field: &str, matcher: Matcher) -> Self {
        self.fields.push((field.to_string(), matcher));
        self
    }

    #[must_use]
    pub fn eq(self, field: &str, value: impl Into<Bson>) -> Self {
        self.matcher(field, Matcher::Eq(value.into()))
    }

    #[must_use]
    pub fn contains(self, field: &str, needle: impl Into<String>) -> Self {
        self.matcher(field, Matcher::Contains(needle.into()))
    }

    #[must_use]
    pub fn starts_with(self, field: &str, prefix: impl Into<String>) -> Self {
        self.matcher(field, Matcher::StartsWith(prefix.into()))
    }

    #[must_use]
    pub fn ends_with(self, field: &str, suffix: impl Into<String>) -> Self {
        self.matcher(field, Matcher::EndsWith(suffix.into()))
    }

    #[must_use]
    pub fn gt(self, field: &str, value: impl Into<Bson>) -> Self {
        self.matcher(field, Matcher::GreaterThan(value.into()))
    }

    #[must_use]
    pub fn lt(self, field: &str, value: impl Into<Bson>) -> Self {
        self.matcher(field, Matcher::LessThan(value.into()))
    }

    #[must_use]
    pub fn gte(self, field: &str, value: impl Into<Bson>) -> Self {
        self.matcher(field, Matcher::GreaterThanOrEqual(value.into()))
    }

    #[must_use]
    pub fn lte(self, field: &str, value: impl Into<Bson>) -> Self {
        self.matcher(field, Matcher::LessThanOrEqual(value.into()))
    }

    /// Inclusive lower bound only.
    #[must_use]
    pub fn from(self, field: &str, value: impl Into<Bson>) -> Self {
        self.matcher(field, Matcher::Between { from: Some(value.into()), to: None })
    }

    /// Inclusive upper bound only.
    #[must_use]
    pub fn to(self, field: &str, value: impl Into<Bson>) -> Self {
        self.matcher(field, Matcher::Between { from: None, to: Some(value.into()) })
    }

    /// Inclusive range membership on both bounds.
    #[must_use]
    pub fn between(self, field: &str, from: impl Into<Bson>, to: impl Into<Bson>) -> Self {
        self.matcher(field, Matcher::Between { from: Some(from.into()), to: Some(to.into()) })
    }

    #[must_use]
    pub fn is_in<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.matcher(field, Matcher::In(values.into_iter().map(Into::into).collect()))
    }

    #[must_use]
    pub fn not_in<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.matcher(field, Matcher::NotIn(values.into_iter().map(Into::into).collect()))
    }

    #[must_use]
    pub fn ne(self, field: &str, value: impl Into<Bson>) -> Self {
        self.matcher(field, Matcher::Ne(value.into()))
    }

    #[must_use]
    pub fn exists(self, field: &str, present: bool) -> Self {
        self.matcher(field, Matcher::Exists(present))
    }

    #[must_use]
    pub fn empty(self, field: &str, empty: bool) -> Self {
        self.matcher(field, Matcher::Empty(empty))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One entry in a query's condition list, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Condition {
    /// Plain AND hash: narrows the AND accumulator.
    All(Cond),
    /// Explicit OR hash: matches against the group's original dataset.
    Any(Cond),
    /// Nested group captured from a `filter_group` block.
    AndGroup(Vec<Condition>),
    /// Nested group captured from an `or_filter_group` block.
    OrGroup(Vec<Condition>),
}
