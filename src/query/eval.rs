use bson::Bson;
use std::cmp::Ordering;

use super::types::{Cond, Matcher};
use crate::record::Record;

/// Evaluates one operator-spec against one field of a record. Pure; a missing
/// field and an explicit null read the same.
pub fn matches(record: &Record, field: &str, matcher: &Matcher) -> bool {
    let value = record.value_of(field);
    match matcher {
        Matcher::Eq(spec) => eq_matches(value, spec),
        Matcher::Contains(needle) => display_value(value).contains(needle.as_str()),
        Matcher::StartsWith(prefix) => display_value(value).starts_with(prefix.as_str()),
        Matcher::EndsWith(suffix) => display_value(value).ends_with(suffix.as_str()),
        Matcher::GreaterThan(rhs) => cmp_is(value, rhs, |o| o == Ordering::Greater),
        Matcher::LessThan(rhs) => cmp_is(value, rhs, |o| o == Ordering::Less),
        Matcher::GreaterThanOrEqual(rhs) => cmp_is(value, rhs, |o| o != Ordering::Less),
        Matcher::LessThanOrEqual(rhs) => cmp_is(value, rhs, |o| o != Ordering::Greater),
        Matcher::Between { from, to } => {
            let lower = from.as_ref().is_none_or(|b| cmp_is(value, b, |o| o != Ordering::Less));
            let upper = to.as_ref().is_none_or(|b| cmp_is(value, b, |o| o != Ordering::Greater));
            value.is_some() && lower && upper
        }
        Matcher::In(set) => in_set(value, set),
        Matcher::NotIn(set) => !in_set(value, set),
        Matcher::Ne(rhs) => !values_equal(value.unwrap_or(&Bson::Null), rhs),
        Matcher::Exists(present) => value.is_some() == *present,
        Matcher::Empty(empty) => is_empty_value(value) == *empty,
    }
}

/// True iff every field condition in `cond` matches.
pub fn cond_matches(record: &Record, cond: &Cond) -> bool {
    cond.fields.iter().all(|(field, matcher)| matches(record, field, matcher))
}

fn eq_matches(value: Option<&Bson>, spec: &Bson) -> bool {
    let effective = value.unwrap_or(&Bson::Null);
    match (effective, spec) {
        // Array spec vs array field: exact equality. Vs scalar: membership.
        (Bson::Array(a), Bson::Array(b)) => arrays_equal(a, b),
        (scalar, Bson::Array(set)) => set.iter().any(|x| values_equal(scalar, x)),
        (a, b) => values_equal(a, b),
    }
}

fn in_set(value: Option<&Bson>, set: &[Bson]) -> bool {
    let effective = value.unwrap_or(&Bson::Null);
    set.iter().any(|x| values_equal(effective, x))
}

fn is_empty_value(value: Option<&Bson>) -> bool {
    match value {
        None => true,
        Some(Bson::String(s)) => s.is_empty(),
        Some(Bson::Array(a)) => a.is_empty(),
        Some(Bson::Document(d)) => d.is_empty(),
        Some(_) => false,
    }
}

fn cmp_is(value: Option<&Bson>, rhs: &Bson, pred: impl Fn(Ordering) -> bool) -> bool {
    // Null field values never satisfy an ordering comparison, and neither do
    // incomparable type pairs.
    value.and_then(|v| compare_values(v, rhs)).is_some_and(pred)
}

/// Numeric-aware equality: `1 == 1.0`, arrays element-wise, documents
/// key-by-key, everything else by structural equality.
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    if is_numeric(a) && is_numeric(b) {
        return as_f64(a).total_cmp(&as_f64(b)) == Ordering::Equal;
    }
    match (a, b) {
        (Bson::Array(x), Bson::Array(y)) => arrays_equal(x, y),
        (Bson::Document(x), Bson::Document(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

fn arrays_equal(a: &[Bson], b: &[Bson]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
}

/// Ordering comparison for the pairs that support one: numbers (as f64 via
/// `total_cmp`), strings, date/times, booleans. Any other pair is
/// incomparable and yields `None`.
pub fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    if is_numeric(a) && is_numeric(b) {
        return Some(as_f64(a).total_cmp(&as_f64(b)));
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

pub(crate) fn is_numeric(v: &Bson) -> bool {
    matches!(v, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_))
}

pub(crate) fn as_f64(v: &Bson) -> f64 {
    match v {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        Bson::Decimal128(d) => d.to_string().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// String coercion for the substring operators and for stringified sort keys.
/// Null is the empty string; strings come through unquoted; arrays render
/// element-wise, so `contains` on an array field matches its elements.
pub(crate) fn display_value(value: Option<&Bson>) -> String {
    match value {
        None | Some(Bson::Null) => String::new(),
        Some(Bson::String(s)) => s.clone(),
        Some(Bson::Int32(i)) => i.to_string(),
        Some(Bson::Int64(i)) => i.to_string(),
        Some(Bson::Double(f)) => f.to_string(),
        Some(Bson::Boolean(b)) => b.to_string(),
        Some(Bson::Decimal128(d)) => d.to_string(),
        Some(Bson::DateTime(dt)) => dt.to_chrono().to_rfc3339(),
        Some(Bson::Array(items)) => {
            let parts: Vec<String> =
                items.iter().map(|item| display_value(Some(item))).collect();
            format!("[{}]", parts.join(", "))
        }
        Some(other) => format!("{other:?}"),
    }
}
