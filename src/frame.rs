//! Dataset loading and the canonical value projection used for comparisons.
//!
//! Filters, allowed-value sets and chart categories are declared in JSON/YAML
//! documents, so every polars cell is projected onto a [`serde_json::Value`]
//! before it is compared with a declared value. Numbers compare numerically
//! (`3` matches `3.0`), strings exactly, and `null` never matches anything.

use crate::error::{CertError, Result, ResultExt as _};
use polars::prelude::*;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::path::Path;

/// Load a CSV file with a header row into a `DataFrame`.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(CertError::InvalidPath(format!(
            "Dataset not found: {}",
            path.display()
        )));
    }

    LazyCsvReader::new(path)
        .with_infer_schema_length(Some(10_000))
        .with_has_header(true)
        .with_try_parse_dates(true)
        .finish()?
        .collect()
        .with_context(|| format!("Failed to read CSV: {}", path.display()))
}

/// Project a single polars cell onto a JSON value.
pub fn any_value_to_json(value: &AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::String(s) => Value::String((*s).to_owned()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int32(v) => Value::from(*v),
        AnyValue::Int64(v) => Value::from(*v),
        AnyValue::UInt32(v) => Value::from(*v),
        AnyValue::UInt64(v) => Value::from(*v),
        AnyValue::Float32(v) => float_to_json(f64::from(*v)),
        AnyValue::Float64(v) => float_to_json(*v),
        other if other.dtype().is_integer() => {
            other.extract::<i64>().map_or(Value::Null, Value::from)
        }
        other => Value::String(other.to_string()),
    }
}

fn float_to_json(v: f64) -> Value {
    Number::from_f64(v).map_or(Value::Null, Value::Number)
}

/// All values of a series, in row order, as JSON values.
///
/// Categorical columns are projected through their string labels.
pub fn json_values(series: &Series) -> PolarsResult<Vec<Value>> {
    let series = match series.dtype() {
        DataType::Categorical(..) | DataType::Enum(..) => series.cast(&DataType::String)?,
        _ => series.clone(),
    };

    (0..series.len())
        .map(|idx| series.get(idx).map(|v| any_value_to_json(&v)))
        .collect()
}

/// Canonical key used for equality and set membership.
pub fn value_key(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => format!("b:{b}"),
        Value::Number(n) => number_key(n),
        Value::String(s) => format!("s:{s}"),
        other => format!("j:{other}"),
    }
}

/// Integers key exactly; integral floats share the integer key so `3` and `3.0`
/// still meet.
fn number_key(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return format!("n:{i}");
    }
    if let Some(u) = n.as_u64() {
        return format!("n:{u}");
    }
    match n.as_f64() {
        // Display renders integral floats without a fractional part.
        Some(f) => format!("n:{f}"),
        None => format!("n:{n}"),
    }
}

/// Whether an observed value equals a declared one. `null` matches nothing.
pub fn values_match(observed: &Value, declared: &Value) -> bool {
    if observed.is_null() || declared.is_null() {
        return false;
    }
    value_key(observed) == value_key(declared)
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: by type, then numerically or lexically.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x.cmp(&y);
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x.cmp(&y);
            }
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a)
            .cmp(&type_rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

/// Sort and deduplicate values under the canonical order and key.
pub fn sorted_distinct(mut values: Vec<Value>) -> Vec<Value> {
    values.sort_by(compare_values);
    values.dedup_by(|a, b| value_key(a) == value_key(b));
    values
}
