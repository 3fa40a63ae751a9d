/// CQL-style filter objects and their conversion to upstream parameters.
///
/// Generic callers express filters as a structured boolean expression (an
/// AND of comparison clauses) or as a raw parameter mapping. This module
/// renders that structure into the upstream's vocabulary: comparison clauses
/// accumulate under a `filters` key in the upstream predicate syntax, raw
/// mappings pass through as literal query parameters. The translator then
/// pops the `filters` key into its `FilterBuilder` — it is never sent as a
/// literal parameter from here.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::AdapterError;

/// Key under which rendered predicates are returned. The translator treats
/// this key specially (see `translate`).
pub const FILTERS_KEY: &str = "filters";

// ---------------------------------------------------------------------------
// Filter model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CqlOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CqlFilter {
    /// A single comparison clause, e.g. status eq "active".
    Comparison {
        field: String,
        op: CqlOp,
        value: Value,
    },
    /// Logical AND of sub-clauses. Nesting flattens.
    And(Vec<CqlFilter>),
    /// A raw parameter mapping, passed through untouched.
    Raw(BTreeMap<String, String>),
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Convert a filter into a query-parameter mapping.
///
/// Comparison clauses render in the upstream predicate syntax
/// (`field:value`, `field:>=value`, ...) and are joined with "," under
/// `FILTERS_KEY` in clause order. Raw-mapping entries become literal
/// parameters; on key collision the later entry wins.
pub fn to_query_params(filter: &CqlFilter) -> Result<BTreeMap<String, String>, AdapterError> {
    let mut params = BTreeMap::new();
    let mut fragments = Vec::new();
    collect(filter, &mut params, &mut fragments)?;

    if !fragments.is_empty() {
        params.insert(FILTERS_KEY.to_string(), fragments.join(","));
    }

    Ok(params)
}

fn collect(
    filter: &CqlFilter,
    params: &mut BTreeMap<String, String>,
    fragments: &mut Vec<String>,
) -> Result<(), AdapterError> {
    match filter {
        CqlFilter::Comparison { field, op, value } => {
            fragments.push(render_comparison(field, *op, value)?);
        }
        CqlFilter::And(clauses) => {
            for clause in clauses {
                collect(clause, params, fragments)?;
            }
        }
        CqlFilter::Raw(mapping) => {
            for (key, value) in mapping {
                params.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(())
}

fn render_comparison(field: &str, op: CqlOp, value: &Value) -> Result<String, AdapterError> {
    let rendered = scalar_to_string(value).ok_or_else(|| {
        AdapterError::Validation(format!(
            "filter value for '{}' must be a scalar, got {}",
            field, value
        ))
    })?;

    let fragment = match op {
        CqlOp::Eq => format!("{}:{}", field, rendered),
        CqlOp::Gt => format!("{}:>{}", field, rendered),
        CqlOp::Gte => format!("{}:>={}", field, rendered),
        CqlOp::Lt => format!("{}:<{}", field, rendered),
        CqlOp::Lte => format!("{}:<={}", field, rendered),
    };
    Ok(fragment)
}

/// Strings render bare (no quotes); numbers and booleans via their JSON
/// text. Arrays, objects, and null have no upstream predicate form.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
