//! Projection of cleaned row-sets onto a dataset's target schema.

use std::collections::HashSet;

use crate::catalog::{CoercionRule, ColumnMapping, TargetSchema};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, Field, Schema, Value};

/// Project `dataset` onto `target`.
///
/// For [`TargetSchema::Columns`], output columns appear exactly in declared order, each taken
/// from its source column and passed through its [`CoercionRule`]. Source columns that are not
/// referenced are dropped. Row count never changes: the first value that fails coercion aborts
/// the whole dataset with [`PipelineError::CoercionError`].
///
/// [`TargetSchema::PassThrough`] returns the dataset unchanged.
pub fn normalize(dataset: &DataSet, target: &TargetSchema) -> PipelineResult<DataSet> {
    let mappings = match target {
        TargetSchema::PassThrough => return Ok(dataset.clone()),
        TargetSchema::Columns(mappings) => mappings,
    };

    let plan = resolve(&dataset.schema, mappings)?;
    let schema = plan_schema(&dataset.schema, &plan);

    let mut rows = Vec::with_capacity(dataset.row_count());
    for (idx0, row) in dataset.rows.iter().enumerate() {
        let out = plan
            .iter()
            .map(|(src_idx, mapping)| coerce(idx0 + 1, mapping, &row[*src_idx]))
            .collect::<PipelineResult<Vec<_>>>()?;
        rows.push(out);
    }

    Ok(DataSet::new(schema, rows))
}

/// Schema [`normalize`] produces for an input with schema `input`.
pub fn output_schema(input: &Schema, target: &TargetSchema) -> PipelineResult<Schema> {
    match target {
        TargetSchema::PassThrough => Ok(input.clone()),
        TargetSchema::Columns(mappings) => Ok(plan_schema(input, &resolve(input, mappings)?)),
    }
}

/// Apply one column's rule to a single value. `row` is only used for error reporting.
///
/// Missing values pass through every rule unchanged.
pub fn coerce(row: usize, mapping: &ColumnMapping, value: &Value) -> PipelineResult<Value> {
    match (mapping.rule, value) {
        (_, Value::Null) => Ok(Value::Null),
        (CoercionRule::Identity, v) => Ok(v.clone()),
        (CoercionRule::LowercaseText, Value::Utf8(s)) => Ok(Value::Utf8(s.to_lowercase())),
        (CoercionRule::LowercaseText, Value::Int64(v)) => Ok(Value::Utf8(v.to_string())),
        (CoercionRule::ParseInteger, Value::Int64(v)) => Ok(Value::Int64(*v)),
        (CoercionRule::ParseInteger, Value::Utf8(s)) => {
            s.trim()
                .parse::<i64>()
                .map(Value::Int64)
                .map_err(|e| PipelineError::CoercionError {
                    row,
                    column: mapping.source.clone(),
                    raw: s.clone(),
                    message: e.to_string(),
                })
        }
    }
}

fn resolve<'m>(
    input: &Schema,
    mappings: &'m [ColumnMapping],
) -> PipelineResult<Vec<(usize, &'m ColumnMapping)>> {
    let mut outputs = HashSet::with_capacity(mappings.len());
    let mut plan = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        if !outputs.insert(mapping.output.as_str()) {
            return Err(PipelineError::SchemaMismatch {
                message: format!("duplicate output column '{}'", mapping.output),
            });
        }
        let idx = input.index_of(&mapping.source).ok_or_else(|| PipelineError::SchemaMismatch {
            message: format!(
                "missing required column '{}'. columns={:?}",
                mapping.source,
                input.field_names().collect::<Vec<_>>()
            ),
        })?;
        plan.push((idx, mapping));
    }
    Ok(plan)
}

fn plan_schema(input: &Schema, plan: &[(usize, &ColumnMapping)]) -> Schema {
    Schema::new(
        plan.iter()
            .map(|(idx, m)| {
                Field::new(m.output.clone(), m.rule.output_type(input.fields[*idx].data_type))
            })
            .collect(),
    )
}
