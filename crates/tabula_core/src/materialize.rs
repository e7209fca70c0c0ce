//! Regroups flat query rows into per-column value groups.

use log::debug;

use crate::{CellValue, Executor, GridError, GridResult, QueryPlan, Row, Schema, ValueGroup};

/// Execute the planned SELECT and materialize every returned row.
pub fn load<E: Executor + ?Sized>(
    executor: &mut E,
    schema: &Schema,
    plan: &QueryPlan,
) -> GridResult<Vec<Row>> {
    let sql = plan.select_sql(schema.table());
    let flat_rows = executor.query(&sql, &[])?;
    debug!(
        "tabula: materializing {} rows from '{}'",
        flat_rows.len(),
        schema.table()
    );
    flat_rows
        .into_iter()
        .enumerate()
        .map(|(index, flat)| {
            regroup(schema, plan, flat).map_err(|err| {
                GridError::contract(format!("row {index} of '{}': {err}", schema.table()))
            })
        })
        .collect()
}

/// Split one flat row at every change of owning schema column and append the
/// delete marker. Any disagreement with the schema's arities is an error.
pub fn regroup(schema: &Schema, plan: &QueryPlan, flat: Vec<CellValue>) -> GridResult<Row> {
    if flat.len() != plan.width() {
        return Err(GridError::contract(format!(
            "query returned {} columns, plan selects {}",
            flat.len(),
            plan.width()
        )));
    }
    let mut groups: Vec<ValueGroup> = Vec::with_capacity(schema.len());
    let mut current: Option<usize> = None;
    let mut pending: Vec<CellValue> = Vec::new();
    for (value, owner) in flat.into_iter().zip(plan.column_map.iter().copied()) {
        if current.is_some_and(|index| index != owner) {
            groups.push(ValueGroup::new(std::mem::take(&mut pending)));
        }
        current = Some(owner);
        pending.push(value);
    }
    if current.is_some() {
        groups.push(ValueGroup::new(pending));
    }
    let delete_index = schema.delete_index();
    if groups.len() != delete_index {
        return Err(GridError::contract(format!(
            "regrouped into {} groups, schema declares {} columns",
            groups.len(),
            delete_index
        )));
    }
    for (index, (group, column)) in groups.iter().zip(schema.columns()).enumerate() {
        if group.len() != column.arity() {
            return Err(GridError::contract(format!(
                "column {index} ('{}') materialized {} values, expected {}",
                column.column_name,
                group.len(),
                column.arity()
            )));
        }
    }
    groups.push(schema.columns()[delete_index].default_group());
    Ok(Row::new(groups))
}
