//! Selectable rows of a referenced table, for foreign-key editors.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    CellValue, Executor, ForeignKeyHandle, ForeignKeySpec, GridError, GridResult, ValueGroup,
};

/// A full value group an editor can write back, plus its rendered label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyOption {
    pub group: ValueGroup,
    pub label: String,
}

impl ForeignKeyOption {
    pub fn id(&self) -> &CellValue {
        self.group.primary()
    }
}

pub fn options_sql(spec: &ForeignKeySpec) -> String {
    let mut columns = vec![spec.foreign_column.as_str()];
    columns.extend(spec.display_columns.iter().map(String::as_str));
    columns.extend(spec.auxiliary_columns.iter().map(|aux| aux.column_name.as_str()));
    let joins: String = spec
        .additional_joins
        .iter()
        .map(|join| format!(" {join}"))
        .collect();
    format!(
        "SELECT {} FROM {}{joins} ORDER BY {}",
        columns.join(", "),
        spec.reference_table,
        spec.foreign_column
    )
}

pub fn load_options<E: Executor + ?Sized>(
    executor: &mut E,
    spec: &ForeignKeySpec,
) -> GridResult<Vec<ForeignKeyOption>> {
    let sql = options_sql(spec);
    let rows = executor.query(&sql, &[])?;
    debug!(
        "tabula: {} options from '{}'",
        rows.len(),
        spec.reference_table
    );
    rows.into_iter()
        .map(|values| {
            if values.len() != spec.arity() {
                return Err(GridError::contract(format!(
                    "option query on '{}' returned {} columns, expected {}",
                    spec.reference_table,
                    values.len(),
                    spec.arity()
                )));
            }
            let group = ValueGroup::new(values);
            let label = spec.format_group(&group)?;
            Ok(ForeignKeyOption { group, label })
        })
        .collect()
}

impl ForeignKeyHandle {
    pub fn options<E: Executor + ?Sized>(&self, executor: &mut E) -> GridResult<Vec<ForeignKeyOption>> {
        load_options(executor, &self.spec)
    }

    /// Where the handle's current id sits in `options`, if exactly once.
    pub fn current_position(&self, options: &[ForeignKeyOption]) -> Option<usize> {
        position_of(options, &self.id)
    }
}

/// Index of the single option whose id equals `id`.
pub fn position_of(options: &[ForeignKeyOption], id: &CellValue) -> Option<usize> {
    let mut matches = options
        .iter()
        .enumerate()
        .filter(|(_, option)| option.id() == id)
        .map(|(index, _)| index);
    match (matches.next(), matches.next()) {
        (Some(index), None) => Some(index),
        _ => None,
    }
}
