//! Per-row and per-cell change state, and compilation of that state into the
//! statements that make storage match the edited grid.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{CellValue, GridError, GridResult, Row, Schema, ValueGroup};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RowState {
    updated: bool,
    created: bool,
    deleted: bool,
}

impl RowState {
    pub fn created() -> Self {
        Self {
            created: true,
            ..Self::default()
        }
    }

    pub fn mark_updated(&mut self) {
        self.updated = true;
    }

    pub fn mark_created(&mut self) {
        self.created = true;
    }

    /// Delete is a checkbox: a second toggle restores the row.
    pub fn toggle_deleted(&mut self) {
        self.deleted = !self.deleted;
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Created and deleted in the same session: never reaches storage.
    pub fn is_discarded(&self) -> bool {
        self.created && self.deleted
    }

    pub fn is_clean(&self) -> bool {
        !(self.updated || self.created || self.deleted)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    updated: bool,
    created: bool,
}

impl CellState {
    pub fn mark_updated(&mut self) {
        self.updated = true;
    }

    pub fn mark_created(&mut self) {
        self.created = true;
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
}

/// One parameterized write produced by [`ChangeTracker::compile`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: String,
    pub params: Vec<CellValue>,
}

#[derive(Clone, Debug)]
struct RowChange {
    state: RowState,
    cells: Vec<CellState>,
    /// Groups as last loaded from storage; `None` for appended rows.
    baseline: Option<Vec<ValueGroup>>,
}

#[derive(Clone, Debug, Default)]
pub struct ChangeTracker {
    rows: Vec<RowChange>,
}

impl ChangeTracker {
    /// Fresh tracker over freshly loaded rows; every state is NONE.
    pub fn from_loaded(rows: &[Row]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| RowChange {
                    state: RowState::default(),
                    cells: vec![CellState::default(); row.len()],
                    baseline: Some(row.groups().to_vec()),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_state(&self, row: usize) -> Option<RowState> {
        self.rows.get(row).map(|change| change.state)
    }

    pub fn cell_state(&self, row: usize, column: usize) -> Option<CellState> {
        self.rows
            .get(row)
            .and_then(|change| change.cells.get(column).copied())
    }

    pub fn has_changes(&self) -> bool {
        self.rows.iter().any(|change| !change.state.is_clean())
    }

    pub fn record_append(&mut self, columns: usize) {
        let mut cell = CellState::default();
        cell.mark_created();
        self.rows.push(RowChange {
            state: RowState::created(),
            cells: vec![cell; columns],
            baseline: None,
        });
    }

    /// Note a write of `group` into (`row`, `column`). Returns whether the cell
    /// now differs from its load-time value.
    pub fn record_write(
        &mut self,
        row: usize,
        column: usize,
        group: &ValueGroup,
    ) -> GridResult<bool> {
        let change = self.rows.get_mut(row).ok_or_else(|| {
            GridError::contract(format!("change state has no row {row}"))
        })?;
        let differs = match &change.baseline {
            Some(groups) => groups.get(column) != Some(group),
            None => true,
        };
        if differs {
            let cell = change.cells.get_mut(column).ok_or_else(|| {
                GridError::contract(format!("change state row {row} has no column {column}"))
            })?;
            cell.mark_updated();
            change.state.mark_updated();
        }
        Ok(differs)
    }

    pub fn toggle_delete(&mut self, row: usize) -> GridResult<bool> {
        let change = self.rows.get_mut(row).ok_or_else(|| {
            GridError::contract(format!("change state has no row {row}"))
        })?;
        change.state.toggle_deleted();
        Ok(change.state.is_deleted())
    }

    /// Build the ordered statement batch for `rows`, one statement per dirty
    /// row at most.
    pub fn compile(&self, schema: &Schema, rows: &[Row]) -> GridResult<Vec<Statement>> {
        if rows.len() != self.rows.len() {
            return Err(GridError::contract(format!(
                "tracking {} rows but grid holds {}",
                self.rows.len(),
                rows.len()
            )));
        }
        let mut statements = Vec::new();
        for (row, change) in rows.iter().zip(&self.rows) {
            let state = change.state;
            let statement = if state.is_discarded() {
                None
            } else if state.is_deleted() {
                Some(delete_statement(schema, row))
            } else if state.is_created() {
                Some(insert_statement(schema, row))
            } else if state.is_updated() {
                update_statement(schema, row, &change.cells)
            } else {
                None
            };
            statements.extend(statement);
        }
        debug!(
            "tabula: compiled {} statements for '{}'",
            statements.len(),
            schema.table()
        );
        Ok(statements)
    }
}

fn delete_statement(schema: &Schema, row: &Row) -> Statement {
    Statement {
        kind: StatementKind::Delete,
        sql: format!(
            "DELETE FROM {} WHERE {} = ?",
            schema.table(),
            schema.primary_key().field_name()
        ),
        params: vec![row.key().clone()],
    }
}

fn insert_statement(schema: &Schema, row: &Row) -> Statement {
    let mut names = Vec::new();
    let mut params = Vec::new();
    for (index, column) in schema.persisted_columns() {
        names.push(column.field_name());
        params.push(primary_at(row, index));
    }
    let placeholders = vec!["?"; names.len()].join(", ");
    Statement {
        kind: StatementKind::Insert,
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            schema.table(),
            names.join(", ")
        ),
        params,
    }
}

/// Only individually flagged cells are written; a row flagged UPDATED whose
/// only flagged cell is not persisted yields nothing.
fn update_statement(schema: &Schema, row: &Row, cells: &[CellState]) -> Option<Statement> {
    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for (index, column) in schema.persisted_columns() {
        if cells.get(index).is_some_and(CellState::is_updated) {
            assignments.push(format!("{} = ?", column.field_name()));
            params.push(primary_at(row, index));
        }
    }
    if assignments.is_empty() {
        return None;
    }
    params.push(row.key().clone());
    Some(Statement {
        kind: StatementKind::Update,
        sql: format!(
            "UPDATE {} SET {} WHERE {} = ?",
            schema.table(),
            assignments.join(", "),
            schema.primary_key().field_name()
        ),
        params,
    })
}

fn primary_at(row: &Row, index: usize) -> CellValue {
    row.group(index)
        .map(|group| group.primary().clone())
        .unwrap_or(CellValue::Null)
}
