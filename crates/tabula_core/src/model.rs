//! Grid-facing facade over the schema, planner, materializer and change tracker.
//!
//! The presentation layer addresses cells by *displayed* column: schema
//! columns with each foreign key's auxiliary columns inserted right after it,
//! and the delete action last. Structural changes (append, reset, save) bump
//! [`TabularModel::structural_version`] and notify registered observers once.

use std::sync::Arc;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::changes::{CellState, ChangeTracker, RowState, Statement};
use crate::{
    CellValue, Executor, ForeignKeySpec, GridError, GridResult, QueryPlan, Row, Schema,
    ValueGroup, materialize, plan,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ColumnKind {
    Key,
    Value,
    ForeignKey,
    Auxiliary,
    DeleteAction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayedColumn {
    pub schema_index: usize,
    pub aux_index: Option<usize>,
    pub header: String,
    pub kind: ColumnKind,
    pub editable: bool,
}

fn build_layout(schema: &Schema) -> Vec<DisplayedColumn> {
    let mut layout = Vec::new();
    for (index, column) in schema.columns().iter().enumerate() {
        let kind = if column.delete_action {
            ColumnKind::DeleteAction
        } else if index == 0 {
            ColumnKind::Key
        } else if column.is_foreign_key() {
            ColumnKind::ForeignKey
        } else {
            ColumnKind::Value
        };
        layout.push(DisplayedColumn {
            schema_index: index,
            aux_index: None,
            header: column.header.clone(),
            kind,
            editable: matches!(kind, ColumnKind::Value | ColumnKind::ForeignKey),
        });
        if let Some(spec) = &column.foreign_key {
            for (aux_index, aux) in spec.auxiliary_columns.iter().enumerate() {
                layout.push(DisplayedColumn {
                    schema_index: index,
                    aux_index: Some(aux_index),
                    header: aux.header.clone(),
                    kind: ColumnKind::Auxiliary,
                    editable: false,
                });
            }
        }
    }
    layout
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Role {
    Display,
    Edit,
}

/// Edit-mode value of a foreign-key cell: enough to list and pick options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyHandle {
    pub id: CellValue,
    pub spec: Arc<ForeignKeySpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellData {
    Value(CellValue),
    ForeignKey(ForeignKeyHandle),
    DeleteAction { marked: bool },
}

impl CellData {
    pub fn as_value(&self) -> Option<&CellValue> {
        match self {
            CellData::Value(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellInput {
    /// Replaces the primary slot only.
    Scalar(CellValue),
    /// Replaces the whole group, e.g. a chosen foreign-key option.
    Group(ValueGroup),
    ToggleDelete,
}

impl From<CellValue> for CellInput {
    fn from(value: CellValue) -> Self {
        CellInput::Scalar(value)
    }
}

impl From<ValueGroup> for CellInput {
    fn from(group: ValueGroup) -> Self {
        CellInput::Group(group)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum VisualState {
    Normal,
    Uneditable,
    Updated,
    UpdatedUneditable,
    Created,
    CreatedUneditable,
    Deleted,
    DeletedUneditable,
}

impl VisualState {
    /// Deleted beats created, created beats updated, updated beats read-only.
    pub fn classify(row: RowState, cell: CellState, uneditable: bool) -> Self {
        match (
            row.is_deleted(),
            row.is_created(),
            cell.is_updated(),
            uneditable,
        ) {
            (true, _, _, false) => VisualState::Deleted,
            (true, _, _, true) => VisualState::DeletedUneditable,
            (false, true, _, false) => VisualState::Created,
            (false, true, _, true) => VisualState::CreatedUneditable,
            (false, false, true, false) => VisualState::Updated,
            (false, false, true, true) => VisualState::UpdatedUneditable,
            (false, false, false, false) => VisualState::Normal,
            (false, false, false, true) => VisualState::Uneditable,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum StructuralChange {
    Reset,
    RowInserted(usize),
}

/// Notification sink for failed saves.
pub trait ErrorReporter {
    fn on_error(&mut self, error: &GridError);
    fn clear_error(&mut self);
}

/// Default reporter: logs at error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn on_error(&mut self, error: &GridError) {
        error!("tabula: {error}");
    }

    fn clear_error(&mut self) {}
}

pub trait StructureObserver {
    fn structure_changed(&mut self, change: StructuralChange, version: u64);
}

pub struct TabularModel {
    schema: Schema,
    plan: QueryPlan,
    layout: Vec<DisplayedColumn>,
    rows: Vec<Row>,
    tracker: ChangeTracker,
    reporter: Box<dyn ErrorReporter>,
    observers: Vec<Box<dyn StructureObserver>>,
    version: u64,
    /// Set once a batch commits and cleared by the next successful reload.
    needs_reset: bool,
}

impl TabularModel {
    /// Plan and run the initial load. Fails if the query or its shape is bad.
    pub fn load<E: Executor + ?Sized>(schema: Schema, executor: &mut E) -> GridResult<Self> {
        let plan = plan(&schema);
        let layout = build_layout(&schema);
        let rows = materialize::load(executor, &schema, &plan)?;
        let tracker = ChangeTracker::from_loaded(&rows);
        info!(
            "tabula: loaded {} rows from '{}'",
            rows.len(),
            schema.table()
        );
        Ok(Self {
            schema,
            plan,
            layout,
            rows,
            tracker,
            reporter: Box::new(LogReporter),
            observers: Vec::new(),
            version: 0,
            needs_reset: false,
        })
    }

    pub fn with_reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn observe(&mut self, observer: impl StructureObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    pub fn column_layout(&self) -> &[DisplayedColumn] {
        &self.layout
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.layout.len()
    }

    pub fn header(&self, column: usize) -> Option<&str> {
        self.layout.get(column).map(|col| col.header.as_str())
    }

    pub fn structural_version(&self) -> u64 {
        self.version
    }

    pub fn has_changes(&self) -> bool {
        self.tracker.has_changes()
    }

    pub fn row_state(&self, row: usize) -> Option<RowState> {
        self.tracker.row_state(row)
    }

    fn locate(&self, row: usize, column: usize) -> GridResult<&DisplayedColumn> {
        if row >= self.rows.len() {
            return Err(GridError::contract(format!(
                "row {row} out of range ({} rows)",
                self.rows.len()
            )));
        }
        self.layout.get(column).ok_or_else(|| {
            GridError::contract(format!(
                "column {column} out of range ({} columns)",
                self.layout.len()
            ))
        })
    }

    fn group(&self, row: usize, schema_index: usize) -> GridResult<&ValueGroup> {
        self.rows[row].group(schema_index).ok_or_else(|| {
            GridError::contract(format!("row {row} has no group {schema_index}"))
        })
    }

    pub fn get(&self, row: usize, column: usize, role: Role) -> GridResult<CellData> {
        let displayed = self.locate(row, column)?;
        let schema_column = &self.schema.columns()[displayed.schema_index];
        match displayed.kind {
            ColumnKind::DeleteAction => Ok(match role {
                Role::Display => CellData::Value(CellValue::from(schema_column.header.as_str())),
                Role::Edit => CellData::DeleteAction {
                    marked: self.tracker.row_state(row).is_some_and(|s| s.is_deleted()),
                },
            }),
            ColumnKind::Key | ColumnKind::Value => Ok(CellData::Value(
                self.group(row, displayed.schema_index)?.primary().clone(),
            )),
            ColumnKind::ForeignKey | ColumnKind::Auxiliary => {
                let spec = schema_column.foreign_key.as_ref().ok_or_else(|| {
                    GridError::contract(format!("column {column} has no foreign key"))
                })?;
                let group = self.group(row, displayed.schema_index)?;
                if let Some(aux_index) = displayed.aux_index {
                    let value = spec.auxiliary_value(group, aux_index).ok_or_else(|| {
                        GridError::contract(format!(
                            "row {row} has no auxiliary value {aux_index} for column {column}"
                        ))
                    })?;
                    return Ok(CellData::Value(value.clone()));
                }
                Ok(match role {
                    Role::Display => CellData::Value(CellValue::Text(spec.format_group(group)?)),
                    Role::Edit => CellData::ForeignKey(ForeignKeyHandle {
                        id: group.primary().clone(),
                        spec: Arc::clone(spec),
                    }),
                })
            }
        }
    }

    pub fn set(&mut self, row: usize, column: usize, input: impl Into<CellInput>) -> GridResult<()> {
        let input = input.into();
        let displayed = self.locate(row, column)?.clone();
        match displayed.kind {
            ColumnKind::DeleteAction => {
                let marked = self.tracker.toggle_delete(row)?;
                debug!("tabula: row {row} delete marker now {marked}");
            }
            ColumnKind::Key | ColumnKind::Auxiliary => {
                return Err(GridError::contract(format!(
                    "column {column} ('{}') is read-only",
                    displayed.header
                )));
            }
            ColumnKind::Value | ColumnKind::ForeignKey => {
                let arity = self.schema.columns()[displayed.schema_index].arity();
                let mut group = self.group(row, displayed.schema_index)?.clone();
                match input {
                    CellInput::Scalar(value) => group.set_primary(value),
                    CellInput::Group(next) => {
                        if next.len() != arity {
                            return Err(GridError::contract(format!(
                                "column {column} ('{}') takes {arity} values, got {}",
                                displayed.header,
                                next.len()
                            )));
                        }
                        group = next;
                    }
                    CellInput::ToggleDelete => {
                        return Err(GridError::contract(format!(
                            "column {column} ('{}') is not the delete column",
                            displayed.header
                        )));
                    }
                }
                let changed = self
                    .tracker
                    .record_write(row, displayed.schema_index, &group)?;
                debug!("tabula: wrote row {row} column {column} changed={changed}");
                if let Some(slot) = self.rows[row].group_mut(displayed.schema_index) {
                    *slot = group;
                }
            }
        }
        self.reporter.clear_error();
        Ok(())
    }

    pub fn visual_state(&self, row: usize, column: usize) -> GridResult<VisualState> {
        let displayed = self.locate(row, column)?;
        let row_state = self.tracker.row_state(row).unwrap_or_default();
        let cell_state = self
            .tracker
            .cell_state(row, displayed.schema_index)
            .unwrap_or_default();
        Ok(VisualState::classify(row_state, cell_state, !displayed.editable))
    }

    /// Append a row built from the schema defaults; returns its index.
    pub fn append(&mut self) -> usize {
        let index = self.rows.len();
        self.rows.push(Row::new(self.schema.default_groups()));
        self.tracker.record_append(self.schema.len());
        debug!("tabula: appended row {index} to '{}'", self.schema.table());
        self.notify(StructuralChange::RowInserted(index));
        self.reporter.clear_error();
        index
    }

    /// Discard every edit and reload. On failure the current state is kept.
    pub fn reset<E: Executor + ?Sized>(&mut self, executor: &mut E) -> GridResult<()> {
        self.reload(executor)?;
        self.reporter.clear_error();
        Ok(())
    }

    /// True when storage already holds a committed batch that the in-memory
    /// rows do not reflect. Only [`reset`](Self::reset) clears it.
    pub fn needs_reset(&self) -> bool {
        self.needs_reset
    }

    /// Statements the next [`save`](Self::save) would execute.
    pub fn pending_statements(&self) -> GridResult<Vec<Statement>> {
        if self.needs_reset {
            return Err(GridError::contract(format!(
                "'{}' was saved but not reloaded; reset before saving again",
                self.schema.table()
            )));
        }
        self.tracker.compile(&self.schema, &self.rows)
    }

    /// Apply pending edits in one transaction and reload. Returns the number
    /// of statements applied. On failure nothing in memory changes; if the
    /// batch committed but the reload failed, saving is blocked until reset.
    pub fn save<E: Executor + ?Sized>(&mut self, executor: &mut E) -> GridResult<usize> {
        match self.try_save(executor) {
            Ok(applied) => {
                self.reporter.clear_error();
                Ok(applied)
            }
            Err(err) => {
                self.reporter.on_error(&err);
                Err(err)
            }
        }
    }

    fn try_save<E: Executor + ?Sized>(&mut self, executor: &mut E) -> GridResult<usize> {
        let statements = self.pending_statements()?;
        executor.execute_batch(&statements)?;
        self.needs_reset = true;
        info!(
            "tabula: saved {} statements to '{}'",
            statements.len(),
            self.schema.table()
        );
        self.reload(executor)?;
        Ok(statements.len())
    }

    fn reload<E: Executor + ?Sized>(&mut self, executor: &mut E) -> GridResult<()> {
        let rows = materialize::load(executor, &self.schema, &self.plan)?;
        self.tracker = ChangeTracker::from_loaded(&rows);
        self.rows = rows;
        self.needs_reset = false;
        info!(
            "tabula: reloaded {} rows from '{}'",
            self.rows.len(),
            self.schema.table()
        );
        self.notify(StructuralChange::Reset);
        Ok(())
    }

    fn notify(&mut self, change: StructuralChange) {
        self.version += 1;
        for observer in &mut self.observers {
            observer.structure_changed(change, self.version);
        }
    }
}
