use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::format::{format_display, validate_template};
use crate::{CellValue, GridError, GridResult, ValueGroup};

pub const DELETE_COLUMN_HEADER: &str = "Delete";

/// Read-only column pulled in through a foreign-key join and shown beside it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryColumn {
    pub column_name: String,
    pub header: String,
}

impl AuxiliaryColumn {
    pub fn new(column_name: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            header: header.into(),
        }
    }
}

/// How a column holding an id into another table is resolved for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    /// Referenced table, optionally aliased (`hub AS start_hub`).
    pub reference_table: String,
    pub join_on: String,
    /// Id column of the referenced table, used when listing options.
    pub foreign_column: String,
    pub display_columns: Vec<String>,
    pub display_format: String,
    pub auxiliary_columns: Vec<AuxiliaryColumn>,
    /// Extra joins for multi-hop display columns, applied after the main join.
    pub additional_joins: Vec<String>,
}

impl ForeignKeySpec {
    pub fn new(
        reference_table: impl Into<String>,
        join_on: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        Self {
            reference_table: reference_table.into(),
            join_on: join_on.into(),
            foreign_column: foreign_column.into(),
            display_columns: Vec::new(),
            display_format: "{0}".to_string(),
            auxiliary_columns: Vec::new(),
            additional_joins: Vec::new(),
        }
    }

    pub fn display(mut self, column: impl Into<String>) -> Self {
        self.display_columns.push(column.into());
        self
    }

    pub fn format(mut self, template: impl Into<String>) -> Self {
        self.display_format = template.into();
        self
    }

    pub fn auxiliary(mut self, column: impl Into<String>, header: impl Into<String>) -> Self {
        self.auxiliary_columns
            .push(AuxiliaryColumn::new(column, header));
        self
    }

    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.additional_joins.push(clause.into());
        self
    }

    /// Number of values materialized per row: id, display values, auxiliaries.
    pub fn arity(&self) -> usize {
        1 + self.display_columns.len() + self.auxiliary_columns.len()
    }

    pub fn join_clause(&self) -> String {
        format!("LEFT JOIN {} ON {}", self.reference_table, self.join_on)
    }

    /// Display values of a materialized group, in template order.
    pub fn display_values<'a>(&self, group: &'a ValueGroup) -> &'a [CellValue] {
        let end = (1 + self.display_columns.len()).min(group.len());
        &group.values()[1.min(end)..end]
    }

    pub fn auxiliary_value<'a>(
        &self,
        group: &'a ValueGroup,
        aux_index: usize,
    ) -> Option<&'a CellValue> {
        group.get(1 + self.display_columns.len() + aux_index)
    }

    pub fn format_group(&self, group: &ValueGroup) -> GridResult<String> {
        format_display(&self.display_format, self.display_values(group))
    }

    fn validate(&self, column_name: &str) -> GridResult<()> {
        if self.foreign_column.trim().is_empty() {
            return Err(GridError::schema(format!(
                "foreign key on '{column_name}' has no foreign id column"
            )));
        }
        if self.reference_table.trim().is_empty() || self.join_on.trim().is_empty() {
            return Err(GridError::schema(format!(
                "foreign key on '{column_name}' needs a reference table and join predicate"
            )));
        }
        validate_template(&self.display_format, self.display_columns.len()).map_err(|err| {
            GridError::schema(format!("display format on '{column_name}': {err}"))
        })
    }
}

/// One declared grid column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaColumn {
    /// Qualified source identifier, e.g. `vehicle.label`.
    pub column_name: String,
    pub header: String,
    pub default_value: CellValue,
    pub foreign_key: Option<Arc<ForeignKeySpec>>,
    pub delete_action: bool,
}

impl SchemaColumn {
    pub fn new(
        column_name: impl Into<String>,
        header: impl Into<String>,
        default_value: impl Into<CellValue>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            header: header.into(),
            default_value: default_value.into(),
            foreign_key: None,
            delete_action: false,
        }
    }

    pub fn with_foreign_key(mut self, spec: ForeignKeySpec) -> Self {
        self.foreign_key = Some(Arc::new(spec));
        self
    }

    fn delete_marker() -> Self {
        Self {
            column_name: DELETE_COLUMN_HEADER.to_string(),
            header: DELETE_COLUMN_HEADER.to_string(),
            default_value: CellValue::Bool(false),
            foreign_key: None,
            delete_action: true,
        }
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }

    pub fn arity(&self) -> usize {
        self.foreign_key.as_ref().map_or(1, |spec| spec.arity())
    }

    /// Unqualified field name used in generated statements.
    pub fn field_name(&self) -> &str {
        strip_table_name(&self.column_name)
    }

    /// Group written into a freshly appended row.
    pub fn default_group(&self) -> ValueGroup {
        let mut values = vec![self.default_value.clone()];
        if let Some(spec) = &self.foreign_key {
            values.extend(spec.display_columns.iter().map(|_| CellValue::from("")));
            values.extend(spec.auxiliary_columns.iter().map(|_| CellValue::Null));
        }
        ValueGroup::new(values)
    }
}

pub fn strip_table_name(raw: &str) -> &str {
    raw.rsplit('.').next().unwrap_or(raw)
}

/// Ordered column declaration for one table. The primary key comes first and
/// a delete-action column is always appended last.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    table: String,
    columns: Vec<SchemaColumn>,
}

impl Schema {
    pub fn new(table: impl Into<String>, columns: Vec<SchemaColumn>) -> GridResult<Self> {
        let table = table.into();
        let Some(primary) = columns.first() else {
            return Err(GridError::schema(format!("table '{table}' declares no columns")));
        };
        if primary.is_foreign_key() {
            return Err(GridError::schema(format!(
                "primary key column '{}' of '{table}' cannot be a foreign key",
                primary.column_name
            )));
        }
        for column in &columns {
            if column.delete_action {
                return Err(GridError::schema(format!(
                    "'{}' is declared as a delete column; it is added automatically",
                    column.column_name
                )));
            }
            if let Some(spec) = &column.foreign_key {
                spec.validate(&column.column_name)?;
            }
        }
        let mut columns = columns;
        columns.push(SchemaColumn::delete_marker());
        Ok(Self { table, columns })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// All columns, including the trailing delete-action column.
    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&SchemaColumn> {
        self.columns.get(index)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn primary_key(&self) -> &SchemaColumn {
        &self.columns[0]
    }

    pub fn delete_index(&self) -> usize {
        self.columns.len() - 1
    }

    /// Columns written by INSERT: everything but the key and the delete column.
    pub fn persisted_columns(&self) -> impl Iterator<Item = (usize, &SchemaColumn)> {
        self.columns
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, column)| !column.delete_action)
    }

    pub fn default_groups(&self) -> Vec<ValueGroup> {
        self.columns
            .iter()
            .map(SchemaColumn::default_group)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{ForeignKeySpec, Schema, SchemaColumn, strip_table_name};
    use crate::{CellValue, GridError, ValueGroup};

    fn model_fk() -> ForeignKeySpec {
        ForeignKeySpec::new("model", "vehicle.model_id = model.model_id", "model.model_id")
            .display("model.label")
            .auxiliary("model.speed", "speed")
    }

    #[test]
    fn appends_delete_column() {
        let schema = Schema::new(
            "vehicle",
            vec![
                SchemaColumn::new("vehicle.vehicle_id", "id", CellValue::Null),
                SchemaColumn::new("vehicle.label", "label", "--"),
            ],
        )
        .expect("schema");
        assert_eq!(schema.len(), 3);
        assert!(schema.columns()[2].delete_action);
        assert_eq!(schema.delete_index(), 2);
        let persisted: Vec<_> = schema.persisted_columns().map(|(i, _)| i).collect();
        assert_eq!(persisted, vec![1]);
    }

    #[test]
    fn foreign_key_arity_and_defaults() {
        let column = SchemaColumn::new("model.model_id", "model", 0).with_foreign_key(model_fk());
        assert_eq!(column.arity(), 3);
        assert_eq!(column.field_name(), "model_id");
        assert_eq!(
            column.default_group(),
            ValueGroup::new(vec![CellValue::Integer(0), "".into(), CellValue::Null])
        );
    }

    #[test]
    fn formats_display_from_group() {
        let spec = model_fk();
        let group = ValueGroup::new(vec![3.into(), "Sedan".into(), 120.0.into()]);
        assert_eq!(spec.format_group(&group).expect("format"), "Sedan");
        assert_eq!(spec.auxiliary_value(&group, 0), Some(&CellValue::Real(120.0)));
        assert_eq!(
            spec.join_clause(),
            "LEFT JOIN model ON vehicle.model_id = model.model_id"
        );
    }

    #[test]
    fn rejects_invalid_declarations() {
        let err = Schema::new("empty", vec![]).unwrap_err();
        assert!(matches!(err, GridError::Schema { .. }));

        let err = Schema::new(
            "vehicle",
            vec![SchemaColumn::new("model.model_id", "model", 0).with_foreign_key(model_fk())],
        )
        .unwrap_err();
        assert!(matches!(err, GridError::Schema { .. }));

        let bad_format = model_fk().format("{0} {1}");
        let err = Schema::new(
            "vehicle",
            vec![
                SchemaColumn::new("vehicle.vehicle_id", "id", CellValue::Null),
                SchemaColumn::new("model.model_id", "model", 0).with_foreign_key(bad_format),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, GridError::Schema { .. }));
    }

    #[test]
    fn strips_table_prefix() {
        assert_eq!(strip_table_name("vehicle.label"), "label");
        assert_eq!(strip_table_name("label"), "label");
        assert_eq!(strip_table_name("main.vehicle.label"), "label");
    }
}
