use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueType {
    Null = 0,
    Integer = 1,
    Real = 2,
    Text = 3,
    Bool = 4,
    Blob = 5,
}

/// A single scalar as stored in, or bound to, a database column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Blob(Vec<u8>),
}

impl CellValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            CellValue::Null => ValueType::Null,
            CellValue::Integer(_) => ValueType::Integer,
            CellValue::Real(_) => ValueType::Real,
            CellValue::Text(_) => ValueType::Text,
            CellValue::Bool(_) => ValueType::Bool,
            CellValue::Blob(_) => ValueType::Blob,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(value) => Some(*value),
            CellValue::Bool(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Text used when the value is shown in a grid cell or a display template.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(value) => write!(f, "{value}"),
            // Debug keeps the trailing ".0" on whole reals.
            CellValue::Real(value) => write!(f, "{value:?}"),
            CellValue::Text(value) => f.write_str(value),
            CellValue::Bool(value) => write!(f, "{value}"),
            CellValue::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Integer(i64::from(value))
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Real(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

static NULL: CellValue = CellValue::Null;

/// Values materialized for one schema column on one row:
/// `[primary, display_1..n, auxiliary_1..m]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueGroup(Vec<CellValue>);

impl ValueGroup {
    pub fn new(values: Vec<CellValue>) -> Self {
        Self(values)
    }

    pub fn single(value: impl Into<CellValue>) -> Self {
        Self(vec![value.into()])
    }

    /// The id or plain value; the only slot ever written to storage. An
    /// empty group reads as Null.
    pub fn primary(&self) -> &CellValue {
        self.0.first().unwrap_or(&NULL)
    }

    pub fn set_primary(&mut self, value: CellValue) {
        match self.0.first_mut() {
            Some(slot) => *slot = value,
            None => self.0.push(value),
        }
    }

    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.0.get(index)
    }

    pub fn values(&self) -> &[CellValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<CellValue> {
        self.0
    }
}

impl From<Vec<CellValue>> for ValueGroup {
    fn from(values: Vec<CellValue>) -> Self {
        Self(values)
    }
}

/// One grid row: a value group per schema column, the delete marker last.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    groups: Vec<ValueGroup>,
}

impl Row {
    pub fn new(groups: Vec<ValueGroup>) -> Self {
        Self { groups }
    }

    /// Primary value of the first (primary-key) column, Null for a row
    /// without groups.
    pub fn key(&self) -> &CellValue {
        self.groups.first().map_or(&NULL, ValueGroup::primary)
    }

    pub fn group(&self, index: usize) -> Option<&ValueGroup> {
        self.groups.get(index)
    }

    pub(crate) fn group_mut(&mut self, index: usize) -> Option<&mut ValueGroup> {
        self.groups.get_mut(index)
    }

    pub fn groups(&self) -> &[ValueGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{CellValue, Row, ValueGroup, ValueType};

    #[test]
    fn renders_values_for_display() {
        assert_eq!(CellValue::Null.render(), "");
        assert_eq!(CellValue::Integer(42).render(), "42");
        assert_eq!(CellValue::Real(120.0).render(), "120.0");
        assert_eq!(CellValue::Real(0.5).render(), "0.5");
        assert_eq!(CellValue::from("Sedan").render(), "Sedan");
        assert_eq!(CellValue::Bool(true).render(), "true");
        assert_eq!(CellValue::Blob(vec![1, 2, 3]).render(), "<3 bytes>");
    }

    #[test]
    fn conversions_pick_matching_variant() {
        assert_eq!(CellValue::from(3i64).value_type(), ValueType::Integer);
        assert_eq!(CellValue::from(3).value_type(), ValueType::Integer);
        assert_eq!(CellValue::from(2.5).value_type(), ValueType::Real);
        assert_eq!(CellValue::from(None::<i64>), CellValue::Null);
        assert_eq!(CellValue::from(Some("x")), CellValue::Text("x".into()));
        assert_eq!(CellValue::Bool(true).as_i64(), Some(1));
        assert_eq!(CellValue::from("x").as_i64(), None);
    }

    #[test]
    fn group_primary_is_first_slot() {
        let mut group = ValueGroup::new(vec![3.into(), "Sedan".into(), 120.0.into()]);
        assert_eq!(group.primary(), &CellValue::Integer(3));
        group.set_primary(CellValue::Integer(4));
        assert_eq!(group.values()[0], CellValue::Integer(4));
        assert_eq!(group.get(1), Some(&CellValue::from("Sedan")));
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn row_key_reads_first_group() {
        let row = Row::new(vec![ValueGroup::single(7), ValueGroup::single("truck")]);
        assert_eq!(row.key(), &CellValue::Integer(7));
        assert_eq!(row.len(), 2);
        assert!(row.group(2).is_none());
    }

    #[test]
    fn empty_groups_and_rows_read_as_null() {
        let mut group = ValueGroup::new(Vec::new());
        assert_eq!(group.primary(), &CellValue::Null);
        group.set_primary(CellValue::Integer(5));
        assert_eq!(group.values(), &[CellValue::Integer(5)]);

        let row = Row::new(Vec::new());
        assert_eq!(row.key(), &CellValue::Null);
        let row = Row::new(vec![ValueGroup::new(Vec::new())]);
        assert_eq!(row.key(), &CellValue::Null);
    }
}
