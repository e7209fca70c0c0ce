//! Declarative DDL for the tables the demo grids edit.

use log::debug;
use serde::{Deserialize, Serialize};

use tabula_core::GridResult;

use crate::SqliteSession;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: String,
    pub constraints: Vec<String>,
}

impl ColumnDefinition {
    pub fn new(name: &str, data_type: &str, constraints: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            constraints: constraints.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn ddl(&self) -> String {
        let constraints: String = self.constraints.iter().map(|c| format!(" {c}")).collect();
        format!("{} {}{constraints}", self.name, self.data_type)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    /// Table-level clauses such as foreign key constraints.
    pub clauses: Vec<String>,
}

impl TableDefinition {
    pub fn create_sql(&self) -> String {
        let lines: Vec<String> = self
            .columns
            .iter()
            .map(ColumnDefinition::ddl)
            .chain(self.clauses.iter().cloned())
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            lines.join(",\n    ")
        )
    }

    pub fn ensure(&self, session: &mut SqliteSession) -> GridResult<()> {
        debug!("tabula: ensuring table '{}'", self.name);
        session.execute(&self.create_sql(), &[])?;
        Ok(())
    }

    /// Delete every row. Returns how many were removed.
    pub fn truncate(&self, session: &mut SqliteSession) -> GridResult<usize> {
        session.execute(&format!("DELETE FROM {}", self.name), &[])
    }
}

pub fn model_table() -> TableDefinition {
    TableDefinition {
        name: "model".into(),
        columns: vec![
            ColumnDefinition::new("model_id", "INTEGER", &["PRIMARY KEY"]),
            ColumnDefinition::new("label", "TEXT", &[]),
            ColumnDefinition::new("type_id", "INTEGER", &["NOT NULL"]),
            ColumnDefinition::new("speed", "REAL", &["NOT NULL"]),
        ],
        clauses: Vec::new(),
    }
}

pub fn vehicle_table() -> TableDefinition {
    TableDefinition {
        name: "vehicle".into(),
        columns: vec![
            ColumnDefinition::new("vehicle_id", "INTEGER", &["PRIMARY KEY"]),
            ColumnDefinition::new("label", "TEXT", &[]),
            ColumnDefinition::new("model_id", "INTEGER", &["NOT NULL"]),
            ColumnDefinition::new("owner_id", "INTEGER", &[]),
        ],
        clauses: vec![
            "CONSTRAINT fk_vehicle_model FOREIGN KEY(model_id) REFERENCES model(model_id)".into(),
        ],
    }
}

pub fn hub_table() -> TableDefinition {
    TableDefinition {
        name: "hub".into(),
        columns: vec![
            ColumnDefinition::new("hub_id", "INTEGER", &["PRIMARY KEY"]),
            ColumnDefinition::new("label", "TEXT", &[]),
            ColumnDefinition::new("posX", "REAL", &["NOT NULL"]),
            ColumnDefinition::new("posY", "REAL", &["NOT NULL"]),
        ],
        clauses: Vec::new(),
    }
}

pub fn path_table() -> TableDefinition {
    TableDefinition {
        name: "path".into(),
        columns: vec![
            ColumnDefinition::new("path_id", "INTEGER", &["PRIMARY KEY"]),
            ColumnDefinition::new("start_hub_id", "INTEGER", &["NOT NULL"]),
            ColumnDefinition::new("end_hub_id", "INTEGER", &["NOT NULL"]),
        ],
        clauses: vec![
            "CONSTRAINT fk_path_start_hub FOREIGN KEY(start_hub_id) REFERENCES hub(hub_id)".into(),
            "CONSTRAINT fk_path_end_hub FOREIGN KEY(end_hub_id) REFERENCES hub(hub_id)".into(),
        ],
    }
}

pub fn movement_table() -> TableDefinition {
    TableDefinition {
        name: "movement".into(),
        columns: vec![
            ColumnDefinition::new("movement_id", "INTEGER", &["PRIMARY KEY"]),
            ColumnDefinition::new("ts", "INTEGER", &["NOT NULL"]),
            ColumnDefinition::new("vehicle_id", "INTEGER", &["NOT NULL"]),
            ColumnDefinition::new("path_id", "INTEGER", &["NOT NULL"]),
        ],
        clauses: vec![
            "CONSTRAINT fk_movement_vehicle FOREIGN KEY(vehicle_id) REFERENCES vehicle(vehicle_id)"
                .into(),
            "CONSTRAINT fk_movement_path FOREIGN KEY(path_id) REFERENCES path(path_id)".into(),
        ],
    }
}

/// Every catalog table, referenced tables first.
pub fn catalog() -> Vec<TableDefinition> {
    vec![
        model_table(),
        vehicle_table(),
        hub_table(),
        path_table(),
        movement_table(),
    ]
}

pub fn ensure_catalog(session: &mut SqliteSession) -> GridResult<()> {
    for table in catalog() {
        table.ensure(session)?;
    }
    Ok(())
}

/// Empty every catalog table, referencing tables first.
pub fn truncate_catalog(session: &mut SqliteSession) -> GridResult<()> {
    for table in catalog().iter().rev() {
        let removed = table.truncate(session)?;
        debug!("tabula: truncated {removed} rows from '{}'", table.name);
    }
    Ok(())
}
