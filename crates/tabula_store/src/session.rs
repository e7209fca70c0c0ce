//! Explicitly owned SQLite session backing the grid executor.

use std::path::Path;
use std::time::Duration;

use log::debug;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, params_from_iter};

use tabula_core::{CellValue, Executor, GridError, GridResult, Statement};

use crate::TabulaConfig;

pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    /// Load (or create) `tabula.json` in `base_dir` and open the database it
    /// names.
    pub fn open_datastore(base_dir: &Path) -> GridResult<Self> {
        let config = TabulaConfig::load_or_init(base_dir)?;
        Self::open(&config, base_dir)
    }

    pub fn open(config: &TabulaConfig, base_dir: &Path) -> GridResult<Self> {
        let path = config.sqlite_path(base_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| GridError::storage(format!("create database dir: {err}")))?;
        }
        let conn = Connection::open(&path)
            .map_err(|err| GridError::storage(format!("sqlite open error: {err}")))?;
        debug!("tabula: opened sqlite session at {}", path.display());
        Self::configure(conn, config)
    }

    pub fn open_in_memory(config: &TabulaConfig) -> GridResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| GridError::storage(format!("sqlite open error: {err}")))?;
        Self::configure(conn, config)
    }

    fn configure(conn: Connection, config: &TabulaConfig) -> GridResult<Self> {
        conn.pragma_update(None, "foreign_keys", config.foreign_keys())
            .map_err(|err| GridError::storage(format!("sqlite pragma error: {err}")))?;
        if let Some(timeout_ms) = config.busy_timeout_ms() {
            conn.busy_timeout(Duration::from_millis(timeout_ms))
                .map_err(|err| GridError::storage(format!("sqlite busy timeout error: {err}")))?;
        }
        Ok(Self { conn })
    }

    pub fn close(self) -> GridResult<()> {
        self.conn
            .close()
            .map_err(|(_, err)| GridError::storage(format!("sqlite close error: {err}")))
    }

    /// Run one statement outside any batch. Returns the affected row count.
    pub fn execute(&mut self, sql: &str, params: &[CellValue]) -> GridResult<usize> {
        debug!("tabula: executing {sql} {params:?}");
        self.conn
            .execute(sql, params_from_iter(params.iter().map(to_sql)))
            .map_err(|err| GridError::execution(sql, params, err.to_string()))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Executor for SqliteSession {
    fn query(&mut self, sql: &str, params: &[CellValue]) -> GridResult<Vec<Vec<CellValue>>> {
        debug!("tabula: querying {sql} {params:?}");
        let fail = |err: rusqlite::Error| GridError::execution(sql, params, err.to_string());
        let mut stmt = self.conn.prepare(sql).map_err(fail)?;
        let width = stmt.column_count();
        let mut rows = stmt
            .query(params_from_iter(params.iter().map(to_sql)))
            .map_err(fail)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(fail)? {
            let values = (0..width)
                .map(|index| row.get_ref(index).map(from_sql))
                .collect::<Result<Vec<_>, _>>()
                .map_err(fail)?;
            out.push(values);
        }
        Ok(out)
    }

    fn execute_batch(&mut self, statements: &[Statement]) -> GridResult<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|err| GridError::storage(format!("sqlite transaction error: {err}")))?;
        for statement in statements {
            debug!("tabula: executing {} {:?}", statement.sql, statement.params);
            tx.execute(
                &statement.sql,
                params_from_iter(statement.params.iter().map(to_sql)),
            )
            .map_err(|err| GridError::execution(&statement.sql, &statement.params, err.to_string()))?;
        }
        // Dropping an uncommitted transaction rolls it back. Deferred
        // constraints are checked here, so a failed COMMIT is an execution error.
        tx.commit()
            .map_err(|err| GridError::execution("COMMIT", &[], err.to_string()))?;
        Ok(())
    }
}

/// `Bool` has no SQLite storage class of its own and is written as INTEGER
/// 0/1, so it reads back as `Integer`.
fn to_sql(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Integer(v) => Value::Integer(*v),
        CellValue::Real(v) => Value::Real(*v),
        CellValue::Text(v) => Value::Text(v.clone()),
        CellValue::Bool(v) => Value::Integer(i64::from(*v)),
        CellValue::Blob(v) => Value::Blob(v.clone()),
    }
}

/// TEXT that is not valid UTF-8 comes back as `Blob` with the raw bytes.
fn from_sql(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(v) => CellValue::Integer(v),
        ValueRef::Real(v) => CellValue::Real(v),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => CellValue::Text(text.to_owned()),
            Err(_) => CellValue::Blob(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => CellValue::Blob(bytes.to_vec()),
    }
}
