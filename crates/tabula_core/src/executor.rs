//! Seam between the grid model and whatever actually runs SQL.

use crate::{CellValue, GridResult, Statement};

/// Synchronous SQL execution facility.
///
/// Implementations bind parameters positionally (`?`) and must never
/// interpolate values into statement text.
pub trait Executor {
    /// Run a read statement and return every result row as flat values.
    fn query(&mut self, sql: &str, params: &[CellValue]) -> GridResult<Vec<Vec<CellValue>>>;

    /// Run `statements` in one transaction. Either all of them commit or, on
    /// the first failure, none do and the failing statement is reported.
    fn execute_batch(&mut self, statements: &[Statement]) -> GridResult<()>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn query(&mut self, sql: &str, params: &[CellValue]) -> GridResult<Vec<Vec<CellValue>>> {
        (**self).query(sql, params)
    }

    fn execute_batch(&mut self, statements: &[Statement]) -> GridResult<()> {
        (**self).execute_batch(statements)
    }
}
