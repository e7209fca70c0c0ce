use thiserror::Error;

use crate::CellValue;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("error executing query: {statement} {params:?}\ncaused by: {message}")]
    Execution {
        statement: String,
        params: Vec<CellValue>,
        message: String,
    },
    #[error("contract violation: {message}")]
    Contract { message: String },
    #[error("schema error: {message}")]
    Schema { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("config error: {message}")]
    Config { message: String },
}

impl GridError {
    pub fn execution(
        statement: impl Into<String>,
        params: &[CellValue],
        message: impl Into<String>,
    ) -> Self {
        Self::Execution {
            statement: statement.into(),
            params: params.to_vec(),
            message: message.into(),
        }
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::Contract {
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Statement text for execution failures, if any.
    pub fn statement(&self) -> Option<&str> {
        match self {
            Self::Execution { statement, .. } => Some(statement.as_str()),
            _ => None,
        }
    }
}

pub type GridResult<T> = Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::GridError;
    use crate::CellValue;

    #[test]
    fn helper_constructors_set_variants() {
        let err = GridError::execution("SELECT 1", &[], "boom");
        assert!(matches!(err, GridError::Execution { .. }));
        let err = GridError::contract("row 9 out of range");
        assert!(matches!(err, GridError::Contract { .. }));
        let err = GridError::schema("no columns");
        assert!(matches!(err, GridError::Schema { .. }));
        let err = GridError::storage("disk");
        assert!(matches!(err, GridError::Storage { .. }));
        let err = GridError::config("bad json");
        assert!(matches!(err, GridError::Config { .. }));
    }

    #[test]
    fn execution_error_names_statement_and_params() {
        let err = GridError::execution(
            "DELETE FROM vehicle WHERE vehicle_id = ?",
            &[CellValue::Integer(7)],
            "no such table: vehicle",
        );
        assert_eq!(
            err.statement(),
            Some("DELETE FROM vehicle WHERE vehicle_id = ?")
        );
        let rendered = err.to_string();
        assert!(rendered.contains("DELETE FROM vehicle"));
        assert!(rendered.contains("Integer(7)"));
        assert!(rendered.contains("no such table"));
    }
}
