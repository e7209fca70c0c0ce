pub mod catalog;
pub mod config;
pub mod demo;
pub mod session;

pub const DEFAULT_DB_NAME: &str = "tabula.sqlite";

pub use catalog::{ColumnDefinition, TableDefinition, catalog, ensure_catalog, truncate_catalog};
pub use config::{DEFAULT_CONFIG_NAME, DatabaseConfig, SessionConfig, TabulaConfig};
pub use session::SqliteSession;
