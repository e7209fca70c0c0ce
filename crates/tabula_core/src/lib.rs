//! Foreign-key-aware tabular editing model over a relational table.

pub mod changes;
pub mod error;
pub mod executor;
pub mod format;
pub mod materialize;
pub mod model;
pub mod options;
pub mod planner;
pub mod schema;
pub mod value;

pub use changes::{CellState, ChangeTracker, RowState, Statement, StatementKind};
pub use error::{GridError, GridResult};
pub use executor::Executor;
pub use model::*;
pub use options::{ForeignKeyOption, load_options, options_sql, position_of};
pub use planner::{QueryPlan, plan};
pub use schema::*;
pub use value::*;
