//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::convert_sql_params;
pub use crate::error::RecordMapDbError;
pub use crate::kv::ConfigStore;
pub use crate::pool::{Database, DatabaseExecutor, DbConnection, DbPool, PoolTuning};
pub use crate::records::{Record, RecordMapping, RecordSet};
pub use crate::results::{DbRow, ResultSet};
pub use crate::table::Table;
pub use crate::types::{ConversionMode, DatabaseType, ParamConverter, SqlValue};

pub use crate::PostgresParams;
pub use crate::postgres_build_result_set;
pub use crate::sqlite_build_result_set;
pub use crate::{SqliteParamsExecute, SqliteParamsQuery};
