//! Record-to-SQL mapping over pooled `tokio-postgres` and `rusqlite`
//! connections.
//!
//! Records arrive in one of several shapes (serializable structs,
//! JSON-encoded text, key-value mappings), get normalized into an ordered
//! mapping, and come out the other side as parameterized INSERT / UPDATE /
//! DELETE / SELECT statements with the backend's native positional
//! placeholders. Query results travel the reverse path into any
//! deserializable destination type.
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use sql_recordmap::{Database, Record};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     user_id: i64,
//!     name: String,
//! }
//!
//! # async fn demo() -> Result<(), sql_recordmap::RecordMapDbError> {
//! let db = Database::new_sqlite("app.db").await?;
//! let users = db.table("users");
//! users
//!     .insert_one(Record::from_serialize(&User {
//!         user_id: 1,
//!         name: "alice".into(),
//!     })?)
//!     .await?;
//! let found: Vec<User> = users.select(Record::from(r#"{"name": "alice"}"#)).await?;
//! # let _ = found;
//! # Ok(())
//! # }
//! ```

mod postgres;
mod sqlite;

pub mod error;
pub mod kv;
pub mod pool;
pub mod prelude;
pub mod records;
pub mod results;
pub mod statements;
pub mod table;
pub mod types;

pub use error::RecordMapDbError;
pub use kv::ConfigStore;
pub use pool::{Database, DatabaseExecutor, DbConnection, DbPool, PoolTuning};
pub use records::{Record, RecordMapping, RecordSet, json_to_sql_value};
pub use results::{DbRow, ResultSet};
pub use table::Table;
pub use types::{ConversionMode, DatabaseType, ParamConverter, SqlValue};

pub use postgres::Params as PostgresParams;
pub use postgres::build_result_set as postgres_build_result_set;
pub use sqlite::build_result_set as sqlite_build_result_set;
pub use sqlite::convert_params as sqlite_convert_params;
pub use sqlite::convert_params_for_execute as sqlite_convert_params_for_execute;
pub use sqlite::{SqliteParamsExecute, SqliteParamsQuery};

pub use deadpool_sqlite::rusqlite::params_from_iter as sqlite_params_from_iter;

/// Convert a slice of [`SqlValue`] through whichever backend converter `T`
/// names.
///
/// # Errors
///
/// Returns `RecordMapDbError` if the conversion fails for any parameter.
pub fn convert_sql_params<'a, T: ParamConverter<'a>>(
    params: &'a [SqlValue],
    mode: ConversionMode,
) -> Result<T::Converted, RecordMapDbError> {
    T::convert_sql_params(params, mode)
}
