use deadpool_sqlite::rusqlite::ParamsFromIter;
use deadpool_sqlite::{Config as DeadpoolSqliteConfig, Object, Runtime, rusqlite};
use rusqlite::Statement;
use rusqlite::ToSql;
use rusqlite::types::Value;

use crate::error::RecordMapDbError;
use crate::pool::{Database, DbPool, PoolTuning};
use crate::results::{DbRow, ResultSet};
use crate::types::{ConversionMode, DatabaseType, ParamConverter, SqlValue};

impl Database {
    /// Open a SQLite database behind a `deadpool_sqlite` pool.
    ///
    /// WAL mode is enabled up front so pooled readers do not block the
    /// writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or the initial
    /// connection fails.
    pub async fn new_sqlite(db_path: impl Into<String>) -> Result<Self, RecordMapDbError> {
        Self::new_sqlite_with_tuning(db_path, &PoolTuning::default()).await
    }

    /// Open a SQLite database with explicit pool tuning.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or the initial
    /// connection fails.
    pub async fn new_sqlite_with_tuning(
        db_path: impl Into<String>,
        tuning: &PoolTuning,
    ) -> Result<Self, RecordMapDbError> {
        let mut cfg: DeadpoolSqliteConfig = DeadpoolSqliteConfig::new(db_path.into());
        cfg.pool = Some(tuning.to_pool_config());

        let pool = cfg.create_pool(Runtime::Tokio1).map_err(|e| {
            RecordMapDbError::ConnectionError(format!("Failed to create SQLite pool: {e}"))
        })?;

        {
            let conn = pool
                .get()
                .await
                .map_err(RecordMapDbError::PoolErrorSqlite)?;
            conn.interact(|conn| {
                conn.execute_batch("PRAGMA journal_mode = WAL;")
                    .map_err(RecordMapDbError::SqliteError)
            })
            .await??;
        }

        Ok(Database {
            pool: DbPool::Sqlite(pool),
            db_type: DatabaseType::Sqlite,
        })
    }
}

/// Bind mapping-layer values to SQLite types.
///
/// # Errors
///
/// Conversion itself is total; the `Result` keeps the converter signature
/// uniform across backends.
pub fn convert_params(params: &[SqlValue]) -> Result<Vec<Value>, RecordMapDbError> {
    let mut values = Vec::with_capacity(params.len());
    for p in params {
        let v = match p {
            SqlValue::Int(i) => Value::Integer(*i),
            SqlValue::Float(f) => Value::Real(*f),
            SqlValue::Text(s) => Value::Text(s.to_string()),
            SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
            SqlValue::Timestamp(dt) => {
                let formatted = dt.format("%F %T%.f").to_string();
                Value::Text(formatted)
            }
            SqlValue::Null => Value::Null,
            SqlValue::Json(jsval) => Value::Text(jsval.to_string()),
            SqlValue::Blob(bytes) => Value::Blob(bytes.to_vec()),
        };
        values.push(v);
    }
    Ok(values)
}

/// Convert owned values into the iterator form `rusqlite` execution wants.
///
/// # Errors
///
/// Propagates any conversion failure from [`convert_params`].
pub fn convert_params_for_execute<I>(
    iter: I,
) -> Result<ParamsFromIter<std::vec::IntoIter<Value>>, RecordMapDbError>
where
    I: IntoIterator<Item = SqlValue>,
{
    let params_vec: Vec<SqlValue> = iter.into_iter().collect();
    let converted = convert_params(&params_vec)?;
    Ok(rusqlite::params_from_iter(converted.into_iter()))
}

/// Wrapper for SQLite parameters used in queries.
pub struct SqliteParamsQuery(pub Vec<Value>);

/// Wrapper for SQLite parameters used in statement execution.
pub struct SqliteParamsExecute(pub ParamsFromIter<std::vec::IntoIter<Value>>);

impl<'a> ParamConverter<'a> for SqliteParamsQuery {
    type Converted = Self;

    fn convert_sql_params(
        params: &'a [SqlValue],
        _mode: ConversionMode,
    ) -> Result<Self::Converted, RecordMapDbError> {
        convert_params(params).map(SqliteParamsQuery)
    }
}

impl<'a> ParamConverter<'a> for SqliteParamsExecute {
    type Converted = Self;

    fn convert_sql_params(
        params: &'a [SqlValue],
        mode: ConversionMode,
    ) -> Result<Self::Converted, RecordMapDbError> {
        match mode {
            ConversionMode::Execute => {
                convert_params_for_execute(params.to_vec()).map(SqliteParamsExecute)
            }
            ConversionMode::Query => Err(RecordMapDbError::ParameterError(
                "Execute conversion required for this operation".into(),
            )),
        }
    }

    fn supports_mode(mode: ConversionMode) -> bool {
        mode == ConversionMode::Execute
    }
}

fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<SqlValue, RecordMapDbError> {
    match row.get_ref(idx) {
        Err(e) => Err(RecordMapDbError::SqliteError(e)),
        Ok(rusqlite::types::ValueRef::Null) => Ok(SqlValue::Null),
        Ok(rusqlite::types::ValueRef::Integer(i)) => Ok(SqlValue::Int(i)),
        Ok(rusqlite::types::ValueRef::Real(f)) => Ok(SqlValue::Float(f)),
        Ok(rusqlite::types::ValueRef::Text(bytes)) => {
            let s = String::from_utf8_lossy(bytes).into_owned();
            Ok(SqlValue::Text(s))
        }
        Ok(rusqlite::types::ValueRef::Blob(b)) => Ok(SqlValue::Blob(b.to_vec())),
    }
}

/// Run a prepared SELECT and collect every row.
///
/// # Errors
///
/// Returns an error from statement execution, column introspection, or row
/// scanning; no partial result set is returned.
pub fn build_result_set(
    stmt: &mut Statement,
    params: &[Value],
) -> Result<ResultSet, RecordMapDbError> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    // Column names stored once, shared by every row
    let column_names_rc = std::sync::Arc::new(column_names);

    let mut rows_iter = stmt.query(&param_refs[..])?;
    let mut result_set = ResultSet::default();

    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::with_capacity(column_names_rc.len());
        for i in 0..column_names_rc.len() {
            values.push(extract_value(row, i)?);
        }
        result_set.add_row(DbRow::new(column_names_rc.clone(), values));
    }

    Ok(result_set)
}

/// Execute a batch of statements inside one transaction on the pool's
/// interact thread.
///
/// # Errors
///
/// Returns an error if the transaction or any statement in the batch fails.
pub async fn execute_batch(sqlite_client: &Object, sql: &str) -> Result<(), RecordMapDbError> {
    let sql_owned = sql.to_owned();

    sqlite_client
        .interact(move |conn| -> rusqlite::Result<()> {
            let tx = conn.transaction()?;
            tx.execute_batch(&sql_owned)?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| RecordMapDbError::Other(format!("SQLite interact error: {e}")))
        .and_then(|res| res.map_err(RecordMapDbError::SqliteError))
}

/// Execute a SELECT with parameters.
///
/// # Errors
///
/// Returns an error from parameter conversion, preparation, or execution.
pub async fn execute_select(
    sqlite_client: &Object,
    sql: &str,
    params: &[SqlValue],
) -> Result<ResultSet, RecordMapDbError> {
    let sql_owned = sql.to_owned();
    let params_owned = convert_params(params)?;

    sqlite_client
        .interact(move |conn| -> rusqlite::Result<ResultSet> {
            let mut stmt = conn.prepare(&sql_owned)?;
            // Fold the mapping-layer error back into rusqlite's error type so
            // the interact closure has a single error channel.
            build_result_set(&mut stmt, &params_owned).map_err(|e| {
                if let RecordMapDbError::SqliteError(sqlite_err) = e {
                    sqlite_err
                } else {
                    rusqlite::Error::InvalidParameterName(format!("{e:?}"))
                }
            })
        })
        .await
        .map_err(|e| RecordMapDbError::Other(format!("SQLite interact error: {e}")))
        .and_then(|res| res.map_err(RecordMapDbError::SqliteError))
}

/// Execute a DML statement with parameters, returning rows affected.
///
/// # Errors
///
/// Returns an error from parameter conversion, preparation, or execution.
pub async fn execute_dml(
    sqlite_client: &Object,
    sql: &str,
    params: &[SqlValue],
) -> Result<usize, RecordMapDbError> {
    let sql_owned = sql.to_owned();
    let params_owned = convert_params(params)?;

    sqlite_client
        .interact(move |conn| -> rusqlite::Result<usize> {
            let tx = conn.transaction()?;
            let param_refs: Vec<&dyn ToSql> = params_owned.iter().map(|v| v as &dyn ToSql).collect();
            let rows = {
                let mut stmt = tx.prepare(&sql_owned)?;
                stmt.execute(&param_refs[..])?
            };
            tx.commit()?;
            Ok(rows)
        })
        .await
        .map_err(|e| RecordMapDbError::Other(format!("SQLite interact error: {e}")))
        .and_then(|res| res.map_err(RecordMapDbError::SqliteError))
}
