use std::error::Error;

use chrono::NaiveDateTime;
use deadpool_postgres::{Config as PgConfig, Object, Transaction};
use serde_json::Value as JsonValue;
use tokio_postgres::{
    NoTls, Statement,
    types::{IsNull, ToSql, Type, to_sql_checked},
};
use tokio_util::bytes;

use crate::error::RecordMapDbError;
use crate::pool::{Database, DbPool, PoolTuning};
use crate::results::{DbRow, ResultSet};
use crate::types::{ConversionMode, DatabaseType, ParamConverter, SqlValue};

impl Database {
    /// Open a PostgreSQL database behind a `deadpool_postgres` pool.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a config missing required fields and
    /// `ConnectionError` if the pool cannot be created.
    pub async fn new_postgres(pg_config: PgConfig) -> Result<Self, RecordMapDbError> {
        Self::new_postgres_with_tuning(pg_config, &PoolTuning::default()).await
    }

    /// Open a PostgreSQL database with explicit pool tuning.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a config missing required fields and
    /// `ConnectionError` if the pool cannot be created.
    pub async fn new_postgres_with_tuning(
        mut pg_config: PgConfig,
        tuning: &PoolTuning,
    ) -> Result<Self, RecordMapDbError> {
        if pg_config.dbname.is_none() {
            return Err(RecordMapDbError::ConfigError("dbname is required".to_string()));
        }
        if pg_config.host.is_none() {
            return Err(RecordMapDbError::ConfigError("host is required".to_string()));
        }
        if pg_config.port.is_none() {
            return Err(RecordMapDbError::ConfigError("port is required".to_string()));
        }
        if pg_config.user.is_none() {
            return Err(RecordMapDbError::ConfigError("user is required".to_string()));
        }
        if pg_config.password.is_none() {
            return Err(RecordMapDbError::ConfigError("password is required".to_string()));
        }

        pg_config.pool = Some(tuning.to_pool_config());

        let pg_pool = pg_config
            .create_pool(Some(deadpool_postgres::Runtime::Tokio1), NoTls)
            .map_err(|e| {
                RecordMapDbError::ConnectionError(format!("Failed to create Postgres pool: {e}"))
            })?;

        Ok(Database {
            pool: DbPool::Postgres(pg_pool),
            db_type: DatabaseType::Postgres,
        })
    }
}

/// Container for Postgres parameters with lifetime tracking.
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Convert from a slice of `SqlValue` to Postgres parameters.
    ///
    /// # Errors
    ///
    /// Conversion is total; the `Result` keeps the converter signature
    /// uniform across backends.
    pub fn convert(params: &'a [SqlValue]) -> Result<Params<'a>, RecordMapDbError> {
        let references: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        Ok(Params { references })
    }

    /// Get a reference to the underlying parameter array.
    #[must_use]
    pub fn as_refs(&self) -> &[&'a (dyn ToSql + Sync)] {
        &self.references
    }
}

impl<'a> ParamConverter<'a> for Params<'a> {
    type Converted = Params<'a>;

    fn convert_sql_params(
        params: &'a [SqlValue],
        _mode: ConversionMode,
    ) -> Result<Self::Converted, RecordMapDbError> {
        Self::convert(params)
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            // Narrow integer/float columns get a value of matching width;
            // a raw i64/f64 write would send the wrong byte count.
            SqlValue::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                _ => (*i).to_sql(ty, out),
            },
            SqlValue::Float(f) => match *ty {
                Type::FLOAT4 => {
                    #[allow(clippy::cast_possible_truncation)]
                    let narrowed = *f as f32;
                    narrowed.to_sql(ty, out)
                }
                _ => (*f).to_sql(ty, out),
            },
            SqlValue::Text(s) => s.to_sql(ty, out),
            SqlValue::Bool(b) => (*b).to_sql(ty, out),
            SqlValue::Timestamp(dt) => dt.to_sql(ty, out),
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Json(jsval) => jsval.to_sql(ty, out),
            SqlValue::Blob(bytes) => bytes.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        match *ty {
            Type::INT2 | Type::INT4 | Type::INT8 => true,
            Type::FLOAT4 | Type::FLOAT8 => true,
            Type::TEXT | Type::VARCHAR | Type::CHAR | Type::NAME => true,
            Type::BOOL => true,
            Type::TIMESTAMP | Type::TIMESTAMPTZ | Type::DATE => true,
            Type::JSON | Type::JSONB => true,
            Type::BYTEA => true,
            _ => false,
        }
    }

    to_sql_checked!();
}

/// Build a result set from a prepared statement inside a transaction.
///
/// # Errors
///
/// Returns an error from query execution or row extraction; no partial
/// result set is returned.
pub async fn build_result_set(
    stmt: &Statement,
    params: &[&(dyn ToSql + Sync)],
    transaction: &Transaction<'_>,
) -> Result<ResultSet, RecordMapDbError> {
    let rows = transaction.query(stmt, params).await?;

    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();

    let column_names_rc = std::sync::Arc::new(column_names);
    let mut result_set = ResultSet::with_capacity(rows.len());

    for row in rows {
        let mut values = Vec::with_capacity(column_names_rc.len());
        for i in 0..column_names_rc.len() {
            values.push(extract_value(&row, i)?);
        }
        result_set.add_row(DbRow::new(column_names_rc.clone(), values));
    }

    Ok(result_set)
}

/// Extract a `SqlValue` from a `tokio_postgres` row at the given index.
fn extract_value(row: &tokio_postgres::Row, idx: usize) -> Result<SqlValue, RecordMapDbError> {
    let type_info = row.columns()[idx].type_();

    if type_info.name() == "int2" {
        let val: Option<i16> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))))
    } else if type_info.name() == "int4" {
        let val: Option<i32> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))))
    } else if type_info.name() == "int8" {
        let val: Option<i64> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Int))
    } else if type_info.name() == "float4" {
        let val: Option<f32> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, |v| SqlValue::Float(f64::from(v))))
    } else if type_info.name() == "float8" {
        let val: Option<f64> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Float))
    } else if type_info.name() == "bool" {
        let val: Option<bool> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Bool))
    } else if type_info.name() == "timestamp" || type_info.name() == "timestamptz" {
        let val: Option<NaiveDateTime> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Timestamp))
    } else if type_info.name() == "json" || type_info.name() == "jsonb" {
        let val: Option<JsonValue> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Json))
    } else if type_info.name() == "bytea" {
        let val: Option<Vec<u8>> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Blob))
    } else {
        // Everything else reads as text
        let val: Option<String> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Text))
    }
}

/// Execute a batch of statements inside one transaction.
///
/// # Errors
///
/// Returns an error if the transaction or any statement in the batch fails.
pub async fn execute_batch(pg_client: &mut Object, sql: &str) -> Result<(), RecordMapDbError> {
    let tx = pg_client.transaction().await?;
    tx.batch_execute(sql).await?;
    tx.commit().await?;

    Ok(())
}

/// Execute a SELECT with parameters.
///
/// # Errors
///
/// Returns an error from preparation, execution, or row extraction.
pub async fn execute_select(
    pg_client: &mut Object,
    sql: &str,
    params: &[SqlValue],
) -> Result<ResultSet, RecordMapDbError> {
    let params = Params::convert(params)?;
    let tx = pg_client.transaction().await?;
    let stmt = tx.prepare(sql).await?;
    let result_set = build_result_set(&stmt, params.as_refs(), &tx).await?;
    tx.commit().await?;
    Ok(result_set)
}

/// Execute a DML statement with parameters, returning rows affected.
///
/// # Errors
///
/// Returns an error from preparation or execution.
pub async fn execute_dml(
    pg_client: &mut Object,
    sql: &str,
    params: &[SqlValue],
) -> Result<usize, RecordMapDbError> {
    let params = Params::convert(params)?;
    let tx = pg_client.transaction().await?;

    let stmt = tx.prepare(sql).await?;
    let rows = tx.execute(&stmt, params.as_refs()).await?;
    tx.commit().await?;

    Ok(usize::try_from(rows).unwrap_or(usize::MAX))
}
