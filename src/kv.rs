use crate::error::RecordMapDbError;
use crate::pool::{Database, DatabaseExecutor};
use crate::statements::placeholder;
use crate::types::SqlValue;

const KEY_COL: &str = "property";
const VALUE_COL: &str = "value";

/// Key-value configuration store on a two-column table.
///
/// The key column is the primary key; both columns are text. Attachment
/// creates the table if it can; `set` overwrites by delete-then-insert, so
/// there is no atomicity across the two statements.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    database: Database,
    table_name: String,
}

impl ConfigStore {
    /// Attach to (and bootstrap) the config table.
    ///
    /// Table creation failures are ignored; an existing table and a table
    /// that cannot be created look the same here, and the first `get` or
    /// `set` surfaces the latter.
    pub async fn attach(database: &Database, table: impl Into<String>) -> Self {
        let store = ConfigStore {
            database: database.clone(),
            table_name: table.into(),
        };

        let ddl = format!(
            "create table {} ({KEY_COL} varchar(4000) primary key, {VALUE_COL} varchar(4000))",
            store.table_name
        );
        match store.database.connection().await {
            Ok(mut conn) => {
                if let Err(e) = conn.execute_batch(&ddl).await {
                    tracing::debug!(table = %store.table_name, error = %e, "config table create skipped");
                }
            }
            Err(e) => {
                tracing::debug!(table = %store.table_name, error = %e, "config table create skipped");
            }
        }

        store
    }

    /// Get the value stored for `key`, or empty text if absent. An empty
    /// stored value and a missing key produce the same result.
    ///
    /// # Errors
    ///
    /// Returns the backend's execution error.
    pub async fn get(&self, key: &str) -> Result<String, RecordMapDbError> {
        let marker = placeholder(self.database.db_type(), 1);
        let sql = format!(
            "select {VALUE_COL} from {} where {KEY_COL} = {marker}",
            self.table_name
        );
        let mut conn = self.database.connection().await?;
        let result_set = conn
            .execute_select(&sql, &[SqlValue::Text(key.to_string())])
            .await?;
        Ok(result_set
            .rows
            .first()
            .and_then(|row| row.get(VALUE_COL))
            .and_then(SqlValue::as_text)
            .map(str::to_string)
            .unwrap_or_default())
    }

    /// Store `value` under `key`, overwriting any previous value.
    ///
    /// Implemented as unconditional delete-then-insert; a concurrent reader
    /// can observe a transient absence between the two statements.
    ///
    /// # Errors
    ///
    /// Returns the backend's execution error from the insert; the
    /// preceding delete's outcome is ignored.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), RecordMapDbError> {
        let _ = self.remove(key).await;

        let markers = (
            placeholder(self.database.db_type(), 1),
            placeholder(self.database.db_type(), 2),
        );
        let sql = format!(
            "insert into {} ({KEY_COL}, {VALUE_COL}) values ({}, {})",
            self.table_name, markers.0, markers.1
        );
        let mut conn = self.database.connection().await?;
        conn.execute_dml(
            &sql,
            &[
                SqlValue::Text(key.to_string()),
                SqlValue::Text(value.to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    /// Delete the row for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns the backend's execution error.
    pub async fn remove(&self, key: &str) -> Result<(), RecordMapDbError> {
        let marker = placeholder(self.database.db_type(), 1);
        let sql = format!(
            "delete from {} where {KEY_COL} = {marker}",
            self.table_name
        );
        let mut conn = self.database.connection().await?;
        conn.execute_dml(&sql, &[SqlValue::Text(key.to_string())])
            .await?;
        Ok(())
    }
}
