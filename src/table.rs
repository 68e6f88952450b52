use serde::de::DeserializeOwned;

use crate::error::RecordMapDbError;
use crate::pool::{Database, DatabaseExecutor};
use crate::records::{Record, RecordSet};
use crate::results::ResultSet;
use crate::statements::{BuiltStatement, build_delete, build_insert, build_select, build_update};

/// Per-table access point for the record mapping engine.
///
/// Cheap to construct and clone; holds a clone of the [`Database`] handle,
/// the table name, and two flags fixed before first use. Field
/// normalization is on by default; full-table statements are off by
/// default.
#[derive(Debug, Clone)]
pub struct Table {
    database: Database,
    name: String,
    normalize_field_names: bool,
    allow_full_table: bool,
}

impl Database {
    /// Get an access point for one table.
    #[must_use]
    pub fn table(&self, name: impl Into<String>) -> Table {
        Table {
            database: self.clone(),
            name: name.into(),
            normalize_field_names: true,
            allow_full_table: false,
        }
    }
}

impl Table {
    /// Enable or disable the camel-case-to-underscore column transform for
    /// this table's statements.
    #[must_use]
    pub fn with_field_normalization(mut self, enabled: bool) -> Self {
        self.normalize_field_names = enabled;
        self
    }

    /// Allow delete/select with an empty predicate set to run against the
    /// whole table. Off by default; without it such calls fail before
    /// touching the database.
    #[must_use]
    pub fn with_full_table_ops(mut self, enabled: bool) -> Self {
        self.allow_full_table = enabled;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn run_dml(&self, built: BuiltStatement) -> Result<usize, RecordMapDbError> {
        tracing::debug!(table = %self.name, sql = %built.sql, "executing statement");
        let mut conn = self.database.connection().await?;
        conn.execute_dml(&built.sql, &built.params).await
    }

    /// Insert one record. All decoded fields become columns, null values
    /// included.
    ///
    /// # Errors
    ///
    /// Returns a decode error for malformed input, a parameter error for a
    /// field-less record, or the backend's execution error.
    pub async fn insert_one(&self, record: Record) -> Result<(), RecordMapDbError> {
        let mapping = record.decode()?;
        let built = build_insert(
            self.database.db_type(),
            &self.name,
            &mapping,
            self.normalize_field_names,
        )?;
        self.run_dml(built).await.map(|_| ())
    }

    /// Update one record, keyed on `key_field` (a raw field name as it
    /// appears in the record). Every other field becomes an assignment.
    ///
    /// # Errors
    ///
    /// Returns a decode error for malformed input, a parameter error when
    /// the key field is missing/null or nothing else is assignable, or the
    /// backend's execution error.
    pub async fn update_one(&self, key_field: &str, record: Record) -> Result<(), RecordMapDbError> {
        let mapping = record.decode()?;
        let built = build_update(
            self.database.db_type(),
            &self.name,
            key_field,
            &mapping,
            self.normalize_field_names,
        )?;
        self.run_dml(built).await.map(|_| ())
    }

    /// Delete rows matching the filter record's non-null fields, returning
    /// the number of rows removed.
    ///
    /// An empty predicate set deletes every row, and is refused unless the
    /// table was built with [`Table::with_full_table_ops`].
    ///
    /// # Errors
    ///
    /// Returns a decode error for malformed input, `FullTableDisabled` for
    /// an unguarded empty predicate set, or the backend's execution error.
    pub async fn delete(&self, filter: Record) -> Result<usize, RecordMapDbError> {
        let mapping = filter.decode()?;
        let built = build_delete(
            self.database.db_type(),
            &self.name,
            &mapping,
            self.normalize_field_names,
            self.allow_full_table,
        )?;
        self.run_dml(built).await
    }

    /// Select rows matching the filter and materialize them into the
    /// caller's destination type. Same full-table guard as [`Table::delete`].
    ///
    /// # Errors
    ///
    /// Returns a decode error for malformed input or rows that do not fit
    /// `T`, `FullTableDisabled` for an unguarded empty predicate set, or
    /// the backend's execution error.
    pub async fn select<T: DeserializeOwned>(
        &self,
        filter: Record,
    ) -> Result<Vec<T>, RecordMapDbError> {
        self.select_rows(filter).await?.materialize()
    }

    /// Select rows matching the filter as a raw [`ResultSet`], for callers
    /// that want the driver's column names and values untouched.
    ///
    /// # Errors
    ///
    /// Returns a decode error for malformed input, `FullTableDisabled` for
    /// an unguarded empty predicate set, or the backend's execution error.
    pub async fn select_rows(&self, filter: Record) -> Result<ResultSet, RecordMapDbError> {
        let mapping = filter.decode()?;
        let built = build_select(
            self.database.db_type(),
            &self.name,
            &mapping,
            self.normalize_field_names,
            self.allow_full_table,
        )?;
        tracing::debug!(table = %self.name, sql = %built.sql, "executing statement");
        let mut conn = self.database.connection().await?;
        conn.execute_select(&built.sql, &built.params).await
    }

    /// Insert a collection of records, one statement per item. A failed
    /// item does not abort the batch; the return value is the number of
    /// items that succeeded, with no detail on which ones failed.
    ///
    /// # Errors
    ///
    /// Only a malformed collection errors; per-item failures are absorbed
    /// into the count (and logged).
    pub async fn insert_many(&self, records: RecordSet) -> Result<usize, RecordMapDbError> {
        let items = records.decode()?;
        let mut succeeded = 0;
        for (index, item) in items.into_iter().enumerate() {
            match self.insert_one(Record::from(item)).await {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    tracing::warn!(table = %self.name, index, error = %e, "bulk insert item failed");
                }
            }
        }
        Ok(succeeded)
    }

    /// Update a collection of records keyed on `key_field`, one statement
    /// per item. Same best-effort counting as [`Table::insert_many`].
    ///
    /// # Errors
    ///
    /// Only a malformed collection errors; per-item failures are absorbed
    /// into the count (and logged).
    pub async fn update_many(
        &self,
        key_field: &str,
        records: RecordSet,
    ) -> Result<usize, RecordMapDbError> {
        let items = records.decode()?;
        let mut succeeded = 0;
        for (index, item) in items.into_iter().enumerate() {
            match self.update_one(key_field, Record::from(item)).await {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    tracing::warn!(table = %self.name, index, error = %e, "bulk update item failed");
                }
            }
        }
        Ok(succeeded)
    }
}
