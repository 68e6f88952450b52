use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::RecordMapDbError;
use crate::types::SqlValue;

/// A row from a query result: driver-reported column names (shared across
/// the result set) plus one `SqlValue` per column.
#[derive(Debug, Clone)]
pub struct DbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: std::sync::Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<SqlValue>,
    // Cache for column lookups, to avoid repeated string comparisons
    #[doc(hidden)]
    column_index_cache: std::sync::Arc<std::collections::HashMap<String, usize>>,
}

impl DbRow {
    #[must_use]
    pub fn new(column_names: std::sync::Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        let cache = std::sync::Arc::new(
            column_names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect::<std::collections::HashMap<_, _>>(),
        );

        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    /// Get the index of a column by name.
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }

        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }
}

/// The rows returned by a query, in driver order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub rows: Vec<DbRow>,
}

impl ResultSet {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn add_row(&mut self, row: DbRow) {
        self.rows.push(row);
    }

    /// Reshape every row into an ordered mapping keyed by the
    /// driver-reported column names. Blob columns are coerced to text;
    /// everything else passes through as its JSON equivalent.
    #[must_use]
    pub fn to_mappings(&self) -> Vec<JsonMap<String, JsonValue>> {
        self.rows
            .iter()
            .map(|row| {
                row.column_names
                    .iter()
                    .zip(row.values.iter())
                    .map(|(col, val)| (col.clone(), sql_value_to_json(val)))
                    .collect()
            })
            .collect()
    }

    /// Round-trip the mappings through a JSON decode to populate the
    /// caller's destination type. Destinations must be shape-compatible
    /// with the mapping's encoded form; column names are not run back
    /// through the field normalizer.
    ///
    /// # Errors
    ///
    /// Returns `RecordMapDbError::DecodeError` if any row fails to decode
    /// into `T`; no partial results are returned.
    pub fn materialize<T: DeserializeOwned>(&self) -> Result<Vec<T>, RecordMapDbError> {
        let mappings = self
            .to_mappings()
            .into_iter()
            .map(JsonValue::Object)
            .collect::<Vec<_>>();
        serde_json::from_value(JsonValue::Array(mappings))
            .map_err(|e| RecordMapDbError::DecodeError(format!("result rows: {e}")))
    }
}

fn sql_value_to_json(value: &SqlValue) -> JsonValue {
    match value {
        SqlValue::Int(i) => JsonValue::from(*i),
        SqlValue::Float(f) => serde_json::Number::from_f64(*f)
            .map_or(JsonValue::Null, JsonValue::Number),
        SqlValue::Text(s) => JsonValue::String(s.clone()),
        SqlValue::Bool(b) => JsonValue::Bool(*b),
        SqlValue::Timestamp(dt) => {
            JsonValue::String(dt.format("%Y-%m-%d %H:%M:%S").to_string())
        }
        SqlValue::Null => JsonValue::Null,
        SqlValue::Json(v) => v.clone(),
        // Byte columns coerce to text on the way out
        SqlValue::Blob(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}
