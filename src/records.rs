use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::RecordMapDbError;
use crate::types::SqlValue;

/// The canonical decoded form of a record: an ordered mapping from raw
/// field name to JSON value. Keys keep their source spelling; column-name
/// normalization happens when statements are built, not here.
pub type RecordMapping = Map<String, JsonValue>;

/// A record in one of the accepted input shapes.
///
/// Closed set of variants rather than runtime type inspection: each shape
/// has exactly one decode path, and `decode` reports malformed input as a
/// typed error instead of collapsing it to an empty mapping.
#[derive(Debug, Clone)]
pub enum Record {
    /// No record at all; decodes to an empty mapping, which callers treat
    /// as "no fields".
    Absent,
    /// A JSON-object-shaped document string.
    Encoded(String),
    /// An already-decoded key-value mapping, used unchanged.
    Mapping(RecordMapping),
    /// Any structured value; public field names become mapping keys via a
    /// JSON round-trip.
    Structured(JsonValue),
}

impl Record {
    /// Wrap any serializable value as a structured record.
    ///
    /// # Errors
    ///
    /// Returns `RecordMapDbError::DecodeError` if the value does not
    /// serialize.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, RecordMapDbError> {
        serde_json::to_value(value)
            .map(Record::Structured)
            .map_err(|e| RecordMapDbError::DecodeError(format!("record serialize: {e}")))
    }

    /// Decode into the canonical mapping.
    ///
    /// # Errors
    ///
    /// Returns `RecordMapDbError::DecodeError` for malformed encoded text
    /// or for values that are not object-shaped.
    pub fn decode(self) -> Result<RecordMapping, RecordMapDbError> {
        match self {
            Record::Absent => Ok(RecordMapping::new()),
            Record::Encoded(text) => match serde_json::from_str::<JsonValue>(&text) {
                Ok(JsonValue::Object(map)) => Ok(map),
                Ok(other) => Err(RecordMapDbError::DecodeError(format!(
                    "encoded record is not an object: {other}"
                ))),
                Err(e) => Err(RecordMapDbError::DecodeError(format!(
                    "encoded record: {e}"
                ))),
            },
            Record::Mapping(map) => Ok(map),
            Record::Structured(value) => match value {
                JsonValue::Object(map) => Ok(map),
                other => Err(RecordMapDbError::DecodeError(format!(
                    "structured record is not an object: {other}"
                ))),
            },
        }
    }
}

impl From<&str> for Record {
    fn from(text: &str) -> Self {
        Record::Encoded(text.to_string())
    }
}

impl From<String> for Record {
    fn from(text: String) -> Self {
        Record::Encoded(text)
    }
}

impl From<RecordMapping> for Record {
    fn from(map: RecordMapping) -> Self {
        Record::Mapping(map)
    }
}

impl From<JsonValue> for Record {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Record::Absent,
            JsonValue::Object(map) => Record::Mapping(map),
            other => Record::Structured(other),
        }
    }
}

/// A collection of records for the bulk operations, in one of the accepted
/// shapes. The collection decode only splits the input into elements; each
/// element still goes through the scalar [`Record`] decoder.
#[derive(Debug, Clone)]
pub enum RecordSet {
    /// No records; decodes to an empty sequence.
    Absent,
    /// A JSON-array-shaped document string.
    Encoded(String),
    /// A native sequence of record-shaped values.
    Values(Vec<JsonValue>),
}

impl RecordSet {
    /// Wrap a slice of serializable values as a record collection.
    ///
    /// # Errors
    ///
    /// Returns `RecordMapDbError::DecodeError` if any element does not
    /// serialize.
    pub fn from_serialize<T: Serialize>(items: &[T]) -> Result<Self, RecordMapDbError> {
        items
            .iter()
            .map(|item| {
                serde_json::to_value(item)
                    .map_err(|e| RecordMapDbError::DecodeError(format!("record serialize: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(RecordSet::Values)
    }

    /// Decode into an ordered sequence of record-shaped values.
    ///
    /// # Errors
    ///
    /// Returns `RecordMapDbError::DecodeError` for malformed encoded text
    /// or for documents that are not array-shaped.
    pub fn decode(self) -> Result<Vec<JsonValue>, RecordMapDbError> {
        match self {
            RecordSet::Absent => Ok(Vec::new()),
            RecordSet::Encoded(text) => match serde_json::from_str::<JsonValue>(&text) {
                Ok(JsonValue::Array(values)) => Ok(values),
                Ok(other) => Err(RecordMapDbError::DecodeError(format!(
                    "encoded record collection is not an array: {other}"
                ))),
                Err(e) => Err(RecordMapDbError::DecodeError(format!(
                    "encoded record collection: {e}"
                ))),
            },
            RecordSet::Values(values) => Ok(values),
        }
    }
}

/// Lower a mapping value to the bind representation. Scalars map onto their
/// `SqlValue` counterparts; nested arrays and objects stay JSON and bind in
/// whatever form the backend stores JSON.
#[must_use]
pub fn json_to_sql_value(value: &JsonValue) -> SqlValue {
    match value {
        JsonValue::Null => SqlValue::Null,
        JsonValue::Bool(b) => SqlValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Int(i),
            None => n.as_f64().map_or(SqlValue::Null, SqlValue::Float),
        },
        JsonValue::String(s) => SqlValue::Text(s.clone()),
        nested => SqlValue::Json(nested.clone()),
    }
}
