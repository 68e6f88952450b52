use crate::error::RecordMapDbError;
use crate::records::{RecordMapping, json_to_sql_value};
use crate::types::{DatabaseType, SqlValue};

/// A statement ready to hand to the executor: SQL text with positional
/// placeholders plus the values to bind, in placeholder order.
#[derive(Debug, Clone)]
pub struct BuiltStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Convert a mixed-case identifier to a lower-case, underscore-separated
/// column name. The first character is lower-cased unconditionally; every
/// later uppercase character gets a single underscore before it.
///
/// Consecutive uppercase runs are not collapsed, so `"UserID"` becomes
/// `"user_id"` and `"ID"` becomes `"i_d"`. Total over any input.
#[must_use]
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if i == 0 {
            out.extend(ch.to_lowercase());
        } else if ch.is_uppercase() {
            out.push('_');
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn column_name(field: &str, normalize: bool) -> String {
    if normalize {
        camel_to_snake(field)
    } else {
        field.to_string()
    }
}

/// The backend's native positional marker for the `n`th parameter
/// (1-based): `$n` for Postgres, `?n` for SQLite.
#[must_use]
pub fn placeholder(db_type: DatabaseType, n: usize) -> String {
    match db_type {
        DatabaseType::Postgres => format!("${n}"),
        DatabaseType::Sqlite => format!("?{n}"),
    }
}

/// Derive predicate fragments and bound arguments from a mapping.
///
/// Null-valued fields are skipped ("don't filter on this"), not matched as
/// NULL. A string value whose first character is `%` becomes a LIKE
/// predicate, bound as-is including the wildcard; every other value is an
/// equality predicate. Fragment order and argument order both follow the
/// mapping's iteration order.
#[must_use]
pub fn predicates(
    db_type: DatabaseType,
    mapping: &RecordMapping,
    normalize: bool,
) -> (Vec<String>, Vec<SqlValue>) {
    let mut fragments = Vec::new();
    let mut args = Vec::new();
    for (field, value) in mapping {
        if value.is_null() {
            continue;
        }
        let col = column_name(field, normalize);
        let marker = placeholder(db_type, args.len() + 1);
        let fragment = match value.as_str() {
            Some(s) if s.starts_with('%') => format!("{col} like {marker}"),
            _ => format!("{col} = {marker}"),
        };
        fragments.push(fragment);
        args.push(json_to_sql_value(value));
    }
    (fragments, args)
}

/// Build a single-row INSERT from all fields of the mapping, null-valued
/// fields included.
///
/// # Errors
///
/// Returns `ParameterError` for a record with no fields.
pub fn build_insert(
    db_type: DatabaseType,
    table: &str,
    mapping: &RecordMapping,
    normalize: bool,
) -> Result<BuiltStatement, RecordMapDbError> {
    if mapping.is_empty() {
        return Err(RecordMapDbError::ParameterError(format!(
            "insert into {table}: record has no fields"
        )));
    }

    let mut cols = Vec::with_capacity(mapping.len());
    let mut markers = Vec::with_capacity(mapping.len());
    let mut params = Vec::with_capacity(mapping.len());
    for (field, value) in mapping {
        cols.push(column_name(field, normalize));
        markers.push(placeholder(db_type, params.len() + 1));
        params.push(json_to_sql_value(value));
    }

    Ok(BuiltStatement {
        sql: format!(
            "insert into {table} ({}) values ({})",
            cols.join(", "),
            markers.join(", ")
        ),
        params,
    })
}

/// Build an UPDATE keyed on `key_field`. Every other field becomes an
/// assignment; the key's value is bound last for the WHERE clause.
///
/// The WHERE column goes through the same normalization as the SET columns.
///
/// # Errors
///
/// Returns `ParameterError` if the record lacks `key_field`, carries a null
/// key value, or has no assignable fields besides the key.
pub fn build_update(
    db_type: DatabaseType,
    table: &str,
    key_field: &str,
    mapping: &RecordMapping,
    normalize: bool,
) -> Result<BuiltStatement, RecordMapDbError> {
    let key_value = match mapping.get(key_field) {
        Some(value) if !value.is_null() => value,
        Some(_) => {
            return Err(RecordMapDbError::ParameterError(format!(
                "update {table}: key field {key_field} is null"
            )));
        }
        None => {
            return Err(RecordMapDbError::ParameterError(format!(
                "update {table}: record has no {key_field} field"
            )));
        }
    };

    let mut assignments = Vec::with_capacity(mapping.len().saturating_sub(1));
    let mut params = Vec::with_capacity(mapping.len());
    for (field, value) in mapping {
        if field == key_field {
            continue;
        }
        let col = column_name(field, normalize);
        assignments.push(format!("{col} = {}", placeholder(db_type, params.len() + 1)));
        params.push(json_to_sql_value(value));
    }
    if assignments.is_empty() {
        return Err(RecordMapDbError::ParameterError(format!(
            "update {table}: record has no fields besides {key_field}"
        )));
    }

    let key_col = column_name(key_field, normalize);
    let key_marker = placeholder(db_type, params.len() + 1);
    params.push(json_to_sql_value(key_value));

    Ok(BuiltStatement {
        sql: format!(
            "update {table} set {} where {key_col} = {key_marker}",
            assignments.join(", ")
        ),
        params,
    })
}

/// Build a DELETE with AND-joined predicates.
///
/// # Errors
///
/// An empty predicate set yields a statement with no WHERE clause at all,
/// affecting every row; that is only allowed when `allow_full_table` is
/// set, and is `FullTableDisabled` otherwise.
pub fn build_delete(
    db_type: DatabaseType,
    table: &str,
    mapping: &RecordMapping,
    normalize: bool,
    allow_full_table: bool,
) -> Result<BuiltStatement, RecordMapDbError> {
    let (fragments, params) = predicates(db_type, mapping, normalize);
    if fragments.is_empty() {
        if !allow_full_table {
            return Err(RecordMapDbError::FullTableDisabled {
                table: table.to_string(),
                operation: "delete",
            });
        }
        return Ok(BuiltStatement {
            sql: format!("delete from {table}"),
            params,
        });
    }
    Ok(BuiltStatement {
        sql: format!("delete from {table} where {}", fragments.join(" and ")),
        params,
    })
}

/// Build a `select *` with AND-joined predicates. Same full-table guard as
/// [`build_delete`].
///
/// # Errors
///
/// Returns `FullTableDisabled` for an empty predicate set on a table not
/// opted in to full-table statements.
pub fn build_select(
    db_type: DatabaseType,
    table: &str,
    mapping: &RecordMapping,
    normalize: bool,
    allow_full_table: bool,
) -> Result<BuiltStatement, RecordMapDbError> {
    let (fragments, params) = predicates(db_type, mapping, normalize);
    if fragments.is_empty() {
        if !allow_full_table {
            return Err(RecordMapDbError::FullTableDisabled {
                table: table.to_string(),
                operation: "select",
            });
        }
        return Ok(BuiltStatement {
            sql: format!("select * from {table}"),
            params,
        });
    }
    Ok(BuiltStatement {
        sql: format!("select * from {table} where {}", fragments.join(" and ")),
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Record;
    use serde_json::json;

    fn mapping(text: &str) -> RecordMapping {
        Record::from(text).decode().unwrap()
    }

    #[test]
    fn normalizer_handles_mixed_case() {
        assert_eq!(camel_to_snake("UserID"), "user_id");
        assert_eq!(camel_to_snake("firstName"), "first_name");
        assert_eq!(camel_to_snake("name"), "name");
        assert_eq!(camel_to_snake(""), "");
    }

    #[test]
    fn normalizer_does_not_collapse_uppercase_runs() {
        // One underscore per uppercase letter, even in acronyms.
        assert_eq!(camel_to_snake("ID"), "i_d");
        assert_eq!(camel_to_snake("HTTPCode"), "h_t_t_p_code");
    }

    #[test]
    fn normalizer_is_a_fixed_point_on_snake_case() {
        let once = camel_to_snake("UserID");
        assert_eq!(camel_to_snake(&once), once);
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
    }

    #[test]
    fn predicates_emit_one_fragment_per_non_null_field() {
        let map = mapping(r#"{"a": 1, "b": null, "c": "x", "d": null, "e": true}"#);
        let (fragments, args) = predicates(DatabaseType::Sqlite, &map, true);
        assert_eq!(fragments.len(), 3);
        assert_eq!(args.len(), 3);
        assert_eq!(fragments[0], "a = ?1");
        assert_eq!(fragments[1], "c = ?2");
        assert_eq!(fragments[2], "e = ?3");
        assert_eq!(args[0], SqlValue::Int(1));
        assert_eq!(args[2], SqlValue::Bool(true));
    }

    #[test]
    fn leading_wildcard_text_classifies_as_pattern_match() {
        let map = mapping(r#"{"name": "%smith", "city": "york%", "age": 7}"#);
        let (fragments, args) = predicates(DatabaseType::Sqlite, &map, true);
        assert_eq!(fragments[0], "name like ?1");
        assert_eq!(args[0], SqlValue::Text("%smith".into()));
        // Trailing wildcard alone does not trigger pattern matching.
        assert_eq!(fragments[1], "city = ?2");
        assert_eq!(fragments[2], "age = ?3");
    }

    #[test]
    fn insert_preserves_field_order_and_binds_nulls() {
        let map = mapping(r#"{"UserID": 1, "FirstName": "Ann", "Note": null}"#);
        let stmt = build_insert(DatabaseType::Sqlite, "users", &map, true).unwrap();
        assert_eq!(
            stmt.sql,
            "insert into users (user_id, first_name, note) values (?1, ?2, ?3)"
        );
        assert_eq!(
            stmt.params,
            vec![
                SqlValue::Int(1),
                SqlValue::Text("Ann".into()),
                SqlValue::Null
            ]
        );
    }

    #[test]
    fn insert_uses_postgres_markers() {
        let map = mapping(r#"{"a": 1, "b": 2}"#);
        let stmt = build_insert(DatabaseType::Postgres, "t", &map, true).unwrap();
        assert_eq!(stmt.sql, "insert into t (a, b) values ($1, $2)");
    }

    #[test]
    fn insert_without_fields_is_a_parameter_error() {
        let res = build_insert(DatabaseType::Sqlite, "t", &RecordMapping::new(), true);
        assert!(matches!(res, Err(RecordMapDbError::ParameterError(_))));
    }

    #[test]
    fn insert_with_normalization_disabled_keeps_field_names() {
        let map = mapping(r#"{"UserID": 1}"#);
        let stmt = build_insert(DatabaseType::Sqlite, "users", &map, false).unwrap();
        assert_eq!(stmt.sql, "insert into users (UserID) values (?1)");
    }

    #[test]
    fn update_excludes_key_from_set_and_binds_it_last() {
        let map = mapping(r#"{"UserID": 9, "FirstName": "Ann", "Age": 30}"#);
        let stmt = build_update(DatabaseType::Sqlite, "users", "UserID", &map, true).unwrap();
        assert_eq!(
            stmt.sql,
            "update users set first_name = ?1, age = ?2 where user_id = ?3"
        );
        assert_eq!(stmt.params[2], SqlValue::Int(9));
    }

    #[test]
    fn update_requires_a_usable_key() {
        let map = mapping(r#"{"FirstName": "Ann"}"#);
        let res = build_update(DatabaseType::Sqlite, "users", "UserID", &map, true);
        assert!(matches!(res, Err(RecordMapDbError::ParameterError(_))));

        let map = mapping(r#"{"UserID": null, "FirstName": "Ann"}"#);
        let res = build_update(DatabaseType::Sqlite, "users", "UserID", &map, true);
        assert!(matches!(res, Err(RecordMapDbError::ParameterError(_))));

        let map = mapping(r#"{"UserID": 9}"#);
        let res = build_update(DatabaseType::Sqlite, "users", "UserID", &map, true);
        assert!(matches!(res, Err(RecordMapDbError::ParameterError(_))));
    }

    #[test]
    fn select_with_pattern_predicate() {
        let map = mapping(r#"{"name": "%smith"}"#);
        let stmt = build_select(DatabaseType::Postgres, "users", &map, true, false).unwrap();
        assert_eq!(stmt.sql, "select * from users where name like $1");
        assert_eq!(stmt.params, vec![SqlValue::Text("%smith".into())]);
    }

    #[test]
    fn select_joins_predicates_with_and() {
        let map = mapping(r#"{"a": 1, "b": "x"}"#);
        let stmt = build_select(DatabaseType::Sqlite, "t", &map, true, false).unwrap();
        assert_eq!(stmt.sql, "select * from t where a = ?1 and b = ?2");
    }

    #[test]
    fn empty_predicates_require_the_full_table_opt_in() {
        let all_null = mapping(r#"{"a": null, "b": null}"#);

        let res = build_delete(DatabaseType::Sqlite, "t", &all_null, true, false);
        assert!(matches!(
            res,
            Err(RecordMapDbError::FullTableDisabled {
                operation: "delete",
                ..
            })
        ));

        // With the opt-in, the statement has no WHERE clause at all and
        // affects every row in the table.
        let stmt = build_delete(DatabaseType::Sqlite, "t", &all_null, true, true).unwrap();
        assert_eq!(stmt.sql, "delete from t");
        assert!(stmt.params.is_empty());

        let res = build_select(DatabaseType::Sqlite, "t", &RecordMapping::new(), true, false);
        assert!(matches!(
            res,
            Err(RecordMapDbError::FullTableDisabled {
                operation: "select",
                ..
            })
        ));
        let stmt =
            build_select(DatabaseType::Sqlite, "t", &RecordMapping::new(), true, true).unwrap();
        assert_eq!(stmt.sql, "select * from t");
    }

    #[test]
    fn nested_values_bind_as_json() {
        let map = mapping(r#"{"meta": {"k": 1}}"#);
        let stmt = build_insert(DatabaseType::Sqlite, "t", &map, true).unwrap();
        assert_eq!(stmt.params, vec![SqlValue::Json(json!({"k": 1}))]);
    }
}
