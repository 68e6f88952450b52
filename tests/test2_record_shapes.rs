use serde_json::{Map, json};
use sql_recordmap::{Database, DatabaseExecutor, Record, RecordMapDbError};
use tokio::runtime::Runtime;

#[test]
fn record_shapes_reach_the_same_table() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("shapes.db").to_string_lossy().into_owned();

    rt.block_on(async {
        let db = Database::new_sqlite(db_path).await?;

        let mut conn = db.connection().await?;
        conn.execute_batch(
            "CREATE TABLE note (note_id INTEGER PRIMARY KEY, body TEXT, pinned BOOLEAN);",
        )
        .await?;
        drop(conn);

        let notes = db.table("note");

        // Key-value mapping, used directly and in insertion order.
        let mut mapping = Map::new();
        mapping.insert("NoteID".to_string(), json!(1));
        mapping.insert("Body".to_string(), json!("first"));
        mapping.insert("Pinned".to_string(), json!(true));
        notes.insert_one(Record::Mapping(mapping)).await?;

        // Encoded document text.
        notes
            .insert_one(Record::from(r#"{"NoteID": 2, "Body": "second", "Pinned": false}"#))
            .await?;

        let rows = notes.select_rows(Record::from(r#"{"NoteID": 1}"#)).await?;
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(rows.rows[0].get("body").unwrap().as_text().unwrap(), "first");
        assert!(*rows.rows[0].get("pinned").unwrap().as_bool().unwrap());

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}

#[test]
fn malformed_and_absent_records_fail_typed() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("bad.db").to_string_lossy().into_owned();

    rt.block_on(async {
        let db = Database::new_sqlite(db_path).await?;

        let mut conn = db.connection().await?;
        conn.execute_batch("CREATE TABLE note (note_id INTEGER PRIMARY KEY, body TEXT);")
            .await?;
        drop(conn);

        let notes = db.table("note");

        // Malformed encoded text surfaces as a decode error instead of
        // silently becoming an empty record.
        let res = notes.insert_one(Record::from("{not json")).await;
        assert!(matches!(res, Err(RecordMapDbError::DecodeError(_))));

        // A non-object document is no better.
        let res = notes.insert_one(Record::from("[1, 2, 3]")).await;
        assert!(matches!(res, Err(RecordMapDbError::DecodeError(_))));

        // An absent record decodes to "no fields", which an insert cannot
        // use.
        let res = notes.insert_one(Record::Absent).await;
        assert!(matches!(res, Err(RecordMapDbError::ParameterError(_))));

        // Nothing was written along the way.
        let rows = notes
            .select_rows(Record::from(r#"{"Body": "%"}"#))
            .await?;
        assert!(rows.rows.is_empty());

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
