use serde::{Deserialize, Serialize};
use sql_recordmap::{Database, DatabaseExecutor, Record, RecordMapDbError};
use tokio::runtime::Runtime;

#[derive(Serialize)]
struct NewPlayer {
    #[serde(rename = "PlayerID")]
    player_id: i64,
    #[serde(rename = "FirstName")]
    first_name: String,
    #[serde(rename = "Score")]
    score: f64,
    #[serde(rename = "Active")]
    active: bool,
}

// Destination shapes match the encoded mapping (driver column names);
// nothing converts them back through the normalizer.
#[derive(Debug, Deserialize, PartialEq)]
struct PlayerRow {
    player_id: i64,
    first_name: String,
    score: f64,
    active: i64,
}

#[test]
fn sqlite_insert_update_delete_select() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("test1.db").to_string_lossy().into_owned();

    rt.block_on(async {
        let db = Database::new_sqlite(db_path).await?;

        let mut conn = db.connection().await?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS player (
                player_id INTEGER PRIMARY KEY,
                first_name TEXT,
                score REAL,
                active BOOLEAN
            );",
        )
        .await?;
        drop(conn);

        let players = db.table("player");

        // Structured record: public field names feed the normalizer.
        players
            .insert_one(Record::from_serialize(&NewPlayer {
                player_id: 1,
                first_name: "Ann".into(),
                score: 10.5,
                active: true,
            })?)
            .await?;

        // Encoded document text works the same way.
        players
            .insert_one(Record::from(
                r#"{"PlayerID": 2, "FirstName": "Annika", "Score": 7.25, "Active": false}"#,
            ))
            .await?;

        // Equality predicate on a normalized column.
        let found: Vec<PlayerRow> = players
            .select(Record::from(r#"{"FirstName": "Ann"}"#))
            .await?;
        assert_eq!(
            found,
            vec![PlayerRow {
                player_id: 1,
                first_name: "Ann".into(),
                score: 10.5,
                active: 1,
            }]
        );

        // Leading-wildcard text becomes a LIKE predicate; both rows match.
        let found: Vec<PlayerRow> = players
            .select(Record::from(r#"{"FirstName": "%nn%"}"#))
            .await?;
        assert_eq!(found.len(), 2);

        // Null-valued filter fields are skipped, not matched as NULL.
        let found: Vec<PlayerRow> = players
            .select(Record::from(r#"{"FirstName": "Annika", "Score": null}"#))
            .await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].player_id, 2);

        // Update keyed on the raw field name; key column stays out of SET.
        players
            .update_one(
                "PlayerID",
                Record::from(r#"{"PlayerID": 2, "FirstName": "Beth", "Score": 9.0}"#),
            )
            .await?;
        let found: Vec<PlayerRow> = players.select(Record::from(r#"{"PlayerID": 2}"#)).await?;
        assert_eq!(found[0].first_name, "Beth");
        assert_eq!(found[0].score, 9.0);

        // Delete with a predicate reports rows affected.
        let removed = players.delete(Record::from(r#"{"FirstName": "Beth"}"#)).await?;
        assert_eq!(removed, 1);

        // An all-null predicate record means "affect every row" and is
        // refused unless the table opted in.
        let res = players.delete(Record::from(r#"{"FirstName": null}"#)).await;
        assert!(matches!(
            res,
            Err(RecordMapDbError::FullTableDisabled {
                operation: "delete",
                ..
            })
        ));
        let res: Result<Vec<PlayerRow>, _> = players.select(Record::Absent).await;
        assert!(matches!(
            res,
            Err(RecordMapDbError::FullTableDisabled {
                operation: "select",
                ..
            })
        ));

        // With the opt-in, the statement runs with no WHERE clause at all.
        let wide_open = db.table("player").with_full_table_ops(true);
        let all: Vec<PlayerRow> = wide_open.select(Record::Absent).await?;
        assert_eq!(all.len(), 1);
        let removed = wide_open.delete(Record::Absent).await?;
        assert_eq!(removed, 1);
        let all: Vec<PlayerRow> = wide_open.select(Record::Absent).await?;
        assert!(all.is_empty());

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}

#[test]
fn sqlite_normalization_can_be_disabled() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("raw.db").to_string_lossy().into_owned();

    rt.block_on(async {
        let db = Database::new_sqlite(db_path).await?;

        let mut conn = db.connection().await?;
        conn.execute_batch("CREATE TABLE widget (WidgetID INTEGER, Label TEXT);")
            .await?;
        drop(conn);

        let widgets = db.table("widget").with_field_normalization(false);
        widgets
            .insert_one(Record::from(r#"{"WidgetID": 3, "Label": "gear"}"#))
            .await?;

        let rows = widgets
            .select_rows(Record::from(r#"{"WidgetID": 3}"#))
            .await?;
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(
            rows.rows[0].get("Label").unwrap().as_text().unwrap(),
            "gear"
        );

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
