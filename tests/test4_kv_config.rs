use std::time::Duration;

use sql_recordmap::{ConfigStore, Database, DatabaseExecutor, PoolTuning, SqlValue};
use tokio::runtime::Runtime;

#[test]
fn config_store_set_get_overwrite_remove() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("cfg.db").to_string_lossy().into_owned();

    rt.block_on(async {
        let tuning = PoolTuning::new()
            .max_size(4)
            .wait_timeout(Duration::from_secs(5));
        let db = Database::new_sqlite_with_tuning(db_path, &tuning).await?;

        let cfg = ConfigStore::attach(&db, "app_config").await;

        // Absent keys read as empty text, same as an empty stored value.
        assert_eq!(cfg.get("missing").await?, "");

        cfg.set("greeting", "hello").await?;
        assert_eq!(cfg.get("greeting").await?, "hello");

        // Overwrite replaces rather than duplicates.
        cfg.set("greeting", "hi").await?;
        cfg.set("greeting", "hey").await?;
        assert_eq!(cfg.get("greeting").await?, "hey");

        let mut conn = db.connection().await?;
        let result_set = conn
            .execute_select(
                "select count(*) as cnt from app_config where property = ?1",
                &[SqlValue::Text("greeting".into())],
            )
            .await?;
        assert_eq!(
            *result_set.rows[0].get("cnt").unwrap().as_int().unwrap(),
            1
        );
        drop(conn);

        cfg.set("empty", "").await?;
        assert_eq!(cfg.get("empty").await?, "");

        cfg.remove("greeting").await?;
        assert_eq!(cfg.get("greeting").await?, "");

        // Attaching again hits the already-created table; the ignored
        // create failure leaves the data alone.
        let cfg_again = ConfigStore::attach(&db, "app_config").await;
        cfg_again.set("greeting", "back").await?;
        assert_eq!(cfg.get("greeting").await?, "back");

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
