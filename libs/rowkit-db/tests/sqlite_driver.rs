#![allow(clippy::unwrap_used, clippy::expect_used)]
#![cfg(feature = "sqlite")]

use rowkit_db::{
    ConnectOpts, DEFAULT_PROFILE, DbConfig, DbEngine, DbError, DbRegistry, DbValue, Driver,
    LockMode, Params, SeaDriver,
};

async fn driver() -> SeaDriver {
    let d = SeaDriver::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .expect("connect");
    d.execute(
        "CREATE TABLE people (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, age INTEGER)",
        &Params::new(),
    )
    .await
    .expect("create table");
    d
}

#[tokio::test]
async fn executes_with_bound_values_and_reads_rows_back() {
    let d = driver().await;

    let outcome = d
        .execute(
            "INSERT INTO {table} (name, age) VALUES (:name, :age)",
            &Params::new()
                .ident("{table}", "people")
                .bind(":name", "ada")
                .bind(":age", 36),
        )
        .await
        .unwrap();
    assert_eq!(outcome.rows_affected, 1);
    assert_eq!(outcome.last_insert_id, Some(1));

    let rows = d
        .query(
            "SELECT * FROM people WHERE age > :age",
            &Params::new().bind(":age", 30),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], serde_json::json!("ada"));
    assert_eq!(rows[0]["age"], serde_json::json!(36));
}

#[tokio::test]
async fn repeated_placeholders_bind_each_occurrence() {
    let d = driver().await;
    for (name, age) in [("ada", 36), ("alan", 41)] {
        d.execute(
            "INSERT INTO people (name, age) VALUES (:name, :age)",
            &Params::new().bind(":name", name).bind(":age", age),
        )
        .await
        .unwrap();
    }

    let rows = d
        .query(
            "SELECT * FROM people WHERE age = :n OR id = :n",
            &Params::new().bind(":n", 36),
        )
        .await
        .unwrap();
    // age = 36 matches ada; id = 36 matches nothing
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn sqlite_does_not_advertise_returning() {
    let d = driver().await;
    assert_eq!(d.engine(), DbEngine::Sqlite);
    assert!(!d.has_returning());
}

#[tokio::test]
async fn storage_failures_carry_the_driver_message() {
    let d = driver().await;
    let err = d
        .query("SELECT * FROM missing_table", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Storage { .. }));
}

#[tokio::test]
async fn escape_quotes_literals() {
    let d = driver().await;
    assert_eq!(d.escape("it's"), "'it''s'");
}

#[tokio::test]
async fn transaction_commit_persists() {
    let d = driver().await;

    assert!(!d.in_transaction());
    d.begin().await.unwrap();
    assert!(d.in_transaction());
    d.execute(
        "INSERT INTO people (name) VALUES (:n)",
        &Params::new().bind(":n", "grace"),
    )
    .await
    .unwrap();
    d.commit().await.unwrap();
    assert!(!d.in_transaction());

    let rows = d.query("SELECT * FROM people", &Params::new()).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn transaction_rollback_discards() {
    let d = driver().await;

    d.begin().await.unwrap();
    d.execute(
        "INSERT INTO people (name) VALUES (:n)",
        &Params::new().bind(":n", "grace"),
    )
    .await
    .unwrap();
    d.rollback().await.unwrap();

    let rows = d.query("SELECT * FROM people", &Params::new()).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn nested_begin_is_refused_without_touching_state() {
    let d = driver().await;

    d.begin().await.unwrap();
    let err = d.begin().await.unwrap_err();
    assert!(matches!(err, DbError::NestedTransaction));
    // the original transaction is still open and committable
    assert!(d.in_transaction());
    d.commit().await.unwrap();
}

#[tokio::test]
async fn commit_without_begin_is_refused() {
    let d = driver().await;
    assert!(matches!(d.commit().await.unwrap_err(), DbError::NoTransaction));
    assert!(matches!(d.rollback().await.unwrap_err(), DbError::NoTransaction));
}

#[tokio::test]
async fn null_binds_store_null() {
    let d = driver().await;
    d.execute(
        "INSERT INTO people (name, age) VALUES (:n, :a)",
        &Params::new().bind(":n", "ada").bind(":a", DbValue::Null),
    )
    .await
    .unwrap();

    let rows = d
        .query("SELECT * FROM people WHERE age IS NULL", &Params::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn registry_rejects_duplicate_and_unknown_profiles() {
    let mut registry = DbRegistry::new();
    registry.connect(DEFAULT_PROFILE, "sqlite::memory:").await.unwrap();

    let err = registry
        .connect(DEFAULT_PROFILE, "sqlite::memory:")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::DuplicateProfile(_)));

    assert!(registry.driver_or_err(DEFAULT_PROFILE).is_ok());
    assert!(matches!(
        registry.driver_or_err("reporting"),
        Err(DbError::UnknownProfile(_))
    ));
}

#[tokio::test]
async fn registry_builds_from_config() {
    let figment = figment::Figment::new().merge(figment::providers::Serialized::defaults(
        serde_json::json!({
            "db": {
                "profiles": {
                    "default": { "dsn": "sqlite::memory:" },
                    "reporting": { "dsn": "sqlite::memory:", "acquire_timeout": "5s" }
                }
            }
        }),
    ));
    let cfg = DbConfig::from_figment(&figment).unwrap();
    let registry = DbRegistry::from_config(&cfg).await.unwrap();

    let mut profiles: Vec<_> = registry.profiles().collect();
    profiles.sort_unstable();
    assert_eq!(profiles, vec!["default", "reporting"]);
}

#[tokio::test]
async fn file_backed_database_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = format!("sqlite://{}/app.db?mode=rwc", dir.path().display());

    {
        let d = SeaDriver::connect(&dsn, ConnectOpts::default()).await.unwrap();
        d.execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)", &Params::new())
            .await
            .unwrap();
        d.execute(
            "INSERT INTO notes (body) VALUES (:b)",
            &Params::new().bind(":b", "kept"),
        )
        .await
        .unwrap();
    }

    let d = SeaDriver::connect(&dsn, ConnectOpts::default()).await.unwrap();
    let rows = d.query("SELECT * FROM notes", &Params::new()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["body"], serde_json::json!("kept"));
}

#[tokio::test]
async fn table_locks_are_session_noops_on_sqlite() {
    // the enclosing transaction locks the whole file on sqlite; the
    // primitives still exist so callers can stay engine-agnostic
    let d = driver().await;
    d.lock_tables(&[("people", LockMode::Write)]).await.unwrap();
    d.unlock_tables().await.unwrap();
}

