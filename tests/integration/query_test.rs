//! Bounded query execution integration tests.
//!
//! These run hermetically against temporary SQLite databases and exercise
//! the full path: connection string to client, executor on top, JSON out
//! the other side.

use std::path::Path;
use std::str::FromStr;

use pretty_assertions::assert_eq;
use serde_json::json;
use sqlfeed::config::Config;
use sqlfeed::db;
use sqlfeed::query::QueryExecutor;
use sqlx::Connection;

/// Creates and seeds an orders table in the database file at `path`.
async fn seed_database(path: &Path) {
    let url = format!("sqlite:{}?mode=rwc", path.display());
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .unwrap();

    sqlx::query(
        "create table orders (
            id integer primary key,
            customer text,
            total real,
            paid integer,
            placed_on text
        )",
    )
    .execute(&pool)
    .await
    .unwrap();

    let fixtures: [(i64, &str, f64, i64, &str); 5] = [
        (1, "alice", 9.99, 1, "2024-03-09"),
        (2, "bob", 150.0, 0, "2024-03-10"),
        (3, "carol", 75.5, 1, "2024-03-11"),
        (4, "dave", 12.25, 0, "2024-03-12"),
        (5, "erin", 99.0, 1, "2024-03-13"),
    ];
    for (id, customer, total, paid, placed_on) in fixtures {
        sqlx::query("insert into orders values (?, ?, ?, ?, ?)")
            .bind(id)
            .bind(customer)
            .bind(total)
            .bind(paid)
            .bind(placed_on)
            .execute(&pool)
            .await
            .unwrap();
    }

    pool.close().await;
}

/// Seeds a fresh database and connects a client to it. The tempdir must
/// outlive the client.
async fn seeded_client(dir: &tempfile::TempDir) -> Box<dyn db::DatabaseClient> {
    let path = dir.path().join("orders.db");
    seed_database(&path).await;

    let config = Config::new(format!("sqlite:{}", path.display()), 500, false);
    db::connect(&config).unwrap()
}

#[tokio::test]
async fn test_bounded_query_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let client = seeded_client(&dir).await;
    let executor = QueryExecutor::new(client.as_ref(), 500);

    let result = executor
        .run_bounded("select customer, total from orders order by id", 3)
        .await;

    assert!(result.success);
    assert_eq!(result.total, Some(5));
    assert_eq!(
        result.rows,
        Some(vec![
            vec![json!("alice"), json!(9.99)],
            vec![json!("bob"), json!(150.0)],
            vec![json!("carol"), json!(75.5)],
        ])
    );
    assert_eq!(result.error, None);
}

#[tokio::test]
async fn test_bounded_select_one() {
    let dir = tempfile::tempdir().unwrap();
    let client = seeded_client(&dir).await;
    let executor = QueryExecutor::new(client.as_ref(), 100);

    let result = executor.run_bounded("select 1 as n", 10).await;

    assert!(result.success);
    assert_eq!(result.total, Some(1));
    assert_eq!(result.rows, Some(vec![vec![json!(1)]]));
}

#[tokio::test]
async fn test_bounded_query_clamped_by_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let client = seeded_client(&dir).await;
    let executor = QueryExecutor::new(client.as_ref(), 2);

    let result = executor
        .run_bounded("select id from orders order by id", 100)
        .await;

    assert_eq!(result.total, Some(5));
    assert_eq!(result.rows, Some(vec![vec![json!(1)], vec![json!(2)]]));
}

#[tokio::test]
async fn test_bounded_query_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let client = seeded_client(&dir).await;
    let executor = QueryExecutor::new(client.as_ref(), 500);

    let result = executor
        .run_bounded("select customer from orders where 1 = 0", 10)
        .await;

    assert!(result.success);
    assert_eq!(result.total, Some(0));
    assert_eq!(result.rows, Some(vec![]));
}

#[tokio::test]
async fn test_bounded_query_failure_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let client = seeded_client(&dir).await;
    let executor = QueryExecutor::new(client.as_ref(), 500);

    let result = executor
        .run_bounded("select * from missing_table", 10)
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("missing_table"));
    assert_eq!(result.total, None);
    assert_eq!(result.rows, None);
}

#[tokio::test]
async fn test_shared_memory_database() {
    let url = "sqlite://file:sqlfeed_shared_test?mode=memory&cache=shared";

    // Keeper connection holds the shared in-memory database alive while the
    // pooled client attaches to it.
    let options = sqlx::sqlite::SqliteConnectOptions::from_str(url).unwrap();
    let mut keeper = sqlx::SqliteConnection::connect_with(&options).await.unwrap();
    sqlx::query("create table t (n integer)")
        .execute(&mut keeper)
        .await
        .unwrap();
    sqlx::query("insert into t values (1), (2), (3)")
        .execute(&mut keeper)
        .await
        .unwrap();

    let config = Config::new(url, 500, false);
    let client = db::connect(&config).unwrap();
    let executor = QueryExecutor::new(client.as_ref(), 500);

    let result = executor.run_bounded("select n from t order by n", 2).await;
    assert!(result.success);
    assert_eq!(result.total, Some(3));
    assert_eq!(result.rows, Some(vec![vec![json!(1)], vec![json!(2)]]));

    keeper.close().await.unwrap();
}
