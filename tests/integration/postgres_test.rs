//! PostgreSQL integration tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable to run them.

use futures::StreamExt;
use serde_json::json;
use sqlfeed::config::Config;
use sqlfeed::db::{self, DatabaseClient};
use sqlfeed::query::QueryExecutor;

/// Helper to create a test client; None skips the test.
fn get_test_client() -> Option<Box<dyn DatabaseClient>> {
    let url = std::env::var("DATABASE_URL").ok()?;
    if !url.starts_with("postgres") {
        return None;
    }
    db::connect(&Config::new(url, 500, false)).ok()
}

#[tokio::test]
async fn test_bounded_query() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = QueryExecutor::new(client.as_ref(), 500);

    let result = executor
        .run_bounded("select x as n from generate_series(1, 10) g(x)", 3)
        .await;

    assert!(result.success);
    assert_eq!(result.total, Some(10));
    assert_eq!(
        result.rows,
        Some(vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]])
    );

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_bounded_query_failure_is_reported_not_raised() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = QueryExecutor::new(client.as_ref(), 500);

    let result = executor.run_bounded("selct 1", 10).await;

    assert!(!result.success);
    let error = result.error.unwrap().to_lowercase();
    assert!(error.contains("syntax"), "unexpected error: {error}");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_value_normalization() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = QueryExecutor::new(client.as_ref(), 500);

    let result = executor
        .run_bounded(
            "select 1.5::numeric as amount, date '2024-03-09' as day, \
             timestamp '2024-03-09 10:30:00' as at, array['a', 'b'] as tags",
            10,
        )
        .await;

    assert!(result.success);
    assert_eq!(
        result.rows,
        Some(vec![vec![
            json!(1.5),
            json!("2024-03-09"),
            json!("2024-03-09T10:30:00"),
            json!(["a", "b"]),
        ]])
    );

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_streaming_with_formatters() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = QueryExecutor::new(client.as_ref(), 500);

    let mut stream = executor.stream(
        "select x as n, x % 2 as odd from generate_series(1, 4) g(x)",
        &["n:number", "odd:yesno"],
    );

    let mut rows = Vec::new();
    while let Some(row) = stream.next().await {
        rows.push(row.unwrap());
    }

    assert_eq!(
        rows,
        vec![
            vec![json!("n"), json!("odd")],
            vec![json!("1"), json!("Yes")],
            vec![json!("2"), json!("No")],
            vec![json!("3"), json!("Yes")],
            vec![json!("4"), json!("No")],
        ]
    );

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_streaming_comma_separated_arrays() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = QueryExecutor::new(client.as_ref(), 500);

    let mut stream = executor.stream(
        "select array['a', 'b', 'c'] as tags",
        &["tags:comma-separated"],
    );

    let headers = stream.next().await.unwrap().unwrap();
    assert_eq!(headers, vec![json!("tags")]);

    let row = stream.next().await.unwrap().unwrap();
    assert_eq!(row, vec![json!("a,b,c")]);

    client.close().await.unwrap();
}
