//! End-to-end traversal tests
//!
//! Each test mounts a small follower graph on a mock server, runs the full
//! stack (client, broker, engine, driver, SQLite store), and checks which
//! follows were issued and recorded.

use follow_ripple::broker::{Broker, RetryPolicy, TokioSleeper};
use follow_ripple::config::{load_config, Config};
use follow_ripple::storage::{DedupStore, SqliteStore};
use follow_ripple::{Driver, GithubClient, TraversalEngine};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts the rate limit, identity and seed listing endpoints
async fn mount_account(server: &MockServer, me: &str, following: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": { "core": { "limit": 5000, "remaining": 4990, "reset": 1700000000 } }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "login": me })))
        .mount(server)
        .await;

    mount_listing(server, &format!("/users/{}/following", me), following).await;
}

async fn mount_listing(server: &MockServer, route: &str, logins: &[&str]) {
    let body: Vec<_> = logins.iter().map(|l| json!({ "login": l })).collect();
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_follow(server: &MockServer, login: &str, expected: u64) {
    Mock::given(method("PUT"))
        .and(path(format!("/user/following/{}", login)))
        .respond_with(ResponseTemplate::new(204))
        .expect(expected)
        .mount(server)
        .await;
}

/// Writes a config pointing at the mock server and a temp database
fn write_config(dir: &tempfile::TempDir, server: &MockServer) -> Config {
    let db_path = dir.path().join("followed.db");
    let content = format!(
        r#"
[api]
base-url = "{}"
token-env = "FOLLOW_RIPPLE_IT_TOKEN"
request-timeout = 5

[traversal]
workers = 2

[storage]
database-path = "{}"
"#,
        server.uri(),
        db_path.display()
    );

    let config_path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    load_config(&config_path).expect("Failed to load config")
}

fn build_driver(config: &Config, policy: RetryPolicy, store: Arc<dyn DedupStore>) -> Driver {
    let api = GithubClient::new(&config.api, "it-token").expect("Failed to build client");
    let broker = Broker::new(api, policy, TokioSleeper).spawn();
    let engine = TraversalEngine::start(broker.clone(), store, config.traversal.worker_count());
    Driver::new(broker, engine)
}

#[tokio::test]
async fn test_iteration_follows_only_new_followers() {
    let server = MockServer::start().await;
    mount_account(&server, "alice", &["bob"]).await;
    mount_listing(&server, "/users/bob/followers", &["carol", "dave"]).await;
    mount_follow(&server, "dave", 1).await;
    mount_follow(&server, "carol", 0).await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);
    let store = Arc::new(
        SqliteStore::open(std::path::Path::new(&config.storage.database_path))
            .expect("Failed to open DB"),
    );
    store.record("carol").unwrap();

    let driver = build_driver(&config, RetryPolicy::default(), store.clone());
    let report = driver.run_iteration(1).await.expect("Iteration failed");

    assert_eq!(report.account, "alice");
    assert_eq!(report.batch.followed, 1);
    assert_eq!(report.batch.skipped, 1);
    assert!(store.contains("dave").unwrap());
    assert_eq!(store.count().unwrap(), 2);
}

#[tokio::test]
async fn test_requests_carry_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .and(header("authorization", "Bearer it-token"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": { "core": { "remaining": 10, "reset": 1700000000 } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "login": "alice" })))
        .mount(&server)
        .await;
    mount_listing(&server, "/users/alice/following", &[]).await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());

    let driver = build_driver(&config, RetryPolicy::default(), store);
    let report = driver.run_iteration(1).await.expect("Iteration failed");

    assert_eq!(report.batch.subjects, 0);
}

#[tokio::test]
async fn test_throttled_follow_is_retried_and_recorded_once() {
    let server = MockServer::start().await;
    mount_account(&server, "alice", &["bob"]).await;
    mount_listing(&server, "/users/bob/followers", &["erin"]).await;

    // First attempt is throttled, the retry succeeds
    Mock::given(method("PUT"))
        .and(path("/user/following/erin"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_follow(&server, "erin", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());

    let driver = build_driver(&config, RetryPolicy::default(), store.clone());
    let report = driver.run_iteration(1).await.expect("Iteration failed");

    assert_eq!(report.batch.followed, 1);
    assert_eq!(store.count().unwrap(), 1);
    assert!(store.contains("erin").unwrap());
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    mount_account(&server, "alice", &["bob"]).await;

    Mock::given(method("GET"))
        .and(path("/users/bob/followers"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_listing(&server, "/users/bob/followers", &["dave"]).await;
    mount_follow(&server, "dave", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let policy = RetryPolicy {
        failure_backoff: Duration::from_millis(10),
        ..RetryPolicy::default()
    };

    let driver = build_driver(&config, policy, store.clone());
    let report = driver.run_iteration(1).await.expect("Iteration failed");

    assert_eq!(report.batch.followed, 1);
    assert!(store.contains("dave").unwrap());
}

#[tokio::test]
async fn test_second_iteration_skips_everything_followed() {
    let server = MockServer::start().await;
    mount_account(&server, "alice", &["bob", "ann"]).await;
    mount_listing(&server, "/users/bob/followers", &["frank", "gus"]).await;
    mount_listing(&server, "/users/ann/followers", &["frank"]).await;
    mount_follow(&server, "gus", 1).await;

    // frank is shared by two subjects; a duplicate follow call is tolerated
    Mock::given(method("PUT"))
        .and(path("/user/following/frank"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());

    let driver = build_driver(&config, RetryPolicy::default(), store.clone());
    driver.run(Some(2)).await.expect("Run failed");

    assert_eq!(store.count().unwrap(), 2);
    assert!(store.contains("frank").unwrap());
    assert!(store.contains("gus").unwrap());
}
