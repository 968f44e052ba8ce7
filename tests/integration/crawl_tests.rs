//! Integration tests for the crawler
//!
//! These tests load real TOML configurations and run complete crawls, over
//! a wiremock listing service or a fixture file.

use feed_harvest::config::{load_config, Config};
use feed_harvest::crawler::run_crawl;
use feed_harvest::output::{load_statistics, read_records};
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a config with the given `[source]` body and loads it
fn create_test_config(dir: &Path, source: &str, chunks: usize, max_posts: usize) -> Config {
    let content = format!(
        r#"
profiles = ["nasa", "natgeo"]

[crawler]
max-posts-per-profile = {max_posts}
chunks-per-profile = {chunks}
worker-count = 2

[throttle]
emit-delay-probability = 0.0
emit-delay-min-ms = 0
emit-delay-max-ms = 0
rate-limit-jitter-min-ms = 0
rate-limit-jitter-max-ms = 0

[source]
{source}

[[source.session]]
name = "alpha"
token = "tok-a"

[[source.session]]
name = "beta"
token = "tok-b"

[output]
path = "{dir}/out/posts.json"
batch-size = 2

[store]
path = "{dir}/store.json"
"#,
        dir = dir.display(),
    );

    let config_path = dir.join("harvest.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    load_config(&config_path).expect("Failed to load config")
}

fn item(id: &str, hour: u32, caption: &str) -> serde_json::Value {
    json!({
        "id": id,
        "typename": "GraphImage",
        "display_url": format!("https://cdn.example.com/{}.jpg", id),
        "likes": 3,
        "comments": 1,
        "caption": caption,
        "taken_at": format!("2024-05-01T{:02}:00:00Z", hour)
    })
}

#[tokio::test]
async fn test_http_crawl_rotates_past_rate_limited_session() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    // Every nasa request made with alpha's session is throttled
    Mock::given(method("GET"))
        .and(path("/profiles/nasa/posts"))
        .and(header("cookie", "sessionid=tok-a"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&mock_server)
        .await;

    // Second page of nasa
    Mock::given(method("GET"))
        .and(path("/profiles/nasa/posts"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [item("n3", 3, "three"), item("n4", 2, "four #moon")],
            "next_cursor": null
        })))
        .mount(&mock_server)
        .await;

    // First page of nasa
    Mock::given(method("GET"))
        .and(path("/profiles/nasa/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                item("n0", 9, "Liftoff! #space #Launch"),
                item("n1", 8, "one"),
                item("n2", 7, "two #space")
            ],
            "next_cursor": "c2"
        })))
        .mount(&mock_server)
        .await;

    // natgeo does not exist
    Mock::given(method("GET"))
        .and(path("/profiles/natgeo/posts"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        dir.path(),
        &format!("base-url = \"{}\"", mock_server.uri()),
        2,
        5,
    );

    let report = run_crawl(&config).await.expect("Crawl failed");

    assert_eq!(report.records, 5);
    assert_eq!(report.chunks_done, 2);
    assert_eq!(report.chunks_exhausted, 0);
    assert_eq!(report.failed_profiles, vec!["natgeo"]);
    assert_eq!(report.sink.records_written, 5);
    assert_eq!(report.sink.flushes, 3);

    let records = read_records(Path::new(&config.output.path)).expect("Failed to read output");
    let mut ids: Vec<&str> = records.iter().map(|r| r.post_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["n0", "n1", "n2", "n3", "n4"]);

    let first = records
        .iter()
        .find(|r| r.post_id == "n0")
        .expect("n0 missing");
    assert_eq!(first.username, "nasa");
    assert_eq!(first.hashtags, vec!["space", "launch"]);
    assert_eq!(first.caption_clean, "Liftoff space Launch");
    assert_eq!(first.timestamp, "2024-05-01 09:00:00");
}

#[tokio::test]
async fn test_fixture_crawl_deduplicates_across_profiles() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let fixture = json!({
        "nasa": [
            item("a1", 1, "#space"),
            item("shared", 2, "collab #space"),
            item("a3", 3, "three"),
            item("a4", 4, "four")
        ],
        "natgeo": [
            item("b1", 1, "#ocean"),
            item("shared", 2, "collab #space"),
            item("b3", 3, "three")
        ]
    });
    let fixture_path = dir.path().join("fixture.json");
    std::fs::write(&fixture_path, fixture.to_string()).expect("Failed to write fixture");

    let config = create_test_config(
        dir.path(),
        &format!("fixture-path = \"{}\"", fixture_path.display()),
        3,
        10,
    );

    let report = run_crawl(&config).await.expect("Crawl failed");
    assert_eq!(report.records, 6);
    assert!(report.failed_profiles.is_empty());

    let output = Path::new(&config.output.path);
    let records = read_records(output).expect("Failed to read output");
    let unique: HashSet<&str> = records.iter().map(|r| r.post_id.as_str()).collect();
    assert_eq!(unique.len(), records.len());
    assert_eq!(records.len(), 6);

    let stats = load_statistics(output).expect("Failed to load statistics");
    assert_eq!(stats.total_records, 6);
    assert_eq!(stats.duplicate_records(), 0);
}

#[tokio::test]
async fn test_corrupted_output_is_replaced() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let fixture = json!({
        "nasa": [item("a1", 1, "one"), item("a2", 2, "two")],
        "natgeo": [item("b1", 1, "one")]
    });
    let fixture_path = dir.path().join("fixture.json");
    std::fs::write(&fixture_path, fixture.to_string()).expect("Failed to write fixture");

    let config = create_test_config(
        dir.path(),
        &format!("fixture-path = \"{}\"", fixture_path.display()),
        1,
        10,
    );

    // Pre-seed the output with something that is not a JSON array
    let output = Path::new(&config.output.path);
    std::fs::create_dir_all(output.parent().expect("output has a parent"))
        .expect("Failed to create output dir");
    std::fs::write(output, "{\"truncated\": [1, 2").expect("Failed to seed output");

    let report = run_crawl(&config).await.expect("Crawl failed");

    assert_eq!(report.records, 3);
    assert_eq!(report.sink.recovered_corruptions, 1);
    assert_eq!(read_records(output).expect("Failed to read output").len(), 3);
}

#[tokio::test]
async fn test_repeated_runs_append_to_output() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let fixture = json!({
        "nasa": [item("a1", 1, "one")],
        "natgeo": [item("b1", 1, "one")]
    });
    let fixture_path = dir.path().join("fixture.json");
    std::fs::write(&fixture_path, fixture.to_string()).expect("Failed to write fixture");

    let config = create_test_config(
        dir.path(),
        &format!("fixture-path = \"{}\"", fixture_path.display()),
        1,
        10,
    );

    run_crawl(&config).await.expect("First crawl failed");
    run_crawl(&config).await.expect("Second crawl failed");

    // The dedup set lives for one run only
    let stats = load_statistics(Path::new(&config.output.path)).expect("Failed to load stats");
    assert_eq!(stats.total_records, 4);
    assert_eq!(stats.duplicate_records(), 2);
}
