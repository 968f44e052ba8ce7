//! Integration tests for the HTTP API

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use feed_harvest::api::{router, AppState};
use feed_harvest::config::load_config;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = router(state.clone())
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    (
        status,
        serde_json::from_slice(&bytes).expect("Body is not JSON"),
    )
}

#[tokio::test]
async fn test_get_data_from_configured_fixture() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let posts: Vec<Value> = (0..8)
        .map(|i| {
            json!({
                "id": format!("v{}", i),
                "typename": "GraphVideo",
                "is_video": true,
                "display_url": format!("https://cdn.example.com/v{}.mp4", i),
                "likes": 10,
                "comments": 2,
                "video_view_count": 100 + i,
                "location_name": "Houston",
                "taken_at": format!("2024-02-0{}T12:00:00Z", i + 1)
            })
        })
        .collect();
    let fixture_path = dir.path().join("fixture.json");
    std::fs::write(&fixture_path, json!({ "nasa": posts }).to_string())
        .expect("Failed to write fixture");

    let config_path = dir.path().join("harvest.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[crawler]
max-posts-per-profile = 100
chunks-per-profile = 3
worker-count = 1

[throttle]
emit-delay-probability = 0.0
emit-delay-min-ms = 0
emit-delay-max-ms = 0
rate-limit-jitter-min-ms = 0
rate-limit-jitter-max-ms = 0

[source]
fixture-path = "{fixture}"

[[source.session]]
name = "alpha"

[[source.session]]
name = "beta"

[output]
path = "{dir}/posts.json"

[store]
path = "{dir}/store/posts.json"
scratch-dir = "{dir}/live_data"
"#,
            fixture = fixture_path.display(),
            dir = dir.path().display(),
        ),
    )
    .expect("Failed to write config");

    let config = load_config(&config_path).expect("Failed to load config");
    let state = Arc::new(AppState::from_config(&config).expect("Failed to build state"));

    let (status, body) = get(&state, "/api/v1/getData?username=nasa&count=5").await;
    assert_eq!(status, StatusCode::OK);

    let items = body.as_array().expect("Expected an array");
    assert_eq!(items.len(), 5);
    for item in items {
        assert_eq!(item["kind"], "Video");
        assert_eq!(item["location"], "Houston");
        assert_eq!(item["$vectorize"], "nasa");
    }

    // Newest posts come first in the listing, so the crawl picked v7..v3
    let mut ids: Vec<&str> = items
        .iter()
        .map(|item| item["post_id"].as_str().expect("post_id is a string"))
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["v3", "v4", "v5", "v6", "v7"]);

    // The configured crawl output is untouched; only the store received posts
    assert!(!dir.path().join("posts.json").exists());
    assert!(dir.path().join("store/posts.json").is_file());

    let (status, body) = get(&state, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
