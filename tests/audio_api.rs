//! End-to-end tests for the audio artifact endpoint and the admin cache
//! surface, driving the real router without a running server.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use podproxy::app::create_app;
use podproxy::config::settings::AppConfig;
use podproxy::infrastructure::upstream::MediaLink;
use podproxy::state::AppState;

fn test_config(dir: &Path) -> AppConfig {
    AppConfig {
        server_port: 0,
        audio_dir: dir.to_path_buf(),
        upstream_api_base: "http://upstream.invalid".to_string(),
        upstream_api_key: None,
        convert_period_ms: 1000,
        cleanup_period_secs: 600,
        audio_expiration_secs: 259_200,
        cleanup_start_free_bytes: 0,
        cleanup_stop_free_bytes: 0,
        transcode_pool_size: 2,
        unavailable_ttl_secs: 21_600,
        media_link_fallback_ttl_secs: 3600,
        channel_name_ttl_secs: 86_400,
        // Tests must not hang: give up on conversions after two seconds.
        audio_wait_timeout_secs: 2,
        autoload_newest_audio: true,
    }
}

fn test_state(dir: &Path) -> AppState {
    let state = AppState::new(test_config(dir));
    state.artifacts.prepare().unwrap();
    state
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_range(uri: &str, range: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::RANGE, range)
        .body(Body::empty())
        .unwrap()
}

fn header_str<'a>(response: &'a axum::response::Response, name: header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|value| value.to_str().ok())
}

/// Completes the pending conversion for `id` from outside: waits for the
/// job to appear, writes the artifact, and clears the queue entry the way
/// the worker would.
fn finish_conversion(state: AppState, id: &'static str, content: Option<Vec<u8>>) {
    tokio::spawn(async move {
        while !state.queue.contains(id) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        if let Some(content) = content {
            // Same commit dance as the worker: temp write, then rename.
            let temp = state.artifacts.temp_path(id);
            tokio::fs::write(&temp, &content).await.unwrap();
            tokio::fs::rename(&temp, state.artifacts.path(id))
                .await
                .unwrap();
        }
        assert_eq!(state.queue.len(), 1, "a duplicate job was created");
        state.queue.remove(id);
    });
}

#[tokio::test]
async fn ready_artifact_is_served_without_a_new_job() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    std::fs::write(state.artifacts.path("vid1"), vec![7u8; 1000]).unwrap();
    let app = create_app(state.clone()).await;

    let response = app.oneshot(get("/audio/vid1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::ACCEPT_RANGES), Some("bytes"));
    assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("audio/mpeg"));
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("1000"));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 1000);
    // serving a cached artifact never touches the queue
    assert!(state.queue.is_empty());
}

#[tokio::test]
async fn open_ended_range_from_zero_is_a_plain_200() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    std::fs::write(state.artifacts.path("vid1"), vec![7u8; 1000]).unwrap();
    let app = create_app(state).await;

    let response = app
        .oneshot(get_with_range("/audio/vid1", "bytes=0-"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("1000"));
    assert!(response.headers().get(header::CONTENT_RANGE).is_none());
}

#[tokio::test]
async fn prefix_range_is_partial_content() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    let content: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(state.artifacts.path("vid1"), &content).unwrap();
    let app = create_app(state).await;

    let response = app
        .oneshot(get_with_range("/audio/vid1", "bytes=0-99"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("100"));
    assert_eq!(
        header_str(&response, header::CONTENT_RANGE),
        Some("bytes 0-99/1000")
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], &content[..100]);
}

#[tokio::test]
async fn range_starting_at_file_size_is_unsatisfiable() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    std::fs::write(state.artifacts.path("vid1"), vec![7u8; 1000]).unwrap();
    let app = create_app(state).await;

    for range in ["bytes=1000-", "bytes=1005-1010"] {
        let response = app
            .clone()
            .oneshot(get_with_range("/audio/vid1", range))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE, "{range}");
        assert_eq!(
            header_str(&response, header::CONTENT_RANGE),
            Some("bytes */1000")
        );
    }
}

#[tokio::test]
async fn malformed_range_header_is_ignored() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    std::fs::write(state.artifacts.path("vid1"), vec![7u8; 1000]).unwrap();
    let app = create_app(state).await;

    let response = app
        .oneshot(get_with_range("/audio/vid1", "bytes=half-full"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("1000"));
}

#[tokio::test]
async fn head_reports_state_without_enqueuing() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    std::fs::write(state.artifacts.path("here"), vec![7u8; 123]).unwrap();
    let app = create_app(state.clone()).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::HEAD)
                .uri("/audio/here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("123"));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::HEAD)
                .uri("/audio/absent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(state.queue.is_empty());
}

#[tokio::test]
async fn unavailable_marker_short_circuits_to_422() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    state.caches.media_links.put(
        "gone".to_string(),
        MediaLink::Unavailable,
        Duration::from_secs(60),
    );
    let app = create_app(state.clone()).await;

    let response = app.oneshot(get("/audio/gone")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    // fail-fast: no conversion was started
    assert!(state.queue.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn expired_marker_triggers_a_fresh_attempt() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    state.caches.media_links.put_until(
        "gone".to_string(),
        MediaLink::Unavailable,
        time::OffsetDateTime::now_utc() - Duration::from_secs(1),
    );
    let app = create_app(state.clone()).await;

    // The marker has lapsed, so the request enqueues a conversion and waits
    // until the configured timeout.
    let response = app.oneshot(get("/audio/gone")).await.unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(state.queue.contains("gone"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_conversion_without_a_verdict_is_a_404() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    let app = create_app(state.clone()).await;

    finish_conversion(state.clone(), "flaky", None);

    let response = app.oneshot(get("/audio/flaky")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    // nothing blocks the next request from retrying
    assert!(state.queue.is_empty());
    assert!(state.caches.media_links.get(&"flaky".to_string()).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn waiting_requests_are_served_when_the_conversion_lands() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    let app = create_app(state.clone()).await;

    let content = vec![42u8; 5000];
    finish_conversion(state.clone(), "fresh", Some(content.clone()));

    // Two subscribers ask for the same episode mid-conversion.
    let (first, second) = tokio::join!(
        app.clone().oneshot(get("/audio/fresh")),
        app.clone().oneshot(get("/audio/fresh")),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header_str(&first, header::CONTENT_LENGTH), Some("5000"));
    let first_body = to_bytes(first.into_body(), usize::MAX).await.unwrap();
    let second_body = to_bytes(second.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&first_body[..], &content[..]);
    assert_eq!(first_body, second_body);
    assert!(state.queue.is_empty());
}

#[tokio::test]
async fn cache_clear_reports_surviving_entries() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    state.caches.channel_feeds.put(
        "chan1/audio".to_string(),
        "<rss/>".to_string(),
        Duration::from_secs(3600),
    );
    state.caches.channel_names.put(
        "somebody".to_string(),
        "chan1".to_string(),
        Duration::from_secs(3600),
    );
    std::fs::write(state.artifacts.path("keep"), b"xx").unwrap();
    std::fs::write(state.artifacts.path("drop"), b"yy").unwrap();
    let app = create_app(state.clone()).await;

    let response = app
        .oneshot(get("/cache?channel_feeds=ALL&audio_files=drop.mp3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let view = &json["data"];
    assert_eq!(view["cleared"]["channel_feeds"], 1);
    assert_eq!(view["cleared"]["audio_files"], 1);
    assert_eq!(view["cleared"]["channel_names"], 0);
    assert_eq!(view["channel_feeds"].as_array().unwrap().len(), 0);
    assert_eq!(view["channel_names"][0], "somebody");
    let files = view["audio_files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "keep.mp3");
    assert!(!state.artifacts.path("drop").exists());
}

#[tokio::test]
async fn cache_clear_rejects_path_like_artifact_keys() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    let app = create_app(state).await;

    let response = app
        .oneshot(get("/cache?audio_files=../etc/passwd"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_endpoint_answers() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path());
    let app = create_app(state).await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
}
