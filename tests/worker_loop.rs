//! Drives the background drain loop against real (failing) upstreams and
//! checks the cleanup guarantees: jobs are always consumed, pool slots
//! always come back, and only permanent failures leave a marker behind.

use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

use podproxy::config::settings::AppConfig;
use podproxy::infrastructure::upstream::MediaLink;
use podproxy::state::AppState;
use podproxy::workers::transcoder;

fn test_state(dir: &Path, upstream_base: &str) -> AppState {
    let state = AppState::new(AppConfig {
        server_port: 0,
        audio_dir: dir.to_path_buf(),
        upstream_api_base: upstream_base.to_string(),
        upstream_api_key: None,
        // drain fast so the tests finish quickly
        convert_period_ms: 20,
        cleanup_period_secs: 600,
        audio_expiration_secs: 259_200,
        cleanup_start_free_bytes: 0,
        cleanup_stop_free_bytes: 0,
        transcode_pool_size: 2,
        unavailable_ttl_secs: 21_600,
        media_link_fallback_ttl_secs: 3600,
        channel_name_ttl_secs: 86_400,
        audio_wait_timeout_secs: 2,
        autoload_newest_audio: true,
    });
    state.artifacts.prepare().unwrap();
    state
}

async fn drain_queue(state: &AppState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !state.queue.is_empty() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "queue never drained"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transient_failures_drain_the_queue_and_release_the_pool() {
    let tmp = TempDir::new().unwrap();
    // Nothing listens here, so every resolution fails with a network error.
    let state = test_state(tmp.path(), "http://127.0.0.1:1");

    for id in ["a", "b", "c", "d"] {
        state.queue.enqueue(id);
    }
    let drain = tokio::spawn(transcoder::run(state.clone()));
    drain_queue(&state).await;
    drain.abort();

    // A network error is no verdict: nothing is marked unavailable, no
    // artifact appears, and the ids stay eligible for a retry.
    for id in ["a", "b", "c", "d"] {
        assert!(state.caches.media_links.get(&id.to_string()).is_none());
        assert!(!state.artifacts.exists(id).await);
    }

    // Every admitted job hands its pool slot back.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while state.transcodes.available_permits() < 2 {
        assert!(tokio::time::Instant::now() < deadline, "pool slot leaked");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn removed_content_is_marked_unavailable() {
    // An upstream that answers 404 for every manifest lookup.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let upstream = axum::Router::new()
        .fallback(|| async { axum::http::StatusCode::NOT_FOUND });
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let tmp = TempDir::new().unwrap();
    let state = test_state(tmp.path(), &base);
    state.queue.enqueue("gone");

    let drain = tokio::spawn(transcoder::run(state.clone()));
    drain_queue(&state).await;
    drain.abort();

    assert!(matches!(
        state.caches.media_links.get(&"gone".to_string()),
        Some(MediaLink::Unavailable)
    ));
    assert!(!state.artifacts.exists("gone").await);
}
