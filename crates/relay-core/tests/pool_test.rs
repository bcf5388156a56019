//! Integration tests for `SessionPool`: configuration-keyed reuse and
//! lifecycle control.

#![cfg(unix)]

use std::time::Duration;

use relay_core::worker::SessionPool;
use relay_test_utils as workers;

const TURN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn identical_configs_reuse_one_process() {
    let (_dir, config) = workers::end_marker_worker();
    let pool = SessionPool::new();

    let first = pool
        .prompt(&config, "one", TURN_TIMEOUT, None)
        .await
        .unwrap();
    assert!(first.stdout.contains("\"turn\":1"), "got: {}", first.stdout);

    let second = pool
        .prompt(&config, "two", TURN_TIMEOUT, None)
        .await
        .unwrap();
    assert!(
        second.stdout.contains("\"turn\":2"),
        "expected the same process to keep counting, got: {}",
        second.stdout
    );

    pool.reset().await;
}

#[tokio::test]
async fn changed_args_dispose_and_respawn() {
    let (_dir, config) = workers::end_marker_worker();
    let pool = SessionPool::new();

    let first = pool
        .prompt(&config, "one", TURN_TIMEOUT, None)
        .await
        .unwrap();
    assert!(first.stdout.contains("\"turn\":1"));

    // Same script, different argument list: different identity key.
    let other = config.clone().with_args(["--variant"]);
    let second = pool
        .prompt(&other, "two", TURN_TIMEOUT, None)
        .await
        .unwrap();
    assert!(
        second.stdout.contains("\"turn\":1"),
        "expected a fresh process counting from 1, got: {}",
        second.stdout
    );

    pool.reset().await;
}

#[tokio::test]
async fn changed_working_dir_disposes_and_respawns() {
    let (_dir, config) = workers::end_marker_worker();
    let workdir = tempfile::TempDir::new().unwrap();
    let pool = SessionPool::new();

    let first = pool
        .prompt(&config, "one", TURN_TIMEOUT, None)
        .await
        .unwrap();
    assert!(first.stdout.contains("\"turn\":1"));

    let other = config.clone().with_working_dir(workdir.path());
    let second = pool
        .prompt(&other, "two", TURN_TIMEOUT, None)
        .await
        .unwrap();
    assert!(
        second.stdout.contains("\"turn\":1"),
        "expected a fresh process counting from 1, got: {}",
        second.stdout
    );

    pool.reset().await;
}

#[tokio::test]
async fn reset_discards_the_live_worker() {
    let (_dir, config) = workers::end_marker_worker();
    let pool = SessionPool::new();

    let first = pool
        .prompt(&config, "one", TURN_TIMEOUT, None)
        .await
        .unwrap();
    assert!(first.stdout.contains("\"turn\":1"));

    pool.reset().await;

    let second = pool
        .prompt(&config, "two", TURN_TIMEOUT, None)
        .await
        .unwrap();
    assert!(
        second.stdout.contains("\"turn\":1"),
        "expected a fresh process after reset, got: {}",
        second.stdout
    );

    pool.reset().await;
}

#[tokio::test]
async fn pool_survives_a_timed_out_turn() {
    let (_dir, silent_config) = workers::silent_worker();
    let (_dir2, live_config) = workers::end_marker_worker();
    let pool = SessionPool::new();

    let err = pool
        .prompt(&silent_config, "one", Duration::from_millis(50), None)
        .await
        .unwrap_err();
    assert!(err.is_retriable(), "got: {err}");

    // A different configuration after the timeout works normally.
    let output = pool
        .prompt(&live_config, "two", TURN_TIMEOUT, None)
        .await
        .unwrap();
    assert!(output.stdout.contains("\"turn\":1"));

    pool.reset().await;
}
