//! # Cluster Lifecycle Integration Tests / 集群生命周期集成测试
//!
//! Drives `ClusterController` against a fake `esrally` script and a local
//! HTTP responder standing in for the node's REST layer.
//!
//! 使用伪造的 `esrally` 脚本和模拟节点 REST 层的本地 HTTP 响应器驱动 `ClusterController`。

mod common;

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use race_matrix::core::cluster::{ClusterController, ClusterSettings, ClusterState};
use race_matrix::core::error::ClusterError;
use race_matrix::core::rally::RallyCli;
use tempfile::tempdir;

use common::FakeRally;

async fn settings_with_rest_layer() -> ClusterSettings {
    let (port, _) = common::serve_http(|_, _| (200, r#"{"tagline":"You Know, for Search"}"#.to_string())).await;
    ClusterSettings {
        http_port: port,
        rest_layer_attempts: 3,
        rest_layer_interval_secs: 0,
        ..ClusterSettings::default()
    }
}

#[tokio::test]
async fn test_scoped_cluster_runs_body_between_start_and_stop() {
    let dir = tempdir().unwrap();
    let rally = FakeRally::healthy(dir.path());
    let settings = settings_with_rest_layer().await;
    let port = settings.http_port;

    let controller = ClusterController::new(RallyCli::new(&rally.binary), settings);
    let log = rally.log.clone();
    let seen = controller
        .scoped("race-1", |handle| async move {
            // Only install and start have run when the body executes.
            let calls = std::fs::read_to_string(&log).unwrap();
            (handle, calls.lines().count())
        })
        .await
        .unwrap();

    let (handle, calls_before_body) = seen;
    assert_eq!(handle.installation_id, "inst-42");
    assert_eq!(handle.race_id, "race-1");
    assert_eq!(handle.http_port, port);
    assert_eq!(calls_before_body, 2);
    assert_eq!(rally.subcommands(), vec!["install", "start", "stop"]);

    let calls = rally.calls();
    assert!(calls[0].contains(&format!("--http-port={port}")));
    assert!(calls[0].contains(&format!("--seed-hosts=127.0.0.1:{}", port + 100)));
    assert!(calls[0].contains("--node=rally-node"));
    assert!(calls[0].contains("--master-nodes=rally-node"));
    assert!(calls[1].contains("--installation-id=inst-42"));
    assert!(calls[1].contains("--race-id=race-1"));
    assert!(calls[1].contains("--runtime-jdk=bundled"));
    assert_eq!(calls[2], "stop --installation-id=inst-42");
}

#[tokio::test]
async fn test_install_failure_reports_stderr_and_skips_stop() {
    let dir = tempdir().unwrap();
    let rally = FakeRally::new(dir.path(), "echo 'no distribution for car' >&2; exit 64", "true", "true");
    let settings = settings_with_rest_layer().await;

    let controller = ClusterController::new(RallyCli::new(&rally.binary), settings);
    let err = controller
        .scoped("race-1", |_| async {})
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterError::Installation { .. }));
    assert!(err.to_string().contains("no distribution for car"));
    assert_eq!(rally.subcommands(), vec!["install"]);
}

#[tokio::test]
async fn test_unparseable_install_output_is_an_error() {
    let dir = tempdir().unwrap();
    let rally = FakeRally::new(dir.path(), "echo 'installed!'", "true", "true");
    let settings = settings_with_rest_layer().await;

    let mut controller = ClusterController::new(RallyCli::new(&rally.binary), settings);
    let err = controller.install().await.unwrap_err();
    assert!(matches!(err, ClusterError::InstallationOutput { .. }));
    assert_eq!(controller.state(), ClusterState::Uninstalled);
}

#[tokio::test]
async fn test_start_failure_still_stops_the_installation() {
    let dir = tempdir().unwrap();
    let rally = FakeRally::new(
        dir.path(),
        r#"echo '{"installation-id": "inst-7"}'"#,
        "echo 'port in use' >&2; exit 1",
        "true",
    );
    let settings = settings_with_rest_layer().await;

    let controller = ClusterController::new(RallyCli::new(&rally.binary), settings);
    let mut body_ran = false;
    let err = controller
        .scoped("race-1", |_| {
            body_ran = true;
            async {}
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterError::Startup { .. }));
    assert!(!body_ran);
    assert_eq!(rally.subcommands(), vec!["install", "start", "stop"]);
}

#[tokio::test]
async fn test_unreachable_rest_layer_fails_start() {
    let dir = tempdir().unwrap();
    let rally = FakeRally::healthy(dir.path());
    let (port, _) = common::serve_http(|_, _| (503, "{}".to_string())).await;
    let settings = ClusterSettings {
        http_port: port,
        rest_layer_attempts: 2,
        rest_layer_interval_secs: 0,
        ..ClusterSettings::default()
    };

    let controller = ClusterController::new(RallyCli::new(&rally.binary), settings);
    let err = controller.scoped("race-1", |_| async {}).await.unwrap_err();

    assert!(matches!(err, ClusterError::RestLayerUnavailable(_)));
    assert_eq!(rally.subcommands(), vec!["install", "start", "stop"]);
}

#[tokio::test]
async fn test_cluster_is_stopped_when_body_panics() {
    let dir = tempdir().unwrap();
    let rally = FakeRally::healthy(dir.path());
    let settings = settings_with_rest_layer().await;

    let controller = ClusterController::new(RallyCli::new(&rally.binary), settings);
    let outcome = AssertUnwindSafe(controller.scoped("race-1", |_| async {
        panic!("race body exploded");
    }))
    .catch_unwind()
    .await;

    assert!(outcome.is_err());
    assert_eq!(rally.subcommands(), vec!["install", "start", "stop"]);
}

#[tokio::test]
async fn test_stop_failure_does_not_mask_the_body_result() {
    let dir = tempdir().unwrap();
    let rally = FakeRally::new(
        dir.path(),
        r#"echo '{"installation-id": "inst-42"}'"#,
        "true",
        "exit 1",
    );
    let settings = settings_with_rest_layer().await;

    let controller = ClusterController::new(RallyCli::new(&rally.binary), settings);
    let value = controller.scoped("race-1", |_| async { 7 }).await.unwrap();
    assert_eq!(value, 7);
}

#[tokio::test]
async fn test_install_twice_is_rejected() {
    let dir = tempdir().unwrap();
    let rally = FakeRally::healthy(dir.path());
    let settings = settings_with_rest_layer().await;

    let mut controller = ClusterController::new(RallyCli::new(&rally.binary), settings);
    controller.install().await.unwrap();
    assert_eq!(controller.installation_id(), Some("inst-42"));
    let err = controller.install().await.unwrap_err();
    assert!(matches!(err, ClusterError::InvalidState { operation: "install", .. }));
}
