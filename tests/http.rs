use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use milight_daemon::server::{router, AppState};
use milight_daemon::*;
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Default)]
struct FakeBridge {
    calls: Mutex<Vec<(u8, BridgeCommand)>>,
    fail_group: Option<u8>,
}

impl BridgeDriver for FakeBridge {
    async fn send(
        &self,
        group: &Group,
        command: BridgeCommand,
    ) -> std::result::Result<(), BridgeError> {
        self.calls.lock().unwrap().push((group.id(), command));
        if self.fail_group == Some(group.id()) {
            return Err(BridgeError::Transport("bridge unreachable".into()));
        }
        Ok(())
    }
}

fn app(bridge: &Arc<FakeBridge>) -> axum::Router {
    let registry = Arc::new(GroupRegistry::new(4).unwrap());
    let dispatcher =
        CommandDispatcher::new(registry, Arc::clone(bridge)).with_pacing(Duration::ZERO);
    router(AppState::new(dispatcher))
}

async fn post(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::post(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn calls(bridge: &FakeBridge) -> Vec<(u8, BridgeCommand)> {
    bridge.calls.lock().unwrap().clone()
}

#[tokio::test]
async fn on_single_group_reports_group_id() {
    let bridge = Arc::new(FakeBridge::default());
    let (status, body) = post(app(&bridge), "/on?group=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"command": "on", "group": 2}));
    assert_eq!(calls(&bridge), vec![(2, BridgeCommand::On)]);
}

#[tokio::test]
async fn missing_group_broadcasts() {
    let bridge = Arc::new(FakeBridge::default());
    let (status, body) = post(app(&bridge), "/off").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"command": "off", "group": 0}));
    assert_eq!(calls(&bridge).len(), 4);
}

#[tokio::test]
async fn rgb_reports_normalized_color() {
    let bridge = Arc::new(FakeBridge::default());
    let (status, body) = post(app(&bridge), "/rgb?group=1&r=255&g=0&b=0").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"command": "rgb", "group": 1, "rgb": {"r": 1.0, "g": 0.0, "b": 0.0}})
    );
}

#[tokio::test]
async fn brightness_reports_device_level() {
    let bridge = Arc::new(FakeBridge::default());
    let (status, body) = post(app(&bridge), "/brightness?group=3&level=50").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"command": "brightness", "group": 3, "level": 14}));
    assert_eq!(calls(&bridge), vec![(3, BridgeCommand::SetBrightness(14))]);
}

#[tokio::test]
async fn color_reports_hue_in_hex() {
    let bridge = Arc::new(FakeBridge::default());
    let (status, body) = post(app(&bridge), "/color?group=4&color=red").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"command": "color", "group": 4, "color": "b0"}));
}

#[tokio::test]
async fn disco_without_speed_toggles() {
    let bridge = Arc::new(FakeBridge::default());
    let (status, body) = post(app(&bridge), "/disco?group=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"command": "disco", "group": 1, "speed": "hold"}));
    assert_eq!(calls(&bridge), vec![(1, BridgeCommand::Disco)]);
}

#[tokio::test]
async fn white_and_night_route_to_bridge() {
    let bridge = Arc::new(FakeBridge::default());
    post(app(&bridge), "/white?group=1").await;
    post(app(&bridge), "/night?group=2").await;

    assert_eq!(
        calls(&bridge),
        vec![(1, BridgeCommand::White), (2, BridgeCommand::Night)]
    );
}

#[tokio::test]
async fn validation_errors_are_client_errors() {
    let bridge = Arc::new(FakeBridge::default());
    for uri in [
        "/on?group=5",
        "/on?group=abc",
        "/rgb?group=1&r=256&g=0&b=0",
        "/rgb?group=1&r=1&g=1",
        "/brightness?level=0",
        "/brightness?level=101",
        "/color?color=Red",
    ] {
        let (status, body) = post(app(&bridge), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error_code"], "VALIDATION_ERROR", "{uri}");
    }
    assert!(calls(&bridge).is_empty());
}

#[tokio::test]
async fn duplicate_query_key_is_a_json_validation_error() {
    let bridge = Arc::new(FakeBridge::default());
    for uri in ["/on?group=1&group=2", "/brightness?group=1&level=10&level=20"] {
        let (status, body) = post(app(&bridge), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error_code"], "VALIDATION_ERROR", "{uri}");
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("invalid query string"), "{message}");
    }
    assert!(calls(&bridge).is_empty());
}

#[tokio::test]
async fn dispatch_errors_are_server_errors() {
    let bridge = Arc::new(FakeBridge {
        fail_group: Some(2),
        ..Default::default()
    });
    let (status, body) = post(app(&bridge), "/white").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error_code"], "DISPATCH_ERROR");
    assert_eq!(body["message"], "failed to send white to group 2");
    assert_eq!(calls(&bridge).len(), 2);
}

#[tokio::test]
async fn get_is_not_allowed() {
    let bridge = Arc::new(FakeBridge::default());
    let response = app(&bridge)
        .oneshot(Request::get("/on").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
