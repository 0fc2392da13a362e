#![allow(clippy::unwrap_used)]
// End-to-end tests for `Coordinator` against a wiremock REST API and a
// local push channel server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shsec_core::{
    AlarmMode, AlarmState, Command, CommandResult, ConnectionState, Coordinator,
    CoordinatorConfig, CoreError,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(server: &MockServer) -> CoordinatorConfig {
    CoordinatorConfig {
        name: "Casa".into(),
        username: "alice@example.com".into(),
        password: SecretString::from("secret".to_string()),
        rest_url: Url::parse(&format!("{}/REST/v2/", server.uri())).unwrap(),
        push_enabled: false,
        refresh_interval_secs: 0,
        ..CoordinatorConfig::default()
    }
}

fn cycle(mode: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "data": {
            "device_status": [
                {
                    "device_id": "12",
                    "type": "device_type.door_contact",
                    "name": "Front door",
                    "status_open": ["device_status.dc_open"]
                },
                {
                    "device_id": 13,
                    "type": "device_type.pir",
                    "name": "Hall",
                    "status_open": [],
                    "status_motion": "0"
                },
                {
                    "device_id": "14",
                    "type": "device_type.keypad",
                    "name": "Entrance keypad",
                    "status_open": []
                }
            ],
            "model": [
                { "area": 1, "mode": mode },
                { "area": 2, "mode": "disarm" }
            ]
        }
    }))
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/REST/v2/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-1",
            "data": { "user_id": 42 }
        })))
        .mount(server)
        .await;
}

async fn mount_cycle(server: &MockServer, mode: &str) {
    Mock::given(method("GET"))
        .and(path("/REST/v2/panel/cycle"))
        .respond_with(cycle(mode))
        .mount(server)
        .await;
}

async fn connected(server: &MockServer) -> Coordinator {
    mount_login(server).await;
    mount_cycle(server, "disarm").await;
    let coordinator = Coordinator::new(config(server));
    coordinator.connect().await.unwrap();
    coordinator
}

async fn cycle_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/REST/v2/panel/cycle")
        .count()
}

// ── Connection ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_open_door_contact_reports_on() {
    let server = MockServer::start().await;
    let coordinator = connected(&server).await;

    assert_eq!(
        *coordinator.connection_state().borrow(),
        ConnectionState::Connected
    );

    let snap = coordinator.snapshot();
    assert_eq!(
        snap.devices.keys().cloned().collect::<Vec<_>>(),
        vec!["12".to_string(), "13".to_string(), "14".to_string()]
    );
    assert_eq!(
        snap.areas.keys().cloned().collect::<Vec<_>>(),
        vec!["1".to_string(), "2".to_string()]
    );

    let sensors = coordinator.binary_sensors();
    assert_eq!(sensors.len(), 2);
    assert_eq!(sensors[0].name, "12 - Front door");
    assert_eq!(sensors[0].state(), "on");
    assert_eq!(sensors[1].name, "13 - Hall");
    assert_eq!(sensors[1].state(), "off");

    coordinator.disconnect().await;
    assert_eq!(
        *coordinator.connection_state().borrow(),
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn test_login_failure_is_cannot_connect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/REST/v2/auth/login"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server));
    let err = coordinator.connect().await.unwrap_err();

    assert!(
        matches!(err, CoreError::AuthenticationFailed { .. }),
        "expected AuthenticationFailed, got: {err:?}"
    );
    assert!(err.is_connect_failure());
    assert_eq!(
        *coordinator.connection_state().borrow(),
        ConnectionState::Failed
    );
}

#[tokio::test]
async fn test_only_configured_areas_become_panels() {
    let server = MockServer::start().await;
    let coordinator = connected(&server).await;

    let panels = coordinator.alarm_panels();
    assert_eq!(panels.len(), 1);
    assert_eq!(panels[0].name, "Casa 1");
    assert_eq!(panels[0].unique_id, "smarthomesec_Casa_1");
    assert_eq!(panels[0].state, Some(AlarmState::Disarmed));
}

// ── Mode change ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_arm_then_poll_shows_armed_away() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    // First poll sees the panel disarmed, later polls see it armed
    Mock::given(method("GET"))
        .and(path("/REST/v2/panel/cycle"))
        .respond_with(cycle("disarm"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_cycle(&server, "arm").await;

    Mock::given(method("POST"))
        .and(path("/REST/v2/panel/mode"))
        .and(body_string("area=1&pincode=1234&mode=arm&format=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": true })))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server));
    coordinator.connect().await.unwrap();
    assert_eq!(
        coordinator.alarm_panels()[0].state,
        Some(AlarmState::Disarmed)
    );

    coordinator
        .set_mode("1", AlarmMode::Arm, "1234")
        .await
        .unwrap();

    // The command alone does not touch the snapshot
    assert_eq!(
        coordinator.alarm_panels()[0].state,
        Some(AlarmState::Disarmed)
    );

    coordinator.refresh().await.unwrap();
    let panel = &coordinator.alarm_panels()[0];
    assert_eq!(panel.state, Some(AlarmState::ArmedAway));
    assert_eq!(panel.state_label(), "armed_away");
}

#[tokio::test]
async fn test_commands_route_through_processor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/REST/v2/panel/mode"))
        .and(body_string("area=1&pincode=4321&mode=home&format=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    let coordinator = connected(&server).await;

    let result = coordinator
        .execute(Command::ArmHome {
            area: "1".into(),
            code: Some("4321".into()),
        })
        .await
        .unwrap();

    match result {
        CommandResult::Acknowledged(ack) => assert_eq!(ack, json!({ "ok": 1 })),
        other => panic!("expected acknowledgement, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_command_validation() {
    let server = MockServer::start().await;
    let coordinator = connected(&server).await;

    let missing_code = coordinator
        .execute(Command::Disarm {
            area: "1".into(),
            code: None,
        })
        .await;
    assert!(matches!(missing_code, Err(CoreError::ValidationFailed { .. })));

    let letters = coordinator
        .execute(Command::ArmAway {
            area: "1".into(),
            code: Some("12ab".into()),
        })
        .await;
    assert!(matches!(letters, Err(CoreError::ValidationFailed { .. })));

    let unknown_area = coordinator
        .execute(Command::ArmAway {
            area: "9".into(),
            code: Some("1234".into()),
        })
        .await;
    assert!(matches!(unknown_area, Err(CoreError::AreaNotFound { .. })));

    // Nothing reached the panel
    let posted = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/REST/v2/panel/mode")
        .count();
    assert_eq!(posted, 0);
}

#[tokio::test]
async fn test_rejected_pin_is_security_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/REST/v2/panel/mode"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;
    let coordinator = connected(&server).await;

    let err = coordinator
        .set_mode("1", AlarmMode::Disarm, "0000")
        .await
        .unwrap_err();
    assert!(
        matches!(err, CoreError::Security { .. }),
        "expected Security, got: {err:?}"
    );
}

// ── Refresh failures ────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_poll_keeps_data_but_marks_unavailable() {
    let server = MockServer::start().await;
    let coordinator = connected(&server).await;

    server.reset().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/REST/v2/panel/cycle"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = coordinator.refresh().await.unwrap_err();
    match &err {
        CoreError::RefreshFailed(inner) => {
            assert!(matches!(**inner, CoreError::Api { status: 500, .. }));
        }
        other => panic!("expected RefreshFailed, got: {other:?}"),
    }

    let snap = coordinator.snapshot();
    assert!(!snap.available);
    assert_eq!(snap.devices.len(), 3);
    assert!(
        coordinator
            .binary_sensors()
            .iter()
            .all(|s| s.state() == "unavailable")
    );
}

#[tokio::test]
async fn test_slow_poll_times_out() {
    let server = MockServer::start().await;
    let coordinator = {
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/REST/v2/panel/cycle"))
            .respond_with(cycle("disarm"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/REST/v2/panel/cycle"))
            .respond_with(cycle("disarm").set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut cfg = config(&server);
        cfg.refresh_timeout = Duration::from_millis(200);
        let coordinator = Coordinator::new(cfg);
        coordinator.connect().await.unwrap();
        coordinator
    };

    let err = coordinator.refresh().await.unwrap_err();
    assert!(
        matches!(err.root(), CoreError::Timeout { .. }),
        "expected Timeout, got: {err:?}"
    );
    assert!(!coordinator.snapshot().available);
}

// ── Push-triggered refresh ──────────────────────────────────────────

#[tokio::test]
async fn test_push_event_triggers_refresh() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::text("3")).await.unwrap();
        ws.send(Message::text(r#"42["panel_update",{"area":1}]"#))
            .await
            .unwrap();
        while ws.next().await.is_some() {}
    });

    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_cycle(&server, "disarm").await;

    let mut cfg = config(&server);
    cfg.push_enabled = true;
    cfg.push_url = Url::parse(&format!("ws://{addr}/ws/socket.io/")).unwrap();
    cfg.push_reconnect_delay = Duration::from_millis(50);

    let coordinator = Coordinator::new(cfg);
    coordinator.connect().await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while cycle_requests(&server).await < 2 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "push event did not trigger a refresh"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    coordinator.disconnect().await;
}

#[tokio::test]
async fn test_heartbeat_acks_do_not_trigger_refresh() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (sent_tx, sent_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for _ in 0..3 {
            ws.send(Message::text("3")).await.unwrap();
        }
        let _ = sent_tx.send(());
        while ws.next().await.is_some() {}
    });

    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_cycle(&server, "disarm").await;

    let mut cfg = config(&server);
    cfg.push_enabled = true;
    cfg.push_url = Url::parse(&format!("ws://{addr}/ws/socket.io/")).unwrap();
    cfg.push_reconnect_delay = Duration::from_millis(50);

    let coordinator = Coordinator::new(cfg);
    coordinator.connect().await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), sent_rx)
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(cycle_requests(&server).await, 1);

    coordinator.disconnect().await;
}

#[tokio::test]
async fn test_disconnected_coordinator_cannot_reconnect() {
    let server = MockServer::start().await;
    let coordinator = connected(&server).await;
    coordinator.disconnect().await;

    assert!(coordinator.snapshot().devices.is_empty());
    assert!(matches!(
        coordinator.connect().await,
        Err(CoreError::Internal(_))
    ));
    assert!(matches!(
        coordinator.execute(Command::Refresh).await,
        Err(CoreError::NotConnected)
    ));
}
