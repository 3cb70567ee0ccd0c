//! Syncer and local API tests

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use lockbridge::app::state::AppState;
use lockbridge::authn::credentials::Credentials;
use lockbridge::errors::BridgeError;
use lockbridge::http::client::{ApiClient, GrantType};
use lockbridge::http::scripted::ScriptedTransport;
use lockbridge::models::LockState;
use lockbridge::server::serve::router;
use lockbridge::server::state::ServerState;
use lockbridge::storage::settings::Settings;
use lockbridge::sync::syncer::LockSyncer;
use lockbridge::sync::webhook::WebhookPayload;
use lockbridge::sync::RefreshMode;
use lockbridge::workers::token_persist;

fn lock_list() -> Value {
    json!({
        "errcode": 0,
        "list": [
            {"lockId": 1, "lockMac": "AA:01", "lockName": "S31_1", "lockAlias": "Front", "electricQuantity": 90},
            {"lockId": 2, "lockMac": "AA:02", "lockName": "S31_2", "lockAlias": "Back", "electricQuantity": 15}
        ]
    })
}

async fn create_test_syncer(transport: &ScriptedTransport, mode: RefreshMode) -> Arc<LockSyncer> {
    transport.reply(json!({"access_token": "a1", "refresh_token": "r1"}));
    let creds = Credentials::new("https://euapi.ttlock.com", "cid", "csecret", "alice");
    let client = ApiClient::with_transport(creds, transport.clone());
    client.authenticate("r0", GrantType::RefreshToken).await.unwrap();
    Arc::new(LockSyncer::new(Arc::new(client), mode))
}

fn form(lock_id: i64, records: Value) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("lockId", &lock_id.to_string())
        .append_pair("records", &records.to_string())
        .finish()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_polling_mode_queries_open_state() {
    let transport = ScriptedTransport::new();
    let syncer = create_test_syncer(&transport, RefreshMode::Polling).await;
    transport
        .reply(lock_list())
        .reply(json!({"state": 0}))
        .reply(json!({"state": 1}));

    syncer.trigger_sync().await.unwrap();

    let views = syncer.views().await;
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].is_locked, Some(true));
    assert_eq!(views[1].is_locked, Some(false));
    assert_eq!(views[1].changed_by, None);
    assert_eq!(syncer.get_state().await.err_streak, 0);
}

#[tokio::test]
async fn test_polling_logs_mode_reconciles_records() {
    let transport = ScriptedTransport::new();
    let syncer = create_test_syncer(&transport, RefreshMode::PollingLogs).await;
    transport
        .reply(lock_list())
        .reply(json!({"list": [
            {"lockId": 1, "recordType": 1, "lockDate": 200, "username": "alice", "success": 1},
            {"lockId": 1, "recordType": 11, "lockDate": 100, "username": "bob", "success": 1}
        ]}))
        .reply(json!({"list": [
            {"lockId": 2, "recordType": 30, "lockDate": 300, "username": "", "success": 1}
        ]}));

    syncer.trigger_sync().await.unwrap();

    let front = syncer.view(1).await.unwrap();
    assert_eq!(front.state, LockState::Unlocked);
    assert_eq!(front.changed_by.as_deref(), Some("alice"));

    let back = syncer.view(2).await.unwrap();
    assert_eq!(back.state, LockState::Unknown);
    assert_eq!(back.is_locked, None);
}

#[tokio::test]
async fn test_webhook_mode_never_polls_state() {
    let transport = ScriptedTransport::new();
    let syncer = create_test_syncer(&transport, RefreshMode::WebhookLogs).await;
    transport.reply(lock_list());

    syncer.trigger_sync().await.unwrap();
    assert_eq!(transport.paths().last().map(String::as_str), Some("/v3/lock/list"));

    let payload = WebhookPayload::from_form(&form(
        2,
        json!([{"lockId": 2, "recordType": 7, "lockDate": 10, "username": "dave", "success": 1}]),
    ))
    .unwrap();
    syncer.apply_webhook(&payload).await;

    // A sensor-only batch keeps the known state
    let payload = WebhookPayload::from_form(&form(
        2,
        json!([{"lockId": 2, "recordType": 31, "lockDate": 20, "username": "", "success": 1}]),
    ))
    .unwrap();
    syncer.apply_webhook(&payload).await;

    let back = syncer.view(2).await.unwrap();
    assert_eq!(back.is_locked, Some(false));
    assert_eq!(back.changed_by.as_deref(), Some("dave"));
}

#[tokio::test]
async fn test_lock_list_is_replaced_wholesale() {
    let transport = ScriptedTransport::new();
    let syncer = create_test_syncer(&transport, RefreshMode::WebhookLogs).await;
    transport
        .reply(lock_list())
        .reply(json!({"list": [{"lockId": 2, "lockAlias": "Back renamed"}, {"lockId": 0}]}));

    syncer.refresh_locks().await.unwrap();
    let kept = syncer.refresh_locks().await.unwrap();

    assert_eq!(kept, 1);
    assert_eq!(syncer.lock_ids().await, vec![2]);
    assert_eq!(syncer.view(2).await.unwrap().name, "Back renamed");
    assert_eq!(syncer.view(2).await.unwrap().battery, 0);
}

#[tokio::test]
async fn test_sync_failure_is_recorded() {
    let transport = ScriptedTransport::new();
    let syncer = create_test_syncer(&transport, RefreshMode::Polling).await;
    transport.reply(json!({"errcode": 5, "errmsg": "x"}));

    let err = syncer.trigger_sync().await.unwrap_err();
    assert!(matches!(err, BridgeError::Api { code: 5, .. }));

    let state = syncer.get_state().await;
    assert_eq!(state.err_streak, 1);
    assert!(state.last_synced_at.is_none());
}

#[tokio::test]
async fn test_commands_reject_unknown_locks() {
    let transport = ScriptedTransport::new();
    let syncer = create_test_syncer(&transport, RefreshMode::WebhookLogs).await;

    let err = syncer.unlock(42).await.unwrap_err();
    assert!(matches!(err, BridgeError::NotFound(_)));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_http_lock_command_and_listing() {
    let transport = ScriptedTransport::new();
    let syncer = create_test_syncer(&transport, RefreshMode::WebhookLogs).await;
    transport.reply(lock_list()).reply(json!({"errcode": 0}));
    syncer.refresh_locks().await.unwrap();

    let app = router(Arc::new(ServerState::new(syncer.clone(), None)));

    let response = app
        .clone()
        .oneshot(Request::post("/locks/1/lock").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(transport.paths().last().map(String::as_str), Some("/v3/lock/lock"));

    let response = app
        .clone()
        .oneshot(Request::get("/locks").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let locks = body_json(response).await;
    assert_eq!(locks.as_array().map(Vec::len), Some(2));
    assert_eq!(locks[0]["lock_unique_id"], "1_lock");

    let response = app
        .oneshot(Request::get("/locks/99").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_http_api_error_maps_to_bad_gateway() {
    let transport = ScriptedTransport::new();
    let syncer = create_test_syncer(&transport, RefreshMode::WebhookLogs).await;
    transport
        .reply(lock_list())
        .reply(json!({"errcode": -3003, "errmsg": "gateway busy"}));
    syncer.refresh_locks().await.unwrap();

    let app = router(Arc::new(ServerState::new(syncer, None)));
    let response = app
        .oneshot(Request::post("/locks/2/unlock").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["code"], -3003);
}

#[tokio::test]
async fn test_http_webhook_updates_state() {
    let transport = ScriptedTransport::new();
    let syncer = create_test_syncer(&transport, RefreshMode::WebhookLogs).await;
    transport.reply(lock_list());
    syncer.refresh_locks().await.unwrap();

    let app = router(Arc::new(ServerState::new(syncer.clone(), Some("hook".to_string()))));
    let body = form(
        1,
        json!([
            {"lockId": 1, "recordType": 1, "lockDate": 200, "username": "alice", "success": 1},
            {"lockId": 1, "recordType": 11, "lockDate": 100, "username": "bob", "success": 1}
        ]),
    );

    let response = app
        .clone()
        .oneshot(
            Request::post("/webhook/hook")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(body.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&text[..], b"success");

    let front = syncer.view(1).await.unwrap();
    assert_eq!(front.state, LockState::Unlocked);
    assert_eq!(front.changed_by.as_deref(), Some("alice"));

    let response = app
        .oneshot(Request::post("/webhook/wrong").body(Body::from(body)).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn startup_client(transport: &ScriptedTransport) -> ApiClient {
    let creds = Credentials::new("https://euapi.ttlock.com", "cid", "csecret", "alice");
    ApiClient::with_transport(creds, transport.clone())
}

fn stored_settings() -> Settings {
    let mut settings = Settings::default();
    settings.refresh_token = "r0".to_string();
    settings
}

#[tokio::test]
async fn test_startup_survives_offline_lock() {
    let transport = ScriptedTransport::new();
    transport
        .reply(json!({"access_token": "a1", "refresh_token": "r1"}))
        .reply(lock_list())
        .reply(json!({"errcode": -2012, "errmsg": "gateway offline"}))
        .reply(json!({"state": 1}));
    let (token_tx, _token_rx) = token_persist::channel();

    let app_state = AppState::init_with_client(
        startup_client(&transport),
        &stored_settings(),
        RefreshMode::Polling,
        token_tx,
    )
    .await
    .unwrap();

    let syncer = &app_state.syncer;
    assert_eq!(syncer.lock_ids().await, vec![1, 2]);
    assert_eq!(syncer.state_of(1).await, None);
    assert_eq!(
        syncer.state_of(2).await.map(|r| r.state),
        Some(LockState::Unlocked)
    );

    let sync = syncer.get_state().await;
    assert_eq!(sync.err_streak, 1);
    assert!(sync.last_error.unwrap().contains("-2012"));
}

#[tokio::test]
async fn test_startup_fails_when_listing_fails() {
    let transport = ScriptedTransport::new();
    transport
        .reply(json!({"access_token": "a1", "refresh_token": "r1"}))
        .reply(json!({"errcode": 5, "errmsg": "x"}));
    let (token_tx, _token_rx) = token_persist::channel();

    let result = AppState::init_with_client(
        startup_client(&transport),
        &stored_settings(),
        RefreshMode::Polling,
        token_tx,
    )
    .await;

    assert!(matches!(result, Err(BridgeError::Api { code: 5, .. })));
}
