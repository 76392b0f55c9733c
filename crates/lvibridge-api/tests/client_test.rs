#![allow(clippy::unwrap_used)]
// Integration tests for `LviClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lvibridge_api::{DeviceControl, Error, LviClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, LviClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api/v0.1/human/", server.uri())).unwrap();
    let client = LviClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn api_path(suffix: &str) -> String {
    format!("/api/v0.1/human/{suffix}")
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "errorCode": 0,
        "message": "",
        "statusCode": 200,
        "success": true,
        "data": data
    }))
}

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_owned())
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_authorization_code_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(api_path("user/auth")))
        .and(body_string_contains("email=user%40example.com"))
        .and(body_string_contains("smarthome_id=key-1"))
        .respond_with(ok(json!({ "authorization_code": "code-123" })))
        .expect(1)
        .mount(&server)
        .await;

    let code = client
        .request_authorization_code("user@example.com", &secret("pw"), &secret("tok"), "key-1")
        .await
        .unwrap();

    assert_eq!(code, "code-123");
}

#[tokio::test]
async fn test_authorization_code_vendor_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(api_path("user/auth")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorCode": 10_002,
            "message": "account or password error",
            "success": false,
            "data": null
        })))
        .mount(&server)
        .await;

    let result = client
        .request_authorization_code("user@example.com", &secret("bad"), &secret("tok"), "key-1")
        .await;

    assert!(
        matches!(result, Err(Error::Vendor { code: 10_002, .. })),
        "expected Vendor error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_unreadable_error_code_is_vendor_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(api_path("uds/selectHomeList")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorCode": "E42",
            "message": "",
            "data": { "homeList": [] }
        })))
        .mount(&server)
        .await;

    let result = client.list_homes(&secret("acc")).await;

    assert!(
        matches!(result, Err(Error::Vendor { code: -1, .. })),
        "expected Vendor error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_authorization_code_empty_is_auth_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(api_path("user/auth")))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;

    let result = client
        .request_authorization_code("user@example.com", &secret("pw"), &secret("tok"), "key-1")
        .await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_apply_access_token() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(api_path("share/applyAccessToken")))
        .and(header("authorization_code", "code-123"))
        .and(query_param("username", "user@example.com"))
        .and(query_param("password", "pw"))
        .respond_with(ok(json!({
            "access_token": "acc",
            "refresh_token": "ref",
            "expireTime": 1_700_007_200_000_i64,
            "refresh_expireTime": "1702592000000"
        })))
        .mount(&server)
        .await;

    let tokens = client
        .apply_access_token("code-123", "user@example.com", &secret("pw"))
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "acc");
    assert_eq!(tokens.refresh_token, "ref");
    assert_eq!(tokens.expire_time, 1_700_007_200_000);
    assert_eq!(tokens.refresh_expire_time, 1_702_592_000_000);
}

#[tokio::test]
async fn test_refresh_token_http_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(api_path("share/refreshtoken")))
        .and(query_param("refreshtoken", "ref"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let result = client.refresh_token(&secret("ref")).await;

    match result {
        Err(Error::Http { status, message }) => {
            assert_eq!(status, 502);
            assert_eq!(message, "Bad Gateway");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

// ── Listing tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_homes_sends_access_token() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(api_path("uds/selectHomeList")))
        .and(header("access_token", "acc"))
        .respond_with(ok(json!({
            "homeList": [
                { "smarthome_id": 201, "label": "Cabin", "mac_address": "AA:BB", "holiday_mode": "0" },
                { "smarthome_id": "202", "label": "Flat" }
            ]
        })))
        .mount(&server)
        .await;

    let homes = client.list_homes(&secret("acc")).await.unwrap();

    assert_eq!(homes.len(), 2);
    assert_eq!(homes[0].smarthome_id, "201");
    assert_eq!(homes[0].label, "Cabin");
    assert!(!homes[0].holiday_mode);
    assert_eq!(homes[1].smarthome_id, "202");
}

#[tokio::test]
async fn test_list_rooms_and_devices() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(api_path("uds/selectRoombyHome2020")))
        .and(query_param("homeId", "201"))
        .respond_with(ok(json!({
            "roomList": [{ "zone_id": 31, "name": "Kitchen", "label_zone_type": "kitchen" }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(api_path("uds/selectDevicebyRoom2020")))
        .and(query_param("roomId", "31"))
        .respond_with(ok(json!({
            "deviceList": [{ "device_id": "4411", "nom_appareil": "Panel", "current_temp": "20.5" }]
        })))
        .mount(&server)
        .await;

    let rooms = client.list_rooms(&secret("acc"), "201").await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].zone_id, "31");
    assert_eq!(rooms[0].name, "Kitchen");

    let devices = client
        .list_room_devices(&secret("acc"), &rooms[0].zone_id)
        .await
        .unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].control_id(), "4411");
    assert_eq!(devices[0].current_temp, Some(20.5));
}

#[tokio::test]
async fn test_independent_devices_missing_list_is_empty() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(api_path("uds/getIndependentDevices2020")))
        .and(query_param("homeId", "201"))
        .respond_with(ok(json!(null)))
        .mount(&server)
        .await;

    let devices = client
        .list_independent_devices(&secret("acc"), "201")
        .await
        .unwrap();
    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(api_path("uds/selectHomeList")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = client.list_homes(&secret("acc")).await;
    match result {
        Err(Error::Deserialization { body, .. }) => assert!(body.contains("maintenance")),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

// ── Control tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_control_device_setpoint() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(api_path("uds/deviceControlForOpenApi")))
        .and(query_param("deviceId", "4411"))
        .and(query_param("holdTemp", "22"))
        .and(query_param("operation", "1"))
        .and(query_param("status", "1"))
        .and(header("access_token", "acc"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    client
        .control_device(&secret("acc"), &DeviceControl::setpoint("4411", "22"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(api_path("uds/deviceControlForOpenApi")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client
        .control_device(&secret("stale"), &DeviceControl::setpoint("4411", "22"))
        .await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected auth error, got: {result:?}"
    );
}
