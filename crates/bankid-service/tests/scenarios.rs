// ----- standard library imports
// ----- extra library imports
use axum::http::StatusCode;
use bankid_service::test_utils::build_test_server;
// ----- local imports

/// Appends the Luhn check digit computed over the number without the century.
fn personal_number(base: &str) -> String {
    let checksum: u32 = base[2..]
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(idx, digit)| {
            let weighted = if idx % 2 == 0 { digit * 2 } else { digit };
            weighted / 10 + weighted % 10
        })
        .sum();
    format!("{base}{}", (10 - checksum % 10) % 10)
}

fn assert_uuid_v4(value: &serde_json::Value) {
    let text = value.as_str().expect("string value");
    let parsed = uuid::Uuid::parse_str(text).expect("uuid");
    assert_eq!(parsed.get_version_num(), 4);
}

#[test]
fn luhn_check_digit() {
    assert_eq!(personal_number("19811218987"), "198112189876");
    assert_eq!(personal_number("19900101123"), "199001011239");
}

#[tokio::test]
async fn authentication_and_collect() {
    let (server, _) = build_test_server();

    let response = server
        .get(&format!("/authenticate/{}", personal_number("19900101123")))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_uuid_v4(&body["orderRef"]);
    assert_uuid_v4(&body["autoStartToken"]);

    let order_ref = body["orderRef"].as_str().expect("orderRef");
    let response = server.get(&format!("/collect/{order_ref}")).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let status = body["progressStatus"].as_str().expect("progressStatus");
    assert!(["OUTSTANDING_TRANSACTION", "NO_CLIENT", "COMPLETE", "FAILED"].contains(&status));
}

#[tokio::test]
async fn sign_and_collect() {
    let (server, _) = build_test_server();

    let response = server
        .get(&format!("/sign/{}", personal_number("19811218987")))
        .add_query_param("userVisibleData", "Text to sign")
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_uuid_v4(&body["orderRef"]);

    let order_ref = body["orderRef"].as_str().expect("orderRef");
    let response = server.get(&format!("/collect/{order_ref}")).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["progressStatus"], "OUTSTANDING_TRANSACTION");
}

#[tokio::test]
async fn invalid_order_ref() {
    let (server, _) = build_test_server();

    let response = server.get("/collect/invalid-uuid").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    let message = body["message"].as_str().expect("message");
    assert!(message.starts_with("InvalidParameters"));
}

#[tokio::test]
async fn already_in_progress() {
    let (server, _) = build_test_server();
    let pn = personal_number("19900101123");

    let response = server.get(&format!("/authenticate/{pn}")).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_uuid_v4(&body["orderRef"]);
    assert_uuid_v4(&body["autoStartToken"]);

    let response = server.get(&format!("/authenticate/{pn}")).await;
    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    let message = body["message"].as_str().expect("message");
    assert!(message.starts_with("AlreadyInProgress"));
}

#[tokio::test]
async fn every_request_gets_and_closes_own_client() {
    let (server, backend) = build_test_server();

    server
        .get(&format!("/authenticate/{}", personal_number("19900101123")))
        .await
        .assert_status_ok();
    server
        .get("/collect/invalid-uuid")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(backend.created(), 2);
    assert_eq!(backend.closed(), 2);
}
