use std::time::Duration;

use netopsbot::channels::{ChatTransport, TransportError, WebexTransport};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(server: &MockServer) -> WebexTransport {
    WebexTransport::new(&server.uri(), "tok", "room-1", Duration::from_secs(5))
}

#[tokio::test]
async fn fetch_latest_reads_the_newest_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages"))
        .and(query_param("roomId", "room-1"))
        .and(query_param("max", "1"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "msg-1",
                "roomId": "room-1",
                "text": "/66070077 10.0.15.61 status",
                "personEmail": "ops@example.com",
                "created": "2024-10-01T08:00:00.000Z"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let message = transport(&server)
        .fetch_latest()
        .await
        .unwrap()
        .expect("one message");
    assert_eq!(message.id.as_deref(), Some("msg-1"));
    assert_eq!(message.text, "/66070077 10.0.15.61 status");
    assert_eq!(message.sender.as_deref(), Some("ops@example.com"));
}

#[tokio::test]
async fn empty_room_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    assert!(transport(&server).fetch_latest().await.unwrap().is_none());
}

#[tokio::test]
async fn unauthorized_fetch_is_a_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    match transport(&server).fetch_latest().await {
        Err(TransportError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "token expired");
        }
        other => panic!("Expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    assert!(matches!(
        transport(&server).fetch_latest().await,
        Err(TransportError::Decode(_))
    ));
}

#[tokio::test]
async fn post_text_sends_room_and_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({ "roomId": "room-1", "text": "Ok: Restconf" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "reply-1" })))
        .expect(1)
        .mount(&server)
        .await;

    transport(&server).post_text("Ok: Restconf").await.unwrap();
}

#[tokio::test]
async fn post_file_uploads_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    transport(&server)
        .post_file(
            "show running config",
            "show_run_66070077_R1.txt",
            b"hostname R1\n".to_vec(),
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    let content_type = request
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("multipart/form-data"));

    let body = String::from_utf8_lossy(&request.body);
    assert!(body.contains("name=\"roomId\""));
    assert!(body.contains("room-1"));
    assert!(body.contains("show running config"));
    assert!(body.contains("name=\"files\"; filename=\"show_run_66070077_R1.txt\""));
    assert!(body.contains("Content-Type: text/plain"));
    assert!(body.contains("hostname R1"));
}

#[tokio::test]
async fn post_failure_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(matches!(
        transport(&server).post_text("hello").await,
        Err(TransportError::Status { status: 503, .. })
    ));
}

#[tokio::test]
async fn health_check_reports_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/people/me"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "p1",
            "displayName": "NetOps Bot",
            "emails": ["bot@example.com"]
        })))
        .mount(&server)
        .await;

    assert_eq!(transport(&server).health_check().await.unwrap(), "NetOps Bot");
}
