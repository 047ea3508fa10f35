mod common;

use common::{bob, client, client_for, signed_in, token_pair};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::Method;
use kitchensink_client::{RequestOptions, ResponseBody};
use kitchensink_core::{AuthEvent, ClientError, SignOutReason};
use serde_json::json;
use std::io::{Read, Write};
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONTACTS: &str = "/api/kitchensink/contacts";

#[tokio::test]
async fn test_missing_token_fails_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let mut events = client.subscribe();

    let err = client
        .gateway()
        .request(CONTACTS, RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::AuthenticationRequired));
    assert_eq!(err.to_string(), "Authentication required.");
    assert_eq!(
        events.try_recv().unwrap(),
        AuthEvent::SignedOut {
            reason: SignOutReason::AuthenticationRequired
        }
    );
}

#[tokio::test]
async fn test_valid_token_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTACTS))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = signed_in(&server, bob()).await;
    let body = client
        .gateway()
        .request(CONTACTS, RequestOptions::get())
        .await
        .unwrap();
    assert_eq!(body, Some(ResponseBody::Json(json!([]))));
    assert_eq!(client.session_store().access_token().await.as_deref(), Some("A1"));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTACTS))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .and(body_json(json!({ "refreshToken": "R1" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_pair("A2", "R2", "bob", &["ROLE_USER"])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CONTACTS))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "x": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in(&server, bob()).await;
    let mut events = client.subscribe();

    let body = client
        .gateway()
        .request(CONTACTS, RequestOptions::get())
        .await
        .unwrap();
    assert_eq!(body, Some(ResponseBody::Json(json!({ "x": 1 }))));

    let session = client.session_store().snapshot().await;
    assert_eq!(session.access_token(), Some("A2"));
    assert_eq!(session.refresh_token(), Some("R2"));
    assert_eq!(events.try_recv().unwrap(), AuthEvent::TokenRefreshed(bob()));
}

#[tokio::test]
async fn test_rejected_refresh_tears_down_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTACTS))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(body_json(json!({ "refreshToken": "R1" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in(&server, bob()).await;
    let mut events = client.subscribe();

    let err = client
        .gateway()
        .request(CONTACTS, RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));
    assert!(client.session_store().snapshot().await.is_empty());
    assert_eq!(
        events.try_recv().unwrap(),
        AuthEvent::SignedOut {
            reason: SignOutReason::SessionExpired
        }
    );
}

#[tokio::test]
async fn test_unauthorized_retry_is_not_refreshed_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTACTS))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_pair("A2", "R2", "bob", &["ROLE_USER"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in(&server, bob()).await;
    let err = client
        .gateway()
        .request(CONTACTS, RequestOptions::get())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "Unauthorized");
    assert_eq!(client.session_store().access_token().await.as_deref(), Some("A2"));
}

#[tokio::test]
async fn test_concurrent_unauthorized_calls_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTACTS))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_pair("A2", "R2", "bob", &["ROLE_USER"]))
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CONTACTS))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let client = signed_in(&server, bob()).await;
    let gateway = client.gateway();
    let (first, second) = tokio::join!(
        gateway.request(CONTACTS, RequestOptions::get()),
        gateway.request(CONTACTS, RequestOptions::get()),
    );

    assert_eq!(first.unwrap(), Some(ResponseBody::Json(json!([]))));
    assert_eq!(second.unwrap(), Some(ResponseBody::Json(json!([]))));
}

#[tokio::test]
async fn test_response_bodies_by_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/kitchensink/contacts/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/kitchensink/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/kitchensink/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = signed_in(&server, bob()).await;
    let gateway = client.gateway();

    let deleted = gateway
        .request("/api/kitchensink/contacts/1", RequestOptions::delete())
        .await
        .unwrap();
    assert_eq!(deleted, None);

    let text = gateway
        .request("/api/kitchensink/notes", RequestOptions::get())
        .await
        .unwrap();
    assert_eq!(text, Some(ResponseBody::Text("plain text".into())));

    let empty = gateway
        .request("/api/kitchensink/empty", RequestOptions::get())
        .await
        .unwrap();
    assert_eq!(empty, None);
}

#[tokio::test]
async fn test_server_error_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTACTS))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "timestamp": "2024-05-01T10:00:00",
            "status": 500,
            "error": "Internal Server Error",
            "message": "Database unavailable",
            "path": CONTACTS,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in(&server, bob()).await;
    let mut events = client.subscribe();

    let err = client
        .gateway()
        .request(CONTACTS, RequestOptions::get())
        .await
        .unwrap_err();
    match err {
        ClientError::RequestFailed { status, message } => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "Database unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(client.session_store().is_authenticated().await);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_error_without_body_has_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTACTS))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = signed_in(&server, bob()).await;
    let err = client
        .gateway()
        .request(CONTACTS, RequestOptions::get())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTP error, status 403");
}

#[tokio::test]
async fn test_network_failure_has_no_status() {
    let client = client_for(&format!("http://127.0.0.1:{}", closed_port()));
    client
        .session_store()
        .set_session("A1".into(), "R1".into(), bob())
        .await
        .unwrap();

    let err = client
        .gateway()
        .request(CONTACTS, RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RequestFailed { status: None, .. }));
    assert!(client.session_store().is_authenticated().await);
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// Answers one request with 401 and closes the listener, so later connections are refused.
fn unauthorized_once() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream
            .write_all(b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .unwrap();
    });
    format!("http://127.0.0.1:{port}{CONTACTS}")
}

#[tokio::test]
async fn test_refresh_network_failure_tears_down_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONTACTS))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    // Refresh and logout go to the base URL, where nothing listens.
    let client = client_for(&format!("http://127.0.0.1:{}", closed_port()));
    client
        .session_store()
        .set_session("A1".into(), "R1".into(), bob())
        .await
        .unwrap();
    let mut events = client.subscribe();

    let err = client
        .gateway()
        .request(&format!("{}{CONTACTS}", server.uri()), RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));
    assert!(client.session_store().snapshot().await.is_empty());
    assert_eq!(
        events.try_recv().unwrap(),
        AuthEvent::SignedOut {
            reason: SignOutReason::SessionExpired
        }
    );
}

#[tokio::test]
async fn test_retry_network_failure_keeps_refreshed_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .and(body_json(json!({ "refreshToken": "R1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_pair("A2", "R2", "bob", &["ROLE_USER"]))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in(&server, bob()).await;
    let mut events = client.subscribe();
    let resource = unauthorized_once();

    let err = client
        .gateway()
        .request(&resource, RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RequestFailed { status: None, .. }));

    let session = client.session_store().snapshot().await;
    assert_eq!(session.access_token(), Some("A2"));
    assert_eq!(session.refresh_token(), Some("R2"));
    assert_eq!(events.try_recv().unwrap(), AuthEvent::TokenRefreshed(bob()));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_mutating_body_defaults_to_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CONTACTS))
        .and(header("content-type", "application/json"))
        .and(body_string(r#"{"name":"Jane"}"#))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "9" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/kitchensink/contacts/9"))
        .and(header("content-type", "text/plain"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in(&server, bob()).await;
    let gateway = client.gateway();

    gateway
        .request(
            CONTACTS,
            RequestOptions::new(Method::POST).body(r#"{"name":"Jane"}"#),
        )
        .await
        .unwrap();
    gateway
        .request(
            "/api/kitchensink/contacts/9",
            RequestOptions::new(Method::PUT)
                .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
                .body("Jane"),
        )
        .await
        .unwrap();
}
