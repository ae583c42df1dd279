//! HttpAuraApi against a canned HTTP responder on localhost.

use aura_core::AuraError;
use aura_core::api::{AuraApi, Credentials};
use aura_core::config::ClientConfig;
use aura_core::record::AnalysisStatus;
use aura_core::session::Role;
use aura_interaction::HttpAuraApi;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves `status` + `body` to every connection and returns the base URL.
async fn serve(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = vec![0u8; 16 * 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}/api", addr)
}

fn api(base_url: String) -> HttpAuraApi {
    let config = ClientConfig {
        api_base_url: base_url,
        request_timeout_secs: 5,
        ..Default::default()
    };
    HttpAuraApi::new(&config).unwrap()
}

#[tokio::test]
async fn test_login_decodes_session() {
    let base = serve(
        "200 OK",
        r#"{"access_token":"tok","user_info":{"id":"u1","userName":"an","role":"ADMIN"},"is_new_user":false}"#,
    )
    .await;
    let outcome = api(base).login(&Credentials::new("an", "pw")).await.unwrap();
    assert_eq!(outcome.token, "tok");
    assert_eq!(outcome.profile.role, Some(Role::Admin));
}

#[tokio::test]
async fn test_unauthorized_maps_to_session_expired() {
    let base = serve("401 Unauthorized", r#"{"detail":"Not authenticated"}"#).await;
    let err = api(base).list_records("stale").await.unwrap_err();
    assert_eq!(err, AuraError::SessionExpired);
}

#[tokio::test]
async fn test_validation_detail_is_surfaced() {
    let base = serve(
        "422 Unprocessable Entity",
        r#"{"detail":[{"msg":"Số điện thoại không hợp lệ"}]}"#,
    )
    .await;
    let err = api(base)
        .update_profile("tok", &Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Số điện thoại không hợp lệ");
}

#[tokio::test]
async fn test_undecodable_body_is_malformed() {
    let base = serve("200 OK", r#"{"id":"r1","status":"mystery"}"#).await;
    let err = api(base).get_record("tok", "r1").await.unwrap_err();
    assert!(err.is_malformed(), "{err:?}");
}

#[tokio::test]
async fn test_record_is_decoded() {
    let base = serve(
        "200 OK",
        r#"{"id":"r1","status":"Hoàn thành","result":"Nhẹ (Mild DR) (81.5%)","date":"01/03/2025","time":"08:30"}"#,
    )
    .await;
    let record = api(base).get_record("tok", "r1").await.unwrap();
    assert_eq!(record.status, AnalysisStatus::Completed);
    assert_eq!(record.diagnosis().unwrap().confidence, Some(81.5));
}

#[tokio::test]
async fn test_refused_connection_is_connectivity() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = api(format!("http://{}/api", addr))
        .list_chats("tok")
        .await
        .unwrap_err();
    assert!(err.is_connectivity(), "{err:?}");
}
