//! Session lifecycle against a mock platform API.

mod common;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authmodel_client::auth::Credentials;
use authmodel_client::{ClientError, Session, Settings};

#[tokio::test]
async fn connect_opens_and_elevates_storage_session() {
    let server = MockServer::start().await;
    common::mount_connect(&server).await;

    let session = Session::connect(
        Settings::new(server.uri()),
        Credentials::Token("test-token".to_string()),
    )
    .await
    .expect("connect");

    assert_eq!(session.storage_session().unwrap(), common::STORAGE_SESSION);
}

#[tokio::test]
async fn connect_fails_when_elevation_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/servers/shared-default/sessions"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "sess-1" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(
            "/storageAccess/servers/shared-default/admin/assumeRole/superUser",
        ))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = Session::connect(
        Settings::new(server.uri()),
        Credentials::Token("test-token".to_string()),
    )
    .await;

    assert!(matches!(result, Err(ClientError::Api { status: 403, .. })));
}

#[tokio::test]
async fn connect_rejects_malformed_base_url() {
    let result = Session::connect(
        Settings::new("not a url"),
        Credentials::Token("test-token".to_string()),
    )
    .await;
    assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
}

#[tokio::test]
async fn disconnect_tears_down_the_storage_session_once() {
    let server = MockServer::start().await;
    let mut session = common::connect(&server).await;

    Mock::given(method("DELETE"))
        .and(path(format!(
            "/storage/servers/shared-default/sessions/{}",
            common::STORAGE_SESSION
        )))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    session.disconnect().await;
    // Idempotent: the second disconnect issues no further delete.
    session.disconnect().await;

    assert!(matches!(
        session.storage_session(),
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn storage_session_validation_reflects_server_state() {
    let server = MockServer::start().await;
    let session = common::connect(&server).await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/storage/servers/shared-default/sessions/{}",
            common::STORAGE_SESSION
        )))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "id": common::STORAGE_SESSION })),
        )
        .mount(&server)
        .await;

    assert!(session.validate_storage_session().await.unwrap());
}

#[tokio::test]
async fn expired_storage_session_fails_validation() {
    let server = MockServer::start().await;
    let session = common::connect(&server).await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/storage/servers/shared-default/sessions/{}",
            common::STORAGE_SESSION
        )))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(!session.validate_storage_session().await.unwrap());
}
