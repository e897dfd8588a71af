//! Shared helpers for integration tests against a mock platform API.
#![allow(dead_code)]

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authmodel_client::auth::Credentials;
use authmodel_client::{PlatformClient, Session, Settings};

pub const STORAGE_SESSION: &str = "sess-1";

/// A bare authenticated client pointed at the mock server.
pub fn client(server: &MockServer) -> PlatformClient {
    let settings = Settings::new(server.uri());
    let http = PlatformClient::build_http(&settings).expect("http client");
    PlatformClient::new(server.uri(), "test-token".to_string(), http)
}

/// Mount the storage-session creation and privilege-elevation mocks that
/// every successful connect performs.
pub async fn mount_connect(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/storage/servers/shared-default/sessions"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": STORAGE_SESSION })),
        )
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path(
            "/storageAccess/servers/shared-default/admin/assumeRole/superUser",
        ))
        .and(query_param("sessionId", STORAGE_SESSION))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// A fully connected session against the mock server.
pub async fn connect(server: &MockServer) -> Session {
    mount_connect(server).await;
    Session::connect(
        Settings::new(server.uri()),
        Credentials::Token("test-token".to_string()),
    )
    .await
    .expect("session connect")
}
