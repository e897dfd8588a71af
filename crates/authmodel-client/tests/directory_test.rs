//! Directory operations against a mock platform API.

mod common;

use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authmodel_client::directory::{Directory, PrincipalKind, Principal, SUPER_ADMIN_GROUP};

const LIMIT: u32 = 1000;

#[tokio::test]
async fn group_validation_queries_by_exact_id_filter() {
    let server = MockServer::start().await;
    let client = common::client(&server);
    let directory = Directory::new(&client, LIMIT);

    Mock::given(method("GET"))
        .and(path("/identities/groups"))
        .and(query_param("filter", "eq(id,'analysts')"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "items": [{ "id": "analysts", "name": "Analysts" }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/identities/groups"))
        .and(query_param("filter", "eq(id,'ghosts')"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "count": 0, "items": [] })),
        )
        .mount(&server)
        .await;

    assert!(directory
        .validate("analysts", PrincipalKind::Group)
        .await
        .unwrap());
    assert!(!directory
        .validate("ghosts", PrincipalKind::Group)
        .await
        .unwrap());
}

#[tokio::test]
async fn users_are_assumed_to_exist_except_the_wildcard() {
    let server = MockServer::start().await;
    let client = common::client(&server);
    let directory = Directory::new(&client, LIMIT);

    // No mocks: user validation never touches the API.
    assert!(directory.validate("u1", PrincipalKind::User).await.unwrap());
    assert!(!directory.validate("*", PrincipalKind::User).await.unwrap());
}

#[tokio::test]
async fn creating_an_absent_group_posts_it() {
    let server = MockServer::start().await;
    let client = common::client(&server);
    let directory = Directory::new(&client, LIMIT);

    Mock::given(method("GET"))
        .and(path("/identities/groups"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "count": 0, "items": [] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/identities/groups"))
        .and(body_json(serde_json::json!({
            "id": "analysts",
            "name": "Analysts",
            "description": "Automatically created by authmodel",
            "state": "active",
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    directory.create_group("analysts", "Analysts", "").await.unwrap();
}

#[tokio::test]
async fn creating_an_existing_group_is_a_no_op() {
    let server = MockServer::start().await;
    let client = common::client(&server);
    let directory = Directory::new(&client, LIMIT);

    Mock::given(method("GET"))
        .and(path("/identities/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "items": [{ "id": "analysts", "name": "Analysts" }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/identities/groups"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    directory.create_group("analysts", "Analysts", "").await.unwrap();
}

#[tokio::test]
async fn creating_a_principal_nests_it_under_existing_parents() {
    let server = MockServer::start().await;
    let client = common::client(&server);
    let directory = Directory::new(&client, LIMIT);

    Mock::given(method("GET"))
        .and(path("/identities/groups"))
        .and(query_param("filter", "eq(id,'parent')"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "items": [{ "id": "parent", "name": "Parent" }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/identities/groups"))
        .and(query_param("filter", "eq(id,'missing')"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "count": 0, "items": [] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/identities/groups/parent/userMembers/u1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    // No nest call for the missing parent: item-scoped error, logged.

    let mut principal = Principal::user("u1");
    principal.parents = vec!["parent".to_string(), "missing".to_string()];
    directory.create(&principal).await.unwrap();
}

#[tokio::test]
async fn the_super_administrators_group_is_never_deleted() {
    let server = MockServer::start().await;
    let client = common::client(&server);
    let directory = Directory::new(&client, LIMIT);

    // No mocks: the refusal happens before any API call.
    let deleted = directory.delete_group(SUPER_ADMIN_GROUP).await.unwrap();
    assert!(!deleted);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn the_super_administrators_group_is_never_emptied() {
    let server = MockServer::start().await;
    let client = common::client(&server);
    let directory = Directory::new(&client, LIMIT);

    directory.remove_all_members(SUPER_ADMIN_GROUP).await.unwrap();
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn members_are_classified_and_string_counts_accepted() {
    let server = MockServer::start().await;
    let client = common::client(&server);
    let directory = Directory::new(&client, LIMIT);

    Mock::given(method("GET"))
        .and(path("/identities/groups/analysts/members"))
        .and(query_param("showDuplicates", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": "2",
            "items": [
                { "id": "u1", "type": "user" },
                { "id": "juniors", "type": "group" },
            ],
        })))
        .mount(&server)
        .await;

    let members = directory.members("analysts").await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].kind, PrincipalKind::User);
    assert_eq!(members[1].kind, PrincipalKind::Group);
}
