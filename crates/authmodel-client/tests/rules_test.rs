//! Authorization-rule assertion traffic against a mock platform API.

mod common;

use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authmodel_client::rules::{PrincipalType, Rule, RuleEngine, Scope};

const LIMIT: u32 = 1000;

fn analyst_rule() -> Rule {
    let mut rule = Rule::grant(
        "Analysts",
        PrincipalType::Group,
        Scope::Container("/folders/folders/f1".to_string()),
        vec!["read".to_string(), "update".to_string()],
    );
    rule.description = "Automatically enabled by authmodel".to_string();
    rule
}

#[tokio::test]
async fn asserting_a_rule_deletes_all_duplicates_then_creates_one() {
    let server = MockServer::start().await;
    let client = common::client(&server);
    let engine = RuleEngine::new(&client, LIMIT);

    Mock::given(method("GET"))
        .and(path("/authorization/rules"))
        .and(query_param(
            "filter",
            "and(eq(principal,'Analysts'),eq(containerUri,'/folders/folders/f1'))",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 2,
            "items": [{ "id": "r1" }, { "id": "r2" }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/authorization/rules/r1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/authorization/rules/r2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/authorization/rules"))
        .and(header(
            "Content-Type",
            "application/vnd.platform.authorization.rule+json",
        ))
        .and(body_json(serde_json::json!({
            "permissions": ["read", "update"],
            "principal": "Analysts",
            "principalType": "group",
            "type": "grant",
            "enabled": true,
            "description": "Automatically enabled by authmodel",
            "containerUri": "/folders/folders/f1",
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    engine.assert(&analyst_rule()).await.unwrap();
}

#[tokio::test]
async fn asserting_an_absent_rule_creates_exactly_one() {
    let server = MockServer::start().await;
    let client = common::client(&server);
    let engine = RuleEngine::new(&client, LIMIT);

    Mock::given(method("GET"))
        .and(path("/authorization/rules"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "count": 0, "items": [] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/authorization/rules"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    engine.assert(&analyst_rule()).await.unwrap();
}

#[tokio::test]
async fn asserting_a_disabled_rule_only_deletes() {
    let server = MockServer::start().await;
    let client = common::client(&server);
    let engine = RuleEngine::new(&client, LIMIT);

    Mock::given(method("GET"))
        .and(path("/authorization/rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "items": [{ "id": "r1" }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/authorization/rules/r1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/authorization/rules"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let mut rule = analyst_rule();
    rule.enabled = false;
    engine.assert(&rule).await.unwrap();
}

#[tokio::test]
async fn every_scope_queries_by_principal_type_alone() {
    let server = MockServer::start().await;
    let client = common::client(&server);
    let engine = RuleEngine::new(&client, LIMIT);

    Mock::given(method("GET"))
        .and(path("/authorization/rules"))
        .and(query_param("filter", "eq(principalType,'authenticatedUsers')"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "count": 0, "items": [] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let rule = Rule::grant(
        "",
        PrincipalType::AuthenticatedUsers,
        Scope::Every,
        vec!["read".to_string()],
    );
    let ids = engine.existing_ids(&rule).await.unwrap();
    assert!(ids.is_empty());
}
