use influxdb::InfluxDbProvider;
use mockito::{Matcher, Server, ServerGuard};
use std::collections::HashMap;
use tfplug::request::{
    ConfigureRequest, CreateRequest, DataSourceReadRequest, DeleteRequest, ReadRequest,
    UpdateRequest,
};
use tfplug::{Config, Context, Dynamic, ProviderV2, State};

fn values(pairs: &[(&str, Dynamic)]) -> HashMap<String, Dynamic> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

async fn configured_provider(server: &mut ServerGuard) -> InfluxDbProvider {
    let _ping = server
        .mock("GET", "/ping")
        .match_header("authorization", "Token integration-token")
        .with_status(204)
        .create_async()
        .await;

    let mut provider = InfluxDbProvider::new();
    let response = provider
        .configure(ConfigureRequest {
            context: Context::new(),
            terraform_version: "1.9.0".to_string(),
            config: Config::from_values(values(&[
                ("url", server.url().into()),
                ("token", "integration-token".into()),
            ])),
        })
        .await;
    assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
    provider
}

#[tokio::test(flavor = "multi_thread")]
async fn bucket_lifecycle_through_provider() {
    let mut server = Server::new_async().await;
    let provider = configured_provider(&mut server).await;
    let bucket = provider.create_resource("influxdb_bucket").await.unwrap();

    let create = server
        .mock("POST", "/api/v2/buckets")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "orgID": "o1",
            "name": "metrics",
            "retentionRules": [{"type": "expire", "everySeconds": 2592000}]
        })))
        .with_status(201)
        .with_body(
            r#"{"id":"b1","orgID":"o1","type":"user","name":"metrics",
                "retentionRules":[{"type":"expire","everySeconds":2592000}],
                "createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}"#,
        )
        .create_async()
        .await;

    let planned = State::from_values(values(&[
        ("id", Dynamic::Unknown),
        ("org_id", "o1".into()),
        ("name", "metrics".into()),
        ("type", "user".into()),
        ("description", Dynamic::Unknown),
        ("retention_period", Dynamic::Number(2_592_000.0)),
        ("created_at", Dynamic::Unknown),
        ("updated_at", Dynamic::Unknown),
    ]));
    let created = bucket
        .create(CreateRequest {
            context: Context::new(),
            config: Config::from_values(values(&[
                ("org_id", "o1".into()),
                ("name", "metrics".into()),
            ])),
            planned_state: planned,
        })
        .await;
    assert!(created.diagnostics.errors.is_empty());
    assert_eq!(created.state.get_string("id"), Some("b1".to_string()));
    assert_eq!(created.state.get_number("retention_period"), Some(2_592_000.0));
    create.assert_async().await;

    let update = server
        .mock("PATCH", "/api/v2/buckets/b1")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "name": "metrics",
            "retentionRules": [{"type": "expire", "everySeconds": 604800}]
        })))
        .with_status(200)
        .with_body(
            r#"{"id":"b1","orgID":"o1","type":"user","name":"metrics",
                "retentionRules":[{"type":"expire","everySeconds":604800}]}"#,
        )
        .create_async()
        .await;

    let mut planned = created.state.clone();
    planned.set("retention_period", Dynamic::Number(604_800.0));
    let updated = bucket
        .update(UpdateRequest {
            context: Context::new(),
            config: Config::from_values(values(&[
                ("org_id", "o1".into()),
                ("name", "metrics".into()),
                ("retention_period", Dynamic::Number(604_800.0)),
            ])),
            planned_state: planned,
            current_state: created.state.clone(),
        })
        .await;
    assert!(updated.diagnostics.errors.is_empty());
    assert_eq!(updated.state.get_number("retention_period"), Some(604_800.0));
    update.assert_async().await;

    let _gone = server
        .mock("GET", "/api/v2/buckets/b1")
        .with_status(404)
        .with_body(r#"{"code":"not found","message":"bucket not found"}"#)
        .create_async()
        .await;
    let read = bucket
        .read(ReadRequest {
            context: Context::new(),
            current_state: updated.state.clone(),
        })
        .await;
    assert!(read.state.is_none());

    let delete = server
        .mock("DELETE", "/api/v2/buckets/b1")
        .with_status(404)
        .with_body(r#"{"code":"not found","message":"bucket not found"}"#)
        .create_async()
        .await;
    let deleted = bucket
        .delete(DeleteRequest {
            context: Context::new(),
            current_state: updated.state,
        })
        .await;
    assert!(deleted.diagnostics.errors.is_empty());
    delete.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn user_moves_between_organizations() {
    let mut server = Server::new_async().await;
    let provider = configured_provider(&mut server).await;
    let user = provider.create_resource("influxdb_user").await.unwrap();

    let patch = server
        .mock("PATCH", "/api/v2/users/u1")
        .with_status(200)
        .with_body(r#"{"id":"u1","name":"jane","status":"active"}"#)
        .create_async()
        .await;
    let remove = server
        .mock("DELETE", "/api/v2/orgs/o1/members/u1")
        .with_status(204)
        .create_async()
        .await;
    let add = server
        .mock("POST", "/api/v2/orgs/o2/owners")
        .match_body(Matcher::Json(serde_json::json!({"id": "u1"})))
        .with_status(201)
        .with_body(r#"{"id":"u1","name":"jane","role":"owner"}"#)
        .create_async()
        .await;

    let current = State::from_values(values(&[
        ("id", "u1".into()),
        ("name", "jane".into()),
        ("password", "hunter22".into()),
        ("status", "active".into()),
        ("org_id", "o1".into()),
        ("org_role", "member".into()),
    ]));
    let mut planned = current.clone();
    planned.set("org_id", "o2");
    planned.set("org_role", "owner");

    let response = user
        .update(UpdateRequest {
            context: Context::new(),
            config: Config::from_values(planned.values.clone()),
            planned_state: planned,
            current_state: current,
        })
        .await;

    assert!(response.diagnostics.errors.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(response.state.get_string("org_id"), Some("o2".to_string()));
    assert_eq!(response.state.get_string("org_role"), Some("owner".to_string()));
    patch.assert_async().await;
    remove.assert_async().await;
    add.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn organizations_data_source_through_provider() {
    let mut server = Server::new_async().await;
    let provider = configured_provider(&mut server).await;

    let _orgs = server
        .mock("GET", "/api/v2/orgs")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"orgs":[{"id":"o1","name":"acme","description":"Acme"}]}"#)
        .create_async()
        .await;

    let data_source = provider
        .create_data_source("influxdb_organizations")
        .await
        .unwrap();
    let response = data_source
        .read(DataSourceReadRequest {
            context: Context::new(),
            config: Config::from_values(HashMap::new()),
        })
        .await;

    let state = response.state.unwrap();
    let orgs = state.get_list("organizations").unwrap();
    assert_eq!(orgs[0].as_map().unwrap()["name"], Dynamic::from("acme"));
}

#[tokio::test]
async fn unconfigured_provider_refuses_resources() {
    let provider = InfluxDbProvider::new();
    assert!(provider.create_resource("influxdb_bucket").await.is_err());
    assert!(provider.create_data_source("influxdb_buckets").await.is_err());
}
