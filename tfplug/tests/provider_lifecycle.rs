//! Drives a resource through create, refresh, update and destroy over the
//! gRPC service, the way Terraform sequences the calls

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tfplug::grpc::ProviderService;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::proto::tfplugin6 as proto;
use tfplug::proto::tfplugin6::provider_server::Provider;
use tfplug::request::*;
use tfplug::types::{decode_msgpack, encode_msgpack};
use tfplug::{
    AttributeBuilder, Context, DataSourceSchema, DataSourceV2, Diagnostics, Dynamic, ProviderV2,
    ResourceSchema, ResourceV2, Result, SchemaBuilder, State, StateBuilder, StaticNumber,
};
use tokio::sync::Mutex;
use tonic::Request;

type Store = Arc<Mutex<HashMap<String, HashMap<String, Dynamic>>>>;

struct MemoryProvider {
    store: Store,
}

fn widget_schema() -> ResourceSchema {
    SchemaBuilder::new()
        .attribute(
            AttributeBuilder::string("id")
                .computed()
                .plan_modifier(Box::new(UseStateForUnknown)),
        )
        .attribute(
            AttributeBuilder::string("org_id")
                .required()
                .plan_modifier(Box::new(RequiresReplaceIfChanged)),
        )
        .attribute(AttributeBuilder::string("name").required())
        .attribute(
            AttributeBuilder::number("retention")
                .optional()
                .computed()
                .default(Box::new(StaticNumber::new(0.0))),
        )
        .attribute(AttributeBuilder::string("updated_at").computed())
        .build()
}

#[async_trait]
impl ProviderV2 for MemoryProvider {
    fn type_name(&self) -> &str {
        "memory"
    }

    fn provider_schema(&self) -> tfplug::Schema {
        SchemaBuilder::new().build()
    }

    async fn configure(&mut self, _request: ConfigureRequest) -> ConfigureResponse {
        ConfigureResponse {
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create_resource(&self, name: &str) -> Result<Box<dyn ResourceV2>> {
        match name {
            "memory_widget" => Ok(Box::new(Widget {
                store: self.store.clone(),
            })),
            _ => Err(format!("Unknown resource type: {}", name).into()),
        }
    }

    async fn create_data_source(&self, name: &str) -> Result<Box<dyn DataSourceV2>> {
        Err(format!("Unknown data source type: {}", name).into())
    }

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema> {
        HashMap::from([("memory_widget".to_string(), widget_schema())])
    }

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema> {
        HashMap::new()
    }
}

struct Widget {
    store: Store,
}

impl Widget {
    fn stamp(state: State, revision: usize) -> State {
        let mut values = state.values;
        values.insert("updated_at".to_string(), Dynamic::from(format!("r{}", revision)));
        State::from_values(values)
    }
}

#[async_trait]
impl ResourceV2 for Widget {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut store = self.store.lock().await;
        let id = format!("w{}", store.len() + 1);
        let mut state = request.planned_state;
        state.set("id", id.as_str());
        let state = Self::stamp(state, 1);
        store.insert(id, state.values.clone());
        CreateResponse {
            state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let id = request.current_state.get_string("id").unwrap_or_default();
        let store = self.store.lock().await;
        ReadResponse {
            state: store.get(&id).cloned().map(State::from_values),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let state = Self::stamp(request.planned_state, 2);
        let id = state.get_string("id").unwrap_or_default();
        self.store.lock().await.insert(id, state.values.clone());
        UpdateResponse {
            state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let id = request.current_state.get_string("id").unwrap_or_default();
        self.store.lock().await.remove(&id);
        DeleteResponse {
            diagnostics: Diagnostics::new(),
        }
    }
}

fn value(values: Option<HashMap<String, Dynamic>>) -> Option<proto::DynamicValue> {
    let value = values.map_or(Dynamic::Null, Dynamic::Map);
    Some(proto::DynamicValue {
        msgpack: encode_msgpack(&value).unwrap(),
        json: vec![],
    })
}

fn object(value: Option<proto::DynamicValue>) -> Option<HashMap<String, Dynamic>> {
    match decode_msgpack(&value.unwrap().msgpack).unwrap() {
        Dynamic::Map(values) => Some(values),
        Dynamic::Null => None,
        other => panic!("unexpected value {:?}", other),
    }
}

fn config(org_id: &str, name: &str) -> HashMap<String, Dynamic> {
    StateBuilder::new()
        .value("id", Dynamic::Null)
        .string("org_id", org_id)
        .string("name", name)
        .value("retention", Dynamic::Null)
        .value("updated_at", Dynamic::Null)
        .build()
        .values
}

async fn plan(
    service: &ProviderService<MemoryProvider>,
    prior: Option<HashMap<String, Dynamic>>,
    proposed: Option<HashMap<String, Dynamic>>,
    config: HashMap<String, Dynamic>,
) -> proto::plan_resource_change::Response {
    service
        .plan_resource_change(Request::new(proto::plan_resource_change::Request {
            type_name: "memory_widget".to_string(),
            prior_state: value(prior),
            proposed_new_state: value(proposed),
            config: value(Some(config)),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner()
}

async fn apply(
    service: &ProviderService<MemoryProvider>,
    prior: Option<HashMap<String, Dynamic>>,
    planned: Option<HashMap<String, Dynamic>>,
    config: HashMap<String, Dynamic>,
) -> Option<HashMap<String, Dynamic>> {
    let response = service
        .apply_resource_change(Request::new(proto::apply_resource_change::Request {
            type_name: "memory_widget".to_string(),
            prior_state: value(prior),
            planned_state: value(planned),
            config: value(Some(config)),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(response.diagnostics.is_empty());
    object(response.new_state)
}

#[tokio::test]
async fn full_lifecycle() {
    let store = Store::default();
    let service = ProviderService::new(MemoryProvider {
        store: store.clone(),
    });

    // create
    let cfg = config("org1", "alpha");
    let planned = object(plan(&service, None, Some(cfg.clone()), cfg.clone()).await.planned_state)
        .unwrap();
    assert!(planned["id"].is_unknown());
    assert_eq!(planned["retention"], Dynamic::Number(0.0));

    let created = apply(&service, None, Some(planned), cfg).await.unwrap();
    assert_eq!(created["id"], Dynamic::from("w1"));
    assert_eq!(created["updated_at"], Dynamic::from("r1"));

    // refresh
    let refreshed = service
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "memory_widget".to_string(),
            current_state: value(Some(created.clone())),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(object(refreshed.new_state).unwrap(), created);

    // in-place update
    let cfg = config("org1", "beta");
    let mut proposed = created.clone();
    proposed.insert("name".to_string(), Dynamic::from("beta"));
    let response = plan(&service, Some(created.clone()), Some(proposed), cfg.clone()).await;
    assert!(response.requires_replace.is_empty());
    let planned = object(response.planned_state).unwrap();
    assert!(planned["updated_at"].is_unknown());
    assert_eq!(planned["id"], Dynamic::from("w1"));

    let updated = apply(&service, Some(created.clone()), Some(planned), cfg)
        .await
        .unwrap();
    assert_eq!(updated["name"], Dynamic::from("beta"));
    assert_eq!(updated["updated_at"], Dynamic::from("r2"));

    // changing org_id forces replacement
    let cfg = config("org2", "beta");
    let mut proposed = updated.clone();
    proposed.insert("org_id".to_string(), Dynamic::from("org2"));
    let response = plan(&service, Some(updated.clone()), Some(proposed), cfg.clone()).await;
    assert_eq!(response.requires_replace.len(), 1);

    // destroy
    let destroyed = apply(&service, Some(updated), None, cfg).await;
    assert!(destroyed.is_none());
    assert!(store.lock().await.is_empty());
}

#[tokio::test]
async fn refresh_of_deleted_object_drops_state() {
    let service = ProviderService::new(MemoryProvider {
        store: Store::default(),
    });

    let response = service
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "memory_widget".to_string(),
            current_state: value(Some(config("org1", "ghost"))),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(object(response.new_state).is_none());
}

#[tokio::test]
async fn timeout_context_cancels_long_operation() {
    let ctx = Context::new().with_timeout(Duration::from_millis(20));

    let outcome = tokio::select! {
        _ = ctx.cancelled() => "cancelled",
        _ = tokio::time::sleep(Duration::from_secs(5)) => "finished",
    };

    assert_eq!(outcome, "cancelled");
}

#[tokio::test]
async fn concurrent_resource_operations_share_provider() {
    let store = Store::default();
    let service = Arc::new(ProviderService::new(MemoryProvider {
        store: store.clone(),
    }));

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let cfg = config("org1", &format!("widget-{}", i));
            let planned = object(
                plan(&service, None, Some(cfg.clone()), cfg.clone())
                    .await
                    .planned_state,
            );
            apply(&service, None, planned, cfg).await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }
    assert_eq!(store.lock().await.len(), 8);
}
