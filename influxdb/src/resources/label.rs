//! `influxdb_label` resource

use crate::api::labels::{Label, PatchLabelRequest, PostLabelRequest};
use crate::api::{cancellable, Client};
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
use tfplug::{
    AttributeBuilder, AttributeType, Diagnostics, Dynamic, ResourceSchema, ResourceV2,
    SchemaBuilder, State, StateBuilder,
};

use super::{add_api_error, required_string, Operation};

pub struct LabelResource {
    client: Client,
}

impl LabelResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .description("Create and manage labels.")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("The label ID."),
            )
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .description("The label name."),
            )
            .attribute(
                AttributeBuilder::string("org_id")
                    .required()
                    .plan_modifier(Box::new(RequiresReplaceIfChanged))
                    .description("The organization ID."),
            )
            .attribute(
                AttributeBuilder::map("properties", AttributeType::String)
                    .optional()
                    .description("The key-value pairs associated with this label."),
            )
            .build()
    }
}

pub(crate) fn properties_from_value(value: &Dynamic) -> Option<HashMap<String, String>> {
    value.as_map().map(|map| {
        map.iter()
            .filter_map(|(key, value)| value.as_string().map(|v| (key.clone(), v.to_string())))
            .collect()
    })
}

/// Properties to send when updating a label
///
/// The API merges properties, so every key that was in state but is no
/// longer planned is sent with an empty value to remove it.
pub(crate) fn reconcile_properties(
    planned: Option<&HashMap<String, String>>,
    prior: Option<&HashMap<String, String>>,
) -> HashMap<String, String> {
    let mut properties = planned.cloned().unwrap_or_default();

    for key in prior.into_iter().flat_map(HashMap::keys) {
        properties.entry(key.clone()).or_default();
    }

    properties
}

/// Attributes shared by the resource and the label data sources
pub(crate) fn label_values(label: &Label) -> StateBuilder {
    StateBuilder::new()
        .string("id", &label.id)
        .string("name", &label.name)
        .optional_string("org_id", label.org_id.clone())
}

/// Unconfigured properties stay null. Configured ones follow the server,
/// which omits the map once it is empty.
fn label_state(label: &Label, properties_configured: bool) -> State {
    let properties = if properties_configured {
        Some(label.properties.clone().unwrap_or_default())
    } else {
        None
    };

    label_values(label)
        .string_map("properties", properties.as_ref())
        .build()
}

#[async_trait]
impl ResourceV2 for LabelResource {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let plan = &request.planned_state;

        let (Some(org_id), Some(name)) = (
            required_string(plan, "org_id", &mut diagnostics),
            required_string(plan, "name", &mut diagnostics),
        ) else {
            return CreateResponse {
                state: request.planned_state,
                diagnostics,
            };
        };
        let properties = properties_from_value(plan.get("properties"));

        let body = PostLabelRequest {
            org_id,
            name,
            properties: properties.clone(),
        };

        match cancellable(&request.context, self.client.labels().create(&body)).await {
            Ok(label) => {
                tracing::info!(id = %label.id, name = %label.name, "created label");
                CreateResponse {
                    state: label_state(&label, properties.is_some()),
                    diagnostics,
                }
            }
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Create, "label", &e);
                CreateResponse {
                    state: request.planned_state,
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let current = &request.current_state;

        let Some(id) = required_string(current, "id", &mut diagnostics) else {
            return ReadResponse {
                state: Some(request.current_state),
                diagnostics,
            };
        };

        match cancellable(&request.context, self.client.labels().get(&id)).await {
            Ok(label) => {
                // Properties added outside Terraform show up as drift
                let configured = !current.is_null("properties")
                    || label.properties.as_ref().is_some_and(|p| !p.is_empty());
                ReadResponse {
                    state: Some(label_state(&label, configured)),
                    diagnostics,
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(%id, "label not found, removing from state");
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Read, "label", &e);
                ReadResponse {
                    state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let mut diagnostics = Diagnostics::new();
        let plan = &request.planned_state;

        let (Some(id), Some(name)) = (
            required_string(&request.current_state, "id", &mut diagnostics),
            required_string(plan, "name", &mut diagnostics),
        ) else {
            return UpdateResponse {
                state: request.current_state,
                diagnostics,
            };
        };

        let planned = properties_from_value(plan.get("properties"));
        let prior = properties_from_value(request.current_state.get("properties"));
        let properties = reconcile_properties(planned.as_ref(), prior.as_ref());

        let body = PatchLabelRequest {
            name: Some(name),
            properties: (!properties.is_empty()).then_some(properties),
        };

        match cancellable(&request.context, self.client.labels().update(&id, &body)).await {
            Ok(label) => UpdateResponse {
                state: label_state(&label, planned.is_some()),
                diagnostics,
            },
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Update, "label", &e);
                UpdateResponse {
                    state: request.current_state,
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();

        let Some(id) = required_string(&request.current_state, "id", &mut diagnostics) else {
            return DeleteResponse { diagnostics };
        };

        match cancellable(&request.context, self.client.labels().delete(&id)).await {
            Ok(()) => tracing::info!(%id, "deleted label"),
            Err(e) if e.is_not_found() => {}
            Err(e) => add_api_error(&mut diagnostics, Operation::Delete, "label", &e),
        }

        DeleteResponse { diagnostics }
    }
}
