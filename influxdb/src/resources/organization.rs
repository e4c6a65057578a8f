//! `influxdb_organization` resource

use crate::api::orgs::{Organization, PatchOrganizationRequest, PostOrganizationRequest};
use crate::api::{cancellable, Client};
use async_trait::async_trait;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
use tfplug::{AttributeBuilder, Diagnostics, ResourceSchema, ResourceV2, SchemaBuilder, State, StateBuilder};

use super::{add_api_error, echo_optional, required_string, Operation};

pub struct OrganizationResource {
    client: Client,
}

impl OrganizationResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .description("Create and manage organizations.")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("An organization ID."),
            )
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .description("The name of the organization."),
            )
            .attribute(
                AttributeBuilder::string("description")
                    .optional()
                    .description("The description of the organization."),
            )
            .attribute(
                AttributeBuilder::string("created_at")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("Organization creation date."),
            )
            .attribute(
                AttributeBuilder::string("updated_at")
                    .computed()
                    .description("Last Organization update date."),
            )
            .build()
    }
}

/// Attributes shared by the resource and the organization data sources
pub(crate) fn organization_values(org: &Organization) -> StateBuilder {
    StateBuilder::new()
        .string("id", &org.id)
        .string("name", &org.name)
        .optional_string("created_at", org.created_at.clone())
        .optional_string("updated_at", org.updated_at.clone())
}

fn organization_state(org: &Organization, configured_description: Option<String>) -> State {
    organization_values(org)
        .optional_string(
            "description",
            echo_optional(org.description.clone(), configured_description),
        )
        .build()
}

#[async_trait]
impl ResourceV2 for OrganizationResource {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let plan = &request.planned_state;

        let Some(name) = required_string(plan, "name", &mut diagnostics) else {
            return CreateResponse {
                state: request.planned_state,
                diagnostics,
            };
        };
        let description = plan.get_string("description");

        let body = PostOrganizationRequest {
            name,
            description: description.clone(),
        };

        match cancellable(&request.context, self.client.orgs().create(&body)).await {
            Ok(org) => {
                tracing::info!(id = %org.id, name = %org.name, "created organization");
                CreateResponse {
                    state: organization_state(&org, description),
                    diagnostics,
                }
            }
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Create, "organization", &e);
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

        match cancellable(&request.context, self.client.orgs().get(&id)).await {
            Ok(org) => ReadResponse {
                state: Some(organization_state(&org, current.get_string("description"))),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(%id, "organization not found, removing from state");
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Read, "organization", &e);
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
        let description = plan.get_string("description");

        // An empty description clears it on the server
        let body = PatchOrganizationRequest {
            name: Some(name),
            description: Some(description.clone().unwrap_or_default()),
        };

        match cancellable(&request.context, self.client.orgs().update(&id, &body)).await {
            Ok(org) => UpdateResponse {
                state: organization_state(&org, description),
                diagnostics,
            },
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Update, "organization", &e);
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

        match cancellable(&request.context, self.client.orgs().delete(&id)).await {
            Ok(()) => tracing::info!(%id, "deleted organization"),
            Err(e) if e.is_not_found() => {}
            Err(e) => add_api_error(&mut diagnostics, Operation::Delete, "organization", &e),
        }

        DeleteResponse { diagnostics }
    }
}
