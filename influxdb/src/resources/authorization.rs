//! `influxdb_authorization` resource
//!
//! Permissions and description are fixed once the token exists, so changing
//! either replaces the authorization. Only `status` is updated in place.

use crate::api::authorizations::{
    Authorization, PatchAuthorizationRequest, Permission, PermissionResource,
    PostAuthorizationRequest, PERMISSION_RESOURCE_TYPES,
};
use crate::api::{cancellable, Client};
use async_trait::async_trait;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
use tfplug::schema::Attribute;
use tfplug::validator::{OneOf, UniqueValues};
use tfplug::{
    AttributeBuilder, AttributePath, Diagnostics, Dynamic, ResourceSchema, ResourceV2,
    SchemaBuilder, State, StateBuilder, StaticString,
};

use super::{add_api_error, echo_optional, required_string, Operation};

pub struct AuthorizationResource {
    client: Client,
}

impl AuthorizationResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .description("Create and manage authorizations.")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("The authorization ID."),
            )
            .attribute(
                AttributeBuilder::string("token")
                    .computed()
                    .sensitive()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("The API token."),
            )
            .attribute(
                AttributeBuilder::string("status")
                    .optional()
                    .computed()
                    .default(Box::new(StaticString::new("active")))
                    .validator(Box::new(OneOf::new(["active", "inactive"])))
                    .description(
                        "Status of the token. Valid values are active or inactive. Defaults to active.",
                    ),
            )
            .attribute(
                AttributeBuilder::string("description")
                    .optional()
                    .computed()
                    .plan_modifier(Box::new(RequiresReplaceIfChanged))
                    .description("A description of the token."),
            )
            .attribute(
                AttributeBuilder::string("org_id")
                    .required()
                    .plan_modifier(Box::new(RequiresReplaceIfChanged))
                    .description("The organization ID."),
            )
            .attribute(
                AttributeBuilder::string("org")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("The organization name."),
            )
            .attribute(
                AttributeBuilder::string("user_id")
                    .optional()
                    .plan_modifier(Box::new(RequiresReplaceIfChanged))
                    .description("The user ID."),
            )
            .attribute(
                AttributeBuilder::string("user")
                    .optional()
                    .description("The user name."),
            )
            .attribute(
                AttributeBuilder::string("created_at")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("Authorization creation date."),
            )
            .attribute(
                AttributeBuilder::string("updated_at")
                    .computed()
                    .description("Last Authorization update date."),
            )
            .attribute(
                AttributeBuilder::nested_list("permissions", permission_attributes())
                    .required()
                    .validator(Box::new(UniqueValues))
                    .plan_modifier(Box::new(RequiresReplaceIfChanged))
                    .description("List of permissions for an authorization."),
            )
            .build()
    }
}

fn permission_attributes() -> Vec<Attribute> {
    vec![
        AttributeBuilder::string("action")
            .required()
            .validator(Box::new(OneOf::new(["read", "write"])))
            .description("Permission action. Valid values are read or write.")
            .build(),
        AttributeBuilder::nested_single(
            "resource",
            vec![
                AttributeBuilder::string("id")
                    .optional()
                    .description(
                        "A resource ID. Identifies a specific resource; \
                         omit to grant access to every resource of the type.",
                    )
                    .build(),
                AttributeBuilder::string("name")
                    .computed()
                    .description("The name of the resource.")
                    .build(),
                AttributeBuilder::string("org")
                    .optional()
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("An organization name. The organization that owns the resource.")
                    .build(),
                AttributeBuilder::string("org_id")
                    .optional()
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("An organization ID. Identifies the organization that owns the resource.")
                    .build(),
                AttributeBuilder::string("type")
                    .required()
                    .validator(Box::new(OneOf::new(PERMISSION_RESOURCE_TYPES.iter().copied())))
                    .description("A resource type. Identifies the API resource's type (or kind).")
                    .build(),
            ],
        )
        .required()
        .description("Resource a permission grants access to.")
        .build(),
    ]
}

/// Reads the configured permissions into API requests
pub(crate) fn permissions_from_value(value: &Dynamic) -> Result<Vec<Permission>, String> {
    let items = value
        .as_list()
        .ok_or_else(|| "permissions must be a known list".to_string())?;

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let object = item
                .as_map()
                .ok_or_else(|| format!("permissions[{}] must be an object", idx))?;
            let field = |map: &std::collections::HashMap<String, Dynamic>, name: &str| {
                map.get(name).and_then(Dynamic::as_string).map(str::to_string)
            };

            let action =
                field(object, "action").ok_or_else(|| format!("permissions[{}].action is required", idx))?;
            let resource = object
                .get("resource")
                .and_then(Dynamic::as_map)
                .ok_or_else(|| format!("permissions[{}].resource is required", idx))?;
            let resource_type = field(resource, "type")
                .ok_or_else(|| format!("permissions[{}].resource.type is required", idx))?;

            Ok(Permission {
                action,
                resource: PermissionResource {
                    resource_type,
                    id: field(resource, "id"),
                    name: None,
                    org_id: field(resource, "org_id"),
                    org: field(resource, "org"),
                },
            })
        })
        .collect()
}

fn configured_resource_id(prior: Option<&[Dynamic]>, idx: usize) -> Option<&Dynamic> {
    prior?
        .get(idx)?
        .as_map()?
        .get("resource")?
        .as_map()?
        .get("id")
}

/// Builds the permissions value from the API response
///
/// `resource.id` is optional without being computed, so it keeps whatever
/// the prior value said was configured. Without a prior value (import) the
/// API's id is taken as is.
pub(crate) fn permissions_value(permissions: &[Permission], prior: Option<&[Dynamic]>) -> Dynamic {
    Dynamic::List(
        permissions
            .iter()
            .enumerate()
            .map(|(idx, permission)| {
                let id = match (prior, configured_resource_id(prior, idx)) {
                    (Some(_), Some(configured)) if configured.is_null() => None,
                    _ => permission.resource.id.clone(),
                };

                let resource = StateBuilder::new()
                    .optional_string("id", id)
                    .optional_string("name", permission.resource.name.clone())
                    .optional_string("org", permission.resource.org.clone())
                    .optional_string("org_id", permission.resource.org_id.clone())
                    .string("type", &permission.resource.resource_type)
                    .build_object();

                StateBuilder::new()
                    .string("action", &permission.action)
                    .value("resource", resource)
                    .build_object()
            })
            .collect(),
    )
}

/// Attributes shared by the resource and the authorization data sources
pub(crate) fn authorization_values(auth: &Authorization) -> StateBuilder {
    StateBuilder::new()
        .string("id", &auth.id)
        .optional_string("status", auth.status.clone())
        .optional_string("org_id", auth.org_id.clone())
        .optional_string("org", auth.org.clone())
        .optional_string("created_at", auth.created_at.clone())
        .optional_string("updated_at", auth.updated_at.clone())
}

/// State after create, read or update
///
/// `prior` supplies the values the API may omit: the token once it is no
/// longer revealed, and the practitioner's own `user_id` and `user`.
fn authorization_state(auth: &Authorization, prior: &State) -> State {
    let token = auth
        .token
        .clone()
        .filter(|token| !token.is_empty())
        .or_else(|| prior.get_string("token"));

    authorization_values(auth)
        .optional_string("token", token)
        .optional_string(
            "description",
            echo_optional(auth.description.clone(), prior.get_string("description")),
        )
        .value("user_id", prior.get("user_id").clone())
        .value("user", prior.get("user").clone())
        .value(
            "permissions",
            permissions_value(&auth.permissions, prior.get_list("permissions")),
        )
        .build()
}

#[async_trait]
impl ResourceV2 for AuthorizationResource {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let plan = &request.planned_state;

        let Some(org_id) = required_string(plan, "org_id", &mut diagnostics) else {
            return CreateResponse {
                state: request.planned_state,
                diagnostics,
            };
        };

        let permissions = match permissions_from_value(plan.get("permissions")) {
            Ok(permissions) => permissions,
            Err(detail) => {
                diagnostics.add_attribute_error(
                    AttributePath::new("permissions"),
                    "Invalid permissions",
                    detail,
                );
                return CreateResponse {
                    state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let body = PostAuthorizationRequest {
            org_id,
            user_id: plan.get_string("user_id"),
            description: request.config.get_string("description"),
            status: plan.get_string("status"),
            permissions,
        };

        match cancellable(&request.context, self.client.authorizations().create(&body)).await {
            Ok(auth) => {
                tracing::info!(id = %auth.id, "created authorization");
                let prior = State::from_values(request.config.values.clone());
                CreateResponse {
                    state: authorization_state(&auth, &prior),
                    diagnostics,
                }
            }
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Create, "authorization", &e);
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

        match cancellable(&request.context, self.client.authorizations().get(&id)).await {
            Ok(auth) => ReadResponse {
                state: Some(authorization_state(&auth, current)),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(%id, "authorization not found, removing from state");
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Read, "authorization", &e);
                ReadResponse {
                    state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let mut diagnostics = Diagnostics::new();

        let Some(id) = required_string(&request.current_state, "id", &mut diagnostics) else {
            return UpdateResponse {
                state: request.current_state,
                diagnostics,
            };
        };

        let body = PatchAuthorizationRequest {
            status: request.planned_state.get_string("status"),
            description: None,
        };

        match cancellable(&request.context, self.client.authorizations().update(&id, &body)).await
        {
            Ok(auth) => {
                let mut prior = request.current_state.clone();
                prior.set("user_id", request.planned_state.get("user_id").clone());
                prior.set("user", request.planned_state.get("user").clone());
                UpdateResponse {
                    state: authorization_state(&auth, &prior),
                    diagnostics,
                }
            }
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Update, "authorization", &e);
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

        match cancellable(&request.context, self.client.authorizations().delete(&id)).await {
            Ok(()) => tracing::info!(%id, "deleted authorization"),
            Err(e) if e.is_not_found() => {}
            Err(e) => add_api_error(&mut diagnostics, Operation::Delete, "authorization", &e),
        }

        DeleteResponse { diagnostics }
    }
}
