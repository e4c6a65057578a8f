//! `influxdb_task` resource
//!
//! The task name, schedule and description are declared by the `option task`
//! block inside the flux script, so everything except the script, the
//! organization and the status is computed by the server.

use crate::api::tasks::{PatchTaskRequest, PostTaskRequest, Task};
use crate::api::{cancellable, Client};
use async_trait::async_trait;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
use tfplug::schema::Attribute;
use tfplug::validator::OneOf;
use tfplug::{
    AttributeBuilder, AttributeType, Diagnostics, Dynamic, ResourceSchema, ResourceV2,
    SchemaBuilder, StateBuilder, StaticString,
};

use super::{add_api_error, required_string, Operation};

pub struct TaskResource {
    client: Client,
}

impl TaskResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> ResourceSchema {
        let mut schema = SchemaBuilder::new()
            .description("Create and manage tasks.")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("The resource ID."),
            )
            .attribute(
                AttributeBuilder::string("flux")
                    .required()
                    .description("The Flux script that the task executes."),
            )
            .attribute(
                AttributeBuilder::string("org_id")
                    .required()
                    .plan_modifier(Box::new(RequiresReplaceIfChanged))
                    .description("The organization ID. Specifies the organization that owns the task."),
            )
            .attribute(
                AttributeBuilder::string("status")
                    .optional()
                    .computed()
                    .default(Box::new(StaticString::new("active")))
                    .validator(Box::new(OneOf::new(["active", "inactive"])))
                    .description("The status of the task (`active` or `inactive`)."),
            );

        for attribute in computed_task_attributes() {
            schema = schema.attribute(attribute);
        }

        schema.build()
    }
}

fn computed_string(name: &str, description: &str) -> Attribute {
    AttributeBuilder::string(name)
        .computed()
        .description(description)
        .build()
}

/// Server-derived attributes, shared with the task data sources
pub(crate) fn computed_task_attributes() -> Vec<Attribute> {
    vec![
        computed_string("authorization_id", "The authorization ID. Specifies the authorization used when the task communicates with the query engine."),
        computed_string("created_at", "The timestamp when the task was created."),
        computed_string("cron", "A Cron expression that defines the schedule on which the task runs."),
        computed_string("description", "The description of the task."),
        computed_string("every", "The interval (duration literal) at which the task runs."),
        AttributeBuilder::nested_list(
            "labels",
            vec![
                computed_string("id", "The label ID."),
                computed_string("name", "The label name."),
                computed_string("org_id", "The organization ID."),
                AttributeBuilder::map("properties", AttributeType::String)
                    .computed()
                    .description("The key-value pairs associated with this label.")
                    .build(),
            ],
        )
        .computed()
        .description("The labels attached to the task.")
        .build(),
        computed_string("last_run_error", "The error message from the most recent run of the task."),
        computed_string("last_run_status", "The status of the most recent run of the task."),
        computed_string("latest_completed", "A timestamp of the latest scheduled and completed run."),
        AttributeBuilder::nested_single(
            "links",
            vec![
                computed_string("labels", "URI of the labels of the task."),
                computed_string("logs", "URI of the logs of the task."),
                computed_string("members", "URI of the members of the task."),
                computed_string("owners", "URI of the owners of the task."),
                computed_string("runs", "URI of the runs of the task."),
                computed_string("self", "URI of the task."),
            ],
        )
        .computed()
        .description("API links of the task.")
        .build(),
        computed_string("name", "The name of the task."),
        computed_string("offset", "A duration to delay execution of the task after the scheduled time has elapsed."),
        computed_string("org", "The organization name. Specifies the organization that owns the task."),
        computed_string("owner_id", "The user ID. Specifies the owner of the task."),
        computed_string("updated_at", "The timestamp when the task was last updated."),
    ]
}

fn labels_value(task: &Task) -> Dynamic {
    if task.labels.is_empty() {
        return Dynamic::Null;
    }

    Dynamic::List(
        task.labels
            .iter()
            .map(|label| {
                super::label::label_values(label)
                    .string_map("properties", label.properties.as_ref())
                    .build_object()
            })
            .collect(),
    )
}

fn links_value(task: &Task) -> Dynamic {
    match &task.links {
        Some(links) => StateBuilder::new()
            .optional_string("labels", links.labels.clone())
            .optional_string("logs", links.logs.clone())
            .optional_string("members", links.members.clone())
            .optional_string("owners", links.owners.clone())
            .optional_string("runs", links.runs.clone())
            .optional_string("self", links.self_link.clone())
            .build_object(),
        None => Dynamic::Null,
    }
}

/// Full task state, used by the resource and the task data sources
pub(crate) fn task_values(task: &Task) -> StateBuilder {
    StateBuilder::new()
        .string("id", &task.id)
        .string("flux", &task.flux)
        .optional_string("org_id", task.org_id.clone())
        .optional_string("status", task.status.clone())
        .optional_string("authorization_id", task.authorization_id.clone())
        .optional_string("created_at", task.created_at.clone())
        .non_empty_string("cron", task.cron.as_deref())
        .non_empty_string("description", task.description.as_deref())
        .non_empty_string("every", task.every.as_deref())
        .value("labels", labels_value(task))
        .non_empty_string("last_run_error", task.last_run_error.as_deref())
        .optional_string("last_run_status", task.last_run_status.clone())
        .optional_string("latest_completed", task.latest_completed.clone())
        .value("links", links_value(task))
        .optional_string("name", task.name.clone())
        .non_empty_string("offset", task.offset.as_deref())
        .optional_string("org", task.org.clone())
        .optional_string("owner_id", task.owner_id.clone())
        .optional_string("updated_at", task.updated_at.clone())
}

#[async_trait]
impl ResourceV2 for TaskResource {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let plan = &request.planned_state;

        let (Some(org_id), Some(flux)) = (
            required_string(plan, "org_id", &mut diagnostics),
            required_string(plan, "flux", &mut diagnostics),
        ) else {
            return CreateResponse {
                state: request.planned_state,
                diagnostics,
            };
        };

        let body = PostTaskRequest {
            org_id,
            flux,
            status: plan.get_string("status"),
        };

        match cancellable(&request.context, self.client.tasks().create(&body)).await {
            Ok(task) => {
                tracing::info!(id = %task.id, name = ?task.name, "created task");
                CreateResponse {
                    state: task_values(&task).build(),
                    diagnostics,
                }
            }
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Create, "task", &e);
                CreateResponse {
                    state: request.planned_state,
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();

        let Some(id) = required_string(&request.current_state, "id", &mut diagnostics) else {
            return ReadResponse {
                state: Some(request.current_state),
                diagnostics,
            };
        };

        match cancellable(&request.context, self.client.tasks().get(&id)).await {
            Ok(task) => ReadResponse {
                state: Some(task_values(&task).build()),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(%id, "task not found, removing from state");
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Read, "task", &e);
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

        let (Some(id), Some(flux)) = (
            required_string(&request.current_state, "id", &mut diagnostics),
            required_string(plan, "flux", &mut diagnostics),
        ) else {
            return UpdateResponse {
                state: request.current_state,
                diagnostics,
            };
        };

        let body = PatchTaskRequest {
            flux: Some(flux),
            status: plan.get_string("status"),
        };

        match cancellable(&request.context, self.client.tasks().update(&id, &body)).await {
            Ok(task) => UpdateResponse {
                state: task_values(&task).build(),
                diagnostics,
            },
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Update, "task", &e);
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

        match cancellable(&request.context, self.client.tasks().delete(&id)).await {
            Ok(()) => tracing::info!(%id, "deleted task"),
            Err(e) if e.is_not_found() => {}
            Err(e) => add_api_error(&mut diagnostics, Operation::Delete, "task", &e),
        }

        DeleteResponse { diagnostics }
    }
}
