//! `influxdb_task` and `influxdb_tasks` data sources

use crate::api::{cancellable, Client};
use crate::resources::task::{computed_task_attributes, task_values};
use async_trait::async_trait;
use tfplug::request::{DataSourceReadRequest, DataSourceReadResponse};
use tfplug::schema::Attribute;
use tfplug::{
    AttributeBuilder, DataSourceSchema, DataSourceV2, Diagnostics, Dynamic, SchemaBuilder,
    StateBuilder,
};

use super::{computed_string, failed, lookup_key};

fn task_attributes() -> Vec<Attribute> {
    let mut attributes = computed_task_attributes();
    attributes.push(computed_string("flux", "The Flux script that the task executes."));
    attributes.push(computed_string("org_id", "The organization ID."));
    attributes.push(computed_string("status", "The status of the task."));
    attributes
}

pub struct TaskDataSource {
    client: Client,
}

impl TaskDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        let mut schema = SchemaBuilder::new()
            .description("Retrieve details about a task.")
            .attribute(
                AttributeBuilder::string("id")
                    .required()
                    .description("The task ID."),
            );
        for attribute in task_attributes() {
            schema = schema.attribute(attribute);
        }
        schema.build()
    }
}

#[async_trait]
impl DataSourceV2 for TaskDataSource {
    async fn read(&self, request: DataSourceReadRequest) -> DataSourceReadResponse {
        let mut diagnostics = Diagnostics::new();

        let Some(id) = lookup_key(
            &request.config,
            "id",
            "Id is empty",
            "Must set Id",
            &mut diagnostics,
        ) else {
            return failed(diagnostics);
        };

        match cancellable(&request.context, self.client.tasks().get(&id)).await {
            Ok(task) => DataSourceReadResponse {
                state: Some(task_values(&task).build()),
                diagnostics,
            },
            Err(e) => {
                diagnostics.add_error(
                    "Unable to read task",
                    Some(format!("Unable to read task {}: {}", id, e)),
                );
                failed(diagnostics)
            }
        }
    }
}

pub struct TasksDataSource {
    client: Client,
}

impl TasksDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        let mut attributes = task_attributes();
        attributes.push(computed_string("id", "The task ID."));

        SchemaBuilder::new()
            .description("Lists tasks.")
            .attribute(
                AttributeBuilder::nested_list("tasks", attributes)
                    .computed()
                    .description("Tasks visible to the provider's credentials."),
            )
            .build()
    }
}

#[async_trait]
impl DataSourceV2 for TasksDataSource {
    async fn read(&self, request: DataSourceReadRequest) -> DataSourceReadResponse {
        let mut diagnostics = Diagnostics::new();

        match cancellable(&request.context, self.client.tasks().list()).await {
            Ok(tasks) => {
                let items = tasks
                    .iter()
                    .map(|task| task_values(task).build_object())
                    .collect();
                DataSourceReadResponse {
                    state: Some(
                        StateBuilder::new()
                            .value("tasks", Dynamic::List(items))
                            .build(),
                    ),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error("Unable to list tasks", Some(e.to_string()));
                failed(diagnostics)
            }
        }
    }
}
