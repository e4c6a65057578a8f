//! `influxdb_bucket` resource

use crate::api::buckets::{Bucket, PatchBucketRequest, PostBucketRequest, RetentionRule};
use crate::api::{cancellable, Client};
use async_trait::async_trait;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
use tfplug::validator::OneOf;
use tfplug::{
    AttributeBuilder, Diagnostics, ResourceSchema, ResourceV2, SchemaBuilder, State, StateBuilder,
    StaticNumber,
};

use super::{add_api_error, echo_optional, required_string, Operation};

/// Thirty days
pub const DEFAULT_RETENTION_SECONDS: i64 = 2_592_000;

pub struct BucketResource {
    client: Client,
}

impl BucketResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .description("Create and manage buckets.")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("A Bucket ID."),
            )
            .attribute(
                AttributeBuilder::string("org_id")
                    .required()
                    .plan_modifier(Box::new(RequiresReplaceIfChanged))
                    .description("An organization ID."),
            )
            .attribute(
                AttributeBuilder::string("type")
                    .optional()
                    .computed()
                    .validator(Box::new(OneOf::new(["user", "system"])))
                    .description("The Bucket type."),
            )
            .attribute(
                AttributeBuilder::string("description")
                    .optional()
                    .computed()
                    .description("A description of the bucket."),
            )
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .description("A Bucket name."),
            )
            .attribute(
                AttributeBuilder::string("created_at")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("Bucket creation date."),
            )
            .attribute(
                AttributeBuilder::string("updated_at")
                    .computed()
                    .description("Last bucket update date."),
            )
            .attribute(
                AttributeBuilder::number("retention_period")
                    .optional()
                    .computed()
                    .default(Box::new(StaticNumber::new(DEFAULT_RETENTION_SECONDS as f64)))
                    .description(
                        "The duration in seconds for how long data will be kept in the database. \
                         The default duration is 2592000 (30 days). 0 represents infinite retention.",
                    ),
            )
            .build()
    }
}

fn bucket_state(bucket: &Bucket, configured_description: Option<String>) -> State {
    StateBuilder::new()
        .string("id", &bucket.id)
        .optional_string("org_id", bucket.org_id.clone())
        .optional_string("type", bucket.bucket_type.clone())
        .optional_string(
            "description",
            echo_optional(bucket.description.clone(), configured_description),
        )
        .string("name", &bucket.name)
        .optional_string("created_at", bucket.created_at.clone())
        .optional_string("updated_at", bucket.updated_at.clone())
        .number("retention_period", bucket.retention_seconds() as f64)
        .build()
}

fn planned_retention(plan: &State) -> i64 {
    plan.get_i64("retention_period")
        .unwrap_or(DEFAULT_RETENTION_SECONDS)
}

#[async_trait]
impl ResourceV2 for BucketResource {
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
        let description = request.config.get_string("description");

        let body = PostBucketRequest {
            org_id,
            name,
            description: description.clone(),
            retention_rules: vec![RetentionRule::expire_after(planned_retention(plan))],
        };

        match cancellable(&request.context, self.client.buckets().create(&body)).await {
            Ok(bucket) => {
                tracing::info!(id = %bucket.id, name = %bucket.name, "created bucket");
                CreateResponse {
                    state: bucket_state(&bucket, description),
                    diagnostics,
                }
            }
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Create, "bucket", &e);
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

        match cancellable(&request.context, self.client.buckets().get(&id)).await {
            Ok(bucket) => ReadResponse {
                state: Some(bucket_state(&bucket, current.get_string("description"))),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(%id, "bucket not found, removing from state");
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Read, "bucket", &e);
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
        // Unconfigured descriptions are left as they are on the server
        let description = request.config.get_string("description");

        let body = PatchBucketRequest {
            name: Some(name),
            description: description.clone(),
            retention_rules: Some(vec![RetentionRule::expire_after(planned_retention(plan))]),
        };

        match cancellable(&request.context, self.client.buckets().update(&id, &body)).await {
            Ok(bucket) => UpdateResponse {
                state: bucket_state(&bucket, description),
                diagnostics,
            },
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Update, "bucket", &e);
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

        match cancellable(&request.context, self.client.buckets().delete(&id)).await {
            Ok(()) => tracing::info!(%id, "deleted bucket"),
            Err(e) if e.is_not_found() => {}
            Err(e) => add_api_error(&mut diagnostics, Operation::Delete, "bucket", &e),
        }

        DeleteResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{config, state, test_client};
    use mockito::{Matcher, Server};
    use tfplug::{Context, Dynamic};

    #[tokio::test]
    async fn create_sends_planned_retention() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/buckets")
            .match_body(Matcher::Json(serde_json::json!({
                "orgID": "o1",
                "name": "metrics",
                "retentionRules": [{"type": "expire", "everySeconds": 2592000}]
            })))
            .with_status(201)
            .with_body(
                r#"{"id":"b1","orgID":"o1","type":"user","name":"metrics",
                    "retentionRules":[{"type":"expire","everySeconds":2592000}],
                    "createdAt":"2024-01-02T03:04:05Z","updatedAt":"2024-01-02T03:04:05Z"}"#,
            )
            .create_async()
            .await;

        let resource = BucketResource::new(test_client(&server));
        let response = resource
            .create(CreateRequest {
                context: Context::new(),
                config: config(&[("org_id", "o1".into()), ("name", "metrics".into())]),
                planned_state: state(&[
                    ("id", Dynamic::Unknown),
                    ("org_id", "o1".into()),
                    ("name", "metrics".into()),
                    ("type", Dynamic::Unknown),
                    ("description", Dynamic::Unknown),
                    ("retention_period", Dynamic::Number(2592000.0)),
                ]),
            })
            .await;

        assert!(response.diagnostics.errors.is_empty());
        assert_eq!(response.state.get_string("type"), Some("user".to_string()));
        assert!(response.state.is_null("description"));
        assert_eq!(response.state.get_number("retention_period"), Some(2592000.0));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_maps_missing_rules_to_infinite_retention() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/buckets/b1")
            .with_status(200)
            .with_body(r#"{"id":"b1","orgID":"o1","type":"user","name":"metrics","retentionRules":[]}"#)
            .create_async()
            .await;

        let resource = BucketResource::new(test_client(&server));
        let response = resource
            .read(ReadRequest {
                context: Context::new(),
                current_state: state(&[("id", "b1".into())]),
            })
            .await;

        let state = response.state.unwrap();
        assert_eq!(state.get_number("retention_period"), Some(0.0));
        assert_eq!(state.get_string("org_id"), Some("o1".to_string()));
    }

    #[tokio::test]
    async fn update_failure_keeps_prior_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PATCH", "/api/v2/buckets/b1")
            .with_status(400)
            .with_body(r#"{"code":"invalid","message":"retention policy is invalid"}"#)
            .create_async()
            .await;

        let resource = BucketResource::new(test_client(&server));
        let current = state(&[("id", "b1".into()), ("name", "metrics".into())]);
        let response = resource
            .update(UpdateRequest {
                context: Context::new(),
                config: config(&[("name", "metrics".into())]),
                planned_state: state(&[
                    ("id", "b1".into()),
                    ("name", "metrics".into()),
                    ("retention_period", Dynamic::Number(-1.0)),
                ]),
                current_state: current.clone(),
            })
            .await;

        assert_eq!(response.diagnostics.errors[0].summary, "Error updating bucket");
        assert_eq!(response.state, current);
    }

    #[test]
    fn schema_defaults_retention_to_thirty_days() {
        let schema = BucketResource::schema_static();
        let retention = schema.attribute("retention_period").unwrap();

        assert!(retention.optional && retention.computed);
        assert!(retention.default.is_some());
        assert_eq!(schema.attribute("type").unwrap().validators.len(), 1);
    }
}
