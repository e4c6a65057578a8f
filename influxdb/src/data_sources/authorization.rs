//! `influxdb_authorization` and `influxdb_authorizations` data sources

use crate::api::authorizations::Authorization;
use crate::api::{cancellable, Client};
use crate::resources::authorization::{authorization_values, permissions_value};
use async_trait::async_trait;
use tfplug::request::{DataSourceReadRequest, DataSourceReadResponse};
use tfplug::schema::Attribute;
use tfplug::{
    AttributeBuilder, DataSourceSchema, DataSourceV2, Diagnostics, Dynamic, SchemaBuilder,
    StateBuilder,
};

use super::{computed_string, failed, lookup_key};

fn authorization_attributes() -> Vec<Attribute> {
    vec![
        AttributeBuilder::string("token")
            .computed()
            .sensitive()
            .description("The API token.")
            .build(),
        computed_string("status", "Status of the token."),
        computed_string("description", "A description of the token."),
        computed_string("org_id", "The organization ID."),
        computed_string("org", "The organization name."),
        computed_string("user_id", "The user ID."),
        computed_string("user", "The user name."),
        computed_string("created_at", "Authorization creation date."),
        computed_string("updated_at", "Last Authorization update date."),
        AttributeBuilder::nested_list(
            "permissions",
            vec![
                computed_string("action", "Permission action."),
                AttributeBuilder::nested_single(
                    "resource",
                    vec![
                        computed_string("id", "A resource ID."),
                        computed_string("name", "The name of the resource."),
                        computed_string("org", "An organization name."),
                        computed_string("org_id", "An organization ID."),
                        computed_string("type", "A resource type."),
                    ],
                )
                .computed()
                .description("Resource a permission grants access to.")
                .build(),
            ],
        )
        .computed()
        .description("List of permissions for an authorization.")
        .build(),
    ]
}

fn authorization_object(auth: &Authorization) -> StateBuilder {
    authorization_values(auth)
        .optional_string("token", auth.token.clone())
        .optional_string("description", auth.description.clone())
        .optional_string("user_id", auth.user_id.clone())
        .optional_string("user", auth.user.clone())
        .value("permissions", permissions_value(&auth.permissions, None))
}

pub struct AuthorizationDataSource {
    client: Client,
}

impl AuthorizationDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        let mut schema = SchemaBuilder::new()
            .description("Retrieve details about an authorization.")
            .attribute(
                AttributeBuilder::string("id")
                    .required()
                    .description("The authorization ID."),
            );
        for attribute in authorization_attributes() {
            schema = schema.attribute(attribute);
        }
        schema.build()
    }
}

#[async_trait]
impl DataSourceV2 for AuthorizationDataSource {
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

        match cancellable(&request.context, self.client.authorizations().get(&id)).await {
            Ok(auth) => DataSourceReadResponse {
                state: Some(authorization_object(&auth).build()),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                diagnostics.add_error(
                    "Authorization not found",
                    Some(format!("No authorization with ID {} exists.", id)),
                );
                failed(diagnostics)
            }
            Err(e) => {
                diagnostics.add_error(
                    "Error getting Authorizations",
                    Some(format!("Unable to read authorization {}: {}", id, e)),
                );
                failed(diagnostics)
            }
        }
    }
}

pub struct AuthorizationsDataSource {
    client: Client,
}

impl AuthorizationsDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        let mut attributes = authorization_attributes();
        attributes.push(computed_string("id", "The authorization ID."));

        SchemaBuilder::new()
            .description("Lists authorizations.")
            .attribute(
                AttributeBuilder::nested_list("authorizations", attributes)
                    .computed()
                    .description("Authorizations visible to the provider's credentials."),
            )
            .build()
    }
}

#[async_trait]
impl DataSourceV2 for AuthorizationsDataSource {
    async fn read(&self, request: DataSourceReadRequest) -> DataSourceReadResponse {
        let mut diagnostics = Diagnostics::new();

        match cancellable(&request.context, self.client.authorizations().list()).await {
            Ok(authorizations) => {
                let items = authorizations
                    .iter()
                    .map(|auth| authorization_object(auth).build_object())
                    .collect();
                DataSourceReadResponse {
                    state: Some(
                        StateBuilder::new()
                            .value("authorizations", Dynamic::List(items))
                            .build(),
                    ),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error("Error getting Authorizations", Some(e.to_string()));
                failed(diagnostics)
            }
        }
    }
}
