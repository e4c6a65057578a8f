//! `influxdb_user` and `influxdb_users` data sources
//!
//! InfluxDB has no endpoint answering "which organization does this user
//! belong to", so membership is recovered by walking every organization's
//! owners and members. The first organization that lists the user wins and
//! an owner entry beats a member entry within the same organization.

use crate::api::orgs::MemberRole;
use crate::api::users::User;
use crate::api::{cancellable, ApiError, Client};
use crate::resources::user::Membership;
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::request::{DataSourceReadRequest, DataSourceReadResponse};
use tfplug::schema::Attribute;
use tfplug::{
    AttributeBuilder, Context, DataSourceSchema, DataSourceV2, Diagnostics, Dynamic,
    SchemaBuilder, StateBuilder,
};

use super::{computed_string, failed, lookup_key};

fn user_attributes() -> Vec<Attribute> {
    vec![
        computed_string("name", "The user name."),
        computed_string("status", "The status of a user."),
        computed_string(
            "org_id",
            "The organization ID that the user belongs to. Null if the user is not a member of any organization.",
        ),
        computed_string(
            "org_role",
            "The role of the user in the organization (`member` or `owner`). Null if the user is not a member of any organization.",
        ),
        AttributeBuilder::string("password")
            .computed()
            .sensitive()
            .description("The password of the user. This will be always `null`.")
            .build(),
    ]
}

/// Maps user IDs to the organization membership they hold
async fn membership_index(
    client: &Client,
    ctx: &Context,
) -> Result<HashMap<String, Membership>, ApiError> {
    let orgs_api = client.orgs();
    let orgs = cancellable(ctx, orgs_api.list()).await?;
    let mut index = HashMap::new();

    for org in &orgs {
        for role in [MemberRole::Owner, MemberRole::Member] {
            let members = match cancellable(ctx, orgs_api.list_by_role(&org.id, role)).await {
                Ok(members) => members,
                Err(ApiError::Cancelled) => return Err(ApiError::Cancelled),
                Err(e) => {
                    tracing::debug!(org_id = %org.id, role = role.as_str(), error = %e, "skipping organization roster");
                    continue;
                }
            };
            for member in members {
                index.entry(member.id).or_insert_with(|| Membership {
                    org_id: org.id.clone(),
                    role,
                });
            }
        }
    }

    Ok(index)
}

fn user_values(user: &User, membership: Option<&Membership>) -> StateBuilder {
    StateBuilder::new()
        .string("id", &user.id)
        .string("name", &user.name)
        .optional_string("status", user.status.clone())
        .optional_string("org_id", membership.map(|m| m.org_id.clone()))
        .optional_string("org_role", membership.map(|m| m.role.as_str().to_string()))
        .value("password", Dynamic::Null)
}

fn membership_warning(diagnostics: &mut Diagnostics, user: &User, error: &ApiError) {
    diagnostics.add_warning(
        "Unable to get organization membership for user",
        Some(format!(
            "Could not get organization membership for user {}: {}",
            user.name, error
        )),
    );
}

pub struct UserDataSource {
    client: Client,
}

impl UserDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        let mut schema = SchemaBuilder::new().description("Retrieves a user.").attribute(
            AttributeBuilder::string("id")
                .required()
                .description("The user ID."),
        );
        for attribute in user_attributes() {
            schema = schema.attribute(attribute);
        }
        schema.build()
    }
}

#[async_trait]
impl DataSourceV2 for UserDataSource {
    async fn read(&self, request: DataSourceReadRequest) -> DataSourceReadResponse {
        let mut diagnostics = Diagnostics::new();
        let ctx = &request.context;

        let Some(id) = lookup_key(
            &request.config,
            "id",
            "Id is empty",
            "Must set Id",
            &mut diagnostics,
        ) else {
            return failed(diagnostics);
        };

        let user = match cancellable(ctx, self.client.users().get(&id)).await {
            Ok(user) => user,
            Err(e) => {
                diagnostics.add_error("Unable to retrieves user", Some(e.to_string()));
                return failed(diagnostics);
            }
        };

        let membership = match membership_index(&self.client, ctx).await {
            Ok(mut index) => index.remove(&user.id),
            Err(e) => {
                membership_warning(&mut diagnostics, &user, &e);
                None
            }
        };

        DataSourceReadResponse {
            state: Some(user_values(&user, membership.as_ref()).build()),
            diagnostics,
        }
    }
}

pub struct UsersDataSource {
    client: Client,
}

impl UsersDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        let mut attributes = user_attributes();
        attributes.push(computed_string("id", "The user ID."));

        SchemaBuilder::new()
            .description("List all users.")
            .attribute(
                AttributeBuilder::nested_list("users", attributes)
                    .computed()
                    .description("Users visible to the provider's credentials."),
            )
            .build()
    }
}

#[async_trait]
impl DataSourceV2 for UsersDataSource {
    async fn read(&self, request: DataSourceReadRequest) -> DataSourceReadResponse {
        let mut diagnostics = Diagnostics::new();
        let ctx = &request.context;

        let users = match cancellable(ctx, self.client.users().list()).await {
            Ok(users) => users,
            Err(e) => {
                diagnostics.add_error("Unable to list users", Some(e.to_string()));
                return failed(diagnostics);
            }
        };

        let index = match membership_index(&self.client, ctx).await {
            Ok(index) => index,
            Err(e) => {
                for user in &users {
                    membership_warning(&mut diagnostics, user, &e);
                }
                HashMap::new()
            }
        };

        let items = users
            .iter()
            .map(|user| user_values(user, index.get(&user.id)).build_object())
            .collect();

        DataSourceReadResponse {
            state: Some(
                StateBuilder::new()
                    .value("users", Dynamic::List(items))
                    .build(),
            ),
            diagnostics,
        }
    }
}
