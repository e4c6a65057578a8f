//! `influxdb_user` resource
//!
//! Besides the user itself this manages the password and, optionally, a
//! single organization membership as either `member` or `owner`.

use crate::api::orgs::MemberRole;
use crate::api::users::{PatchUserRequest, PostUserRequest, User};
use crate::api::{cancellable, ApiError, Client};
use async_trait::async_trait;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
use tfplug::validator::{AlsoRequires, OneOf};
use tfplug::{
    AttributeBuilder, Context, Diagnostics, ResourceSchema, ResourceV2, SchemaBuilder, State,
    StateBuilder, StaticString,
};

use super::{add_api_error, required_string, Operation};

pub struct UserResource {
    client: Client,
}

impl UserResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .description("Create and manage users.")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .description("The user ID."),
            )
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .description("The user name."),
            )
            .attribute(
                AttributeBuilder::string("password")
                    .required()
                    .sensitive()
                    .description("The password to set for the user."),
            )
            .attribute(
                AttributeBuilder::string("org_id")
                    .optional()
                    .validator(Box::new(AlsoRequires::new(["org_role"])))
                    .description("The organization ID that the user should be added to."),
            )
            .attribute(
                AttributeBuilder::string("org_role")
                    .optional()
                    .validator(Box::new(OneOf::new(["member", "owner"])))
                    .validator(Box::new(AlsoRequires::new(["org_id"])))
                    .description("The role to give the user in the organization (`member` or `owner`)."),
            )
            .attribute(
                AttributeBuilder::string("status")
                    .optional()
                    .computed()
                    .default(Box::new(StaticString::new("active")))
                    .validator(Box::new(OneOf::new(["active", "inactive"])))
                    .description("The status of the user (`active` or `inactive`)."),
            )
            .build()
    }
}

/// A user's role in one organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Membership {
    pub org_id: String,
    pub role: MemberRole,
}

impl Membership {
    pub(crate) fn from_state(state: &State) -> Option<Self> {
        Some(Self {
            org_id: state.get_string("org_id")?,
            role: MemberRole::parse(&state.get_string("org_role")?)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MembershipChange {
    Remove(Membership),
    Add(Membership),
}

/// Steps that move a user from `current` to `desired`
///
/// Moving to another organization or changing the role removes the old
/// membership before adding the new one. Nothing happens when both match.
pub(crate) fn membership_changes(
    current: Option<&Membership>,
    desired: Option<&Membership>,
) -> Vec<MembershipChange> {
    if current == desired {
        return Vec::new();
    }

    current
        .cloned()
        .map(MembershipChange::Remove)
        .into_iter()
        .chain(desired.cloned().map(MembershipChange::Add))
        .collect()
}

/// Applies membership changes in order
///
/// A membership that is already gone counts as removed.
async fn apply_membership_changes(
    client: &Client,
    ctx: &Context,
    user_id: &str,
    changes: &[MembershipChange],
) -> Result<(), ApiError> {
    let orgs = client.orgs();

    for change in changes {
        match change {
            MembershipChange::Remove(membership) => {
                let result = cancellable(
                    ctx,
                    orgs.remove_with_role(&membership.org_id, user_id, membership.role),
                )
                .await;
                match result {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {
                        tracing::debug!(org_id = %membership.org_id, user_id, "membership already removed");
                    }
                    Err(e) => return Err(e),
                }
            }
            MembershipChange::Add(membership) => {
                cancellable(
                    ctx,
                    orgs.add_with_role(&membership.org_id, user_id, membership.role),
                )
                .await?;
                tracing::info!(
                    org_id = %membership.org_id,
                    user_id,
                    role = membership.role.as_str(),
                    "added user to organization"
                );
            }
        }
    }

    Ok(())
}

/// The API never returns the password or membership, so those come from
/// the practitioner's own values.
fn user_state(user: &User, practitioner: &State) -> State {
    StateBuilder::new()
        .string("id", &user.id)
        .string("name", &user.name)
        .optional_string("status", user.status.clone())
        .value("password", practitioner.get("password").clone())
        .value("org_id", practitioner.get("org_id").clone())
        .value("org_role", practitioner.get("org_role").clone())
        .build()
}

impl UserResource {
    /// Deletes a user whose creation could not be completed
    async fn roll_back(&self, ctx: &Context, user_id: &str) {
        if let Err(e) = cancellable(ctx, self.client.users().delete(user_id)).await {
            tracing::warn!(user_id, error = %e, "failed to remove partially created user");
        }
    }
}

#[async_trait]
impl ResourceV2 for UserResource {
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let plan = &request.planned_state;
        let ctx = &request.context;

        let (Some(name), Some(password)) = (
            required_string(plan, "name", &mut diagnostics),
            required_string(plan, "password", &mut diagnostics),
        ) else {
            return CreateResponse {
                state: request.planned_state,
                diagnostics,
            };
        };

        let body = PostUserRequest {
            name,
            status: plan.get_string("status"),
        };

        let user = match cancellable(ctx, self.client.users().create(&body)).await {
            Ok(user) => user,
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Create, "user", &e);
                return CreateResponse {
                    state: request.planned_state,
                    diagnostics,
                };
            }
        };
        tracing::info!(id = %user.id, name = %user.name, "created user");

        if let Err(e) = cancellable(ctx, self.client.users().set_password(&user.id, &password)).await
        {
            diagnostics.add_error(
                "Error setting user password",
                Some(format!("Could not set password for user {}: {}", user.id, e)),
            );
            self.roll_back(ctx, &user.id).await;
            return CreateResponse {
                state: request.planned_state,
                diagnostics,
            };
        }

        let changes = membership_changes(None, Membership::from_state(plan).as_ref());
        if let Err(e) = apply_membership_changes(&self.client, ctx, &user.id, &changes).await {
            diagnostics.add_error(
                "Error managing organization membership",
                Some(format!(
                    "Could not add user {} to the organization: {}",
                    user.id, e
                )),
            );
            self.roll_back(ctx, &user.id).await;
            return CreateResponse {
                state: request.planned_state,
                diagnostics,
            };
        }

        CreateResponse {
            state: user_state(&user, plan),
            diagnostics,
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

        match cancellable(&request.context, self.client.users().get(&id)).await {
            Ok(user) => ReadResponse {
                state: Some(user_state(&user, current)),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(%id, "user not found, removing from state");
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Read, "user", &e);
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
        let current = &request.current_state;
        let ctx = &request.context;

        let (Some(id), Some(name)) = (
            required_string(current, "id", &mut diagnostics),
            required_string(plan, "name", &mut diagnostics),
        ) else {
            return UpdateResponse {
                state: request.current_state,
                diagnostics,
            };
        };

        let body = PatchUserRequest {
            name: Some(name),
            status: plan.get_string("status"),
        };

        let user = match cancellable(ctx, self.client.users().update(&id, &body)).await {
            Ok(user) => user,
            Err(e) => {
                add_api_error(&mut diagnostics, Operation::Update, "user", &e);
                return UpdateResponse {
                    state: request.current_state,
                    diagnostics,
                };
            }
        };

        let password = plan.get_string("password");
        if password.is_some() && password != current.get_string("password") {
            let password = password.unwrap_or_default();
            if let Err(e) = cancellable(ctx, self.client.users().set_password(&id, &password)).await
            {
                diagnostics.add_error(
                    "Error updating user password",
                    Some(format!("Could not update password for user {}: {}", id, e)),
                );
                return UpdateResponse {
                    state: request.current_state,
                    diagnostics,
                };
            }
        }

        let changes = membership_changes(
            Membership::from_state(current).as_ref(),
            Membership::from_state(plan).as_ref(),
        );
        if let Err(e) = apply_membership_changes(&self.client, ctx, &id, &changes).await {
            diagnostics.add_error(
                "Error managing organization membership",
                Some(format!(
                    "Could not update organization membership for user {}: {}",
                    id, e
                )),
            );
            return UpdateResponse {
                state: request.current_state,
                diagnostics,
            };
        }

        UpdateResponse {
            state: user_state(&user, plan),
            diagnostics,
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();
        let current = &request.current_state;
        let ctx = &request.context;

        let Some(id) = required_string(current, "id", &mut diagnostics) else {
            return DeleteResponse { diagnostics };
        };

        let changes = membership_changes(Membership::from_state(current).as_ref(), None);
        if let Err(e) = apply_membership_changes(&self.client, ctx, &id, &changes).await {
            diagnostics.add_warning(
                "Warning removing user from organization",
                Some(format!(
                    "Could not remove user {} from the organization: {}",
                    id, e
                )),
            );
        }

        match cancellable(ctx, self.client.users().delete(&id)).await {
            Ok(()) => tracing::info!(%id, "deleted user"),
            Err(e) if e.is_not_found() => {}
            Err(e) => add_api_error(&mut diagnostics, Operation::Delete, "user", &e),
        }

        DeleteResponse { diagnostics }
    }
}
