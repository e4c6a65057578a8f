use serde::{Deserialize, Serialize};

use super::client::Client;
use super::error::ApiError;

/// Resource kinds an authorization permission can target
pub const PERMISSION_RESOURCE_TYPES: &[&str] = &[
    "authorizations",
    "buckets",
    "dashboards",
    "orgs",
    "tasks",
    "telegrafs",
    "users",
    "variables",
    "secrets",
    "labels",
    "views",
    "documents",
    "notificationRules",
    "notificationEndpoints",
    "checks",
    "dbrp",
    "annotations",
    "sources",
    "scrapers",
    "notebooks",
    "remotes",
    "replications",
    "instance",
    "flows",
    "functions",
    "subscriptions",
];

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PermissionResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "orgID", skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Permission {
    pub action: String,
    pub resource: PermissionResource,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub id: String,
    pub token: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "orgID")]
    pub org_id: Option<String>,
    pub org: Option<String>,
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
    pub user: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Authorizations {
    #[serde(default)]
    authorizations: Vec<Authorization>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostAuthorizationRequest {
    #[serde(rename = "orgID")]
    pub org_id: String,
    #[serde(rename = "userID", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PatchAuthorizationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub struct AuthorizationsApi<'a> {
    client: &'a Client,
}

impl<'a> AuthorizationsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List all authorizations
    /// GET /api/v2/authorizations
    pub async fn list(&self) -> Result<Vec<Authorization>, ApiError> {
        let page: Authorizations = self.client.get("/api/v2/authorizations").await?;
        Ok(page.authorizations)
    }

    /// GET /api/v2/authorizations/{authID}
    pub async fn get(&self, auth_id: &str) -> Result<Authorization, ApiError> {
        self.client
            .get(&format!(
                "/api/v2/authorizations/{}",
                urlencoding::encode(auth_id)
            ))
            .await
    }

    /// POST /api/v2/authorizations
    pub async fn create(
        &self,
        request: &PostAuthorizationRequest,
    ) -> Result<Authorization, ApiError> {
        self.client.post("/api/v2/authorizations", request).await
    }

    /// Only status and description can change after creation
    /// PATCH /api/v2/authorizations/{authID}
    pub async fn update(
        &self,
        auth_id: &str,
        request: &PatchAuthorizationRequest,
    ) -> Result<Authorization, ApiError> {
        self.client
            .patch(
                &format!("/api/v2/authorizations/{}", urlencoding::encode(auth_id)),
                request,
            )
            .await
    }

    /// DELETE /api/v2/authorizations/{authID}
    pub async fn delete(&self, auth_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!(
                "/api/v2/authorizations/{}",
                urlencoding::encode(auth_id)
            ))
            .await
    }
}
