use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::ApiQueryParams;
use super::error::ApiError;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Organizations {
    #[serde(default)]
    orgs: Vec<Organization>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostOrganizationRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PatchOrganizationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Role a user holds within an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Member,
    Owner,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Member => "member",
            MemberRole::Owner => "owner",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "member" => Some(MemberRole::Member),
            "owner" => Some(MemberRole::Owner),
            _ => None,
        }
    }

    fn collection(&self) -> &'static str {
        match self {
            MemberRole::Member => "members",
            MemberRole::Owner => "owners",
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResourceMember {
    pub id: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceMembers {
    #[serde(default)]
    users: Vec<ResourceMember>,
}

#[derive(Debug, Serialize)]
struct AddResourceMemberRequest<'a> {
    id: &'a str,
}

pub struct OrgsApi<'a> {
    client: &'a Client,
}

impl<'a> OrgsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List all organizations
    /// GET /api/v2/orgs
    pub async fn list(&self) -> Result<Vec<Organization>, ApiError> {
        self.client
            .get_all_pages("/api/v2/orgs", &ApiQueryParams::new(), |page: Organizations| {
                page.orgs
            })
            .await
    }

    /// Look up an organization by name
    /// GET /api/v2/orgs?org={name}
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Organization>, ApiError> {
        let params = ApiQueryParams::new().add("org", name);
        match self
            .client
            .get_with_params::<Organizations>("/api/v2/orgs", &params)
            .await
        {
            Ok(page) => Ok(page.orgs.into_iter().find(|org| org.name == name)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get a single organization
    /// GET /api/v2/orgs/{orgID}
    pub async fn get(&self, org_id: &str) -> Result<Organization, ApiError> {
        self.client
            .get(&format!("/api/v2/orgs/{}", urlencoding::encode(org_id)))
            .await
    }

    /// Create an organization
    /// POST /api/v2/orgs
    pub async fn create(
        &self,
        request: &PostOrganizationRequest,
    ) -> Result<Organization, ApiError> {
        self.client.post("/api/v2/orgs", request).await
    }

    /// Update an organization
    /// PATCH /api/v2/orgs/{orgID}
    pub async fn update(
        &self,
        org_id: &str,
        request: &PatchOrganizationRequest,
    ) -> Result<Organization, ApiError> {
        self.client
            .patch(&format!("/api/v2/orgs/{}", urlencoding::encode(org_id)), request)
            .await
    }

    /// Delete an organization
    /// DELETE /api/v2/orgs/{orgID}
    pub async fn delete(&self, org_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/api/v2/orgs/{}", urlencoding::encode(org_id)))
            .await
    }

    /// List the owners or members of an organization
    /// GET /api/v2/orgs/{orgID}/owners | /api/v2/orgs/{orgID}/members
    pub async fn list_by_role(
        &self,
        org_id: &str,
        role: MemberRole,
    ) -> Result<Vec<ResourceMember>, ApiError> {
        let members: ResourceMembers = self
            .client
            .get(&format!(
                "/api/v2/orgs/{}/{}",
                urlencoding::encode(org_id),
                role.collection()
            ))
            .await?;
        Ok(members.users)
    }

    /// Add a user to an organization with the given role
    /// POST /api/v2/orgs/{orgID}/owners | /api/v2/orgs/{orgID}/members
    pub async fn add_with_role(
        &self,
        org_id: &str,
        user_id: &str,
        role: MemberRole,
    ) -> Result<ResourceMember, ApiError> {
        self.client
            .post(
                &format!(
                    "/api/v2/orgs/{}/{}",
                    urlencoding::encode(org_id),
                    role.collection()
                ),
                &AddResourceMemberRequest { id: user_id },
            )
            .await
    }

    /// Remove a user's role from an organization
    /// DELETE /api/v2/orgs/{orgID}/owners/{userID} | /api/v2/orgs/{orgID}/members/{userID}
    pub async fn remove_with_role(
        &self,
        org_id: &str,
        user_id: &str,
        role: MemberRole,
    ) -> Result<(), ApiError> {
        self.client
            .delete(&format!(
                "/api/v2/orgs/{}/{}/{}",
                urlencoding::encode(org_id),
                role.collection(),
                urlencoding::encode(user_id)
            ))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RetryConfig;
    use mockito::{Matcher, Server};

    fn client(server: &Server) -> Client {
        Client::with_config(
            &server.url(),
            "secret",
            RetryConfig {
                max_retries: 0,
                ..RetryConfig::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_posts_name_and_description() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/orgs")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "acme",
                "description": "Acme Corp"
            })))
            .with_status(201)
            .with_body(
                r#"{"id":"0a1","name":"acme","description":"Acme Corp",
                    "createdAt":"2024-01-02T03:04:05Z","updatedAt":"2024-01-02T03:04:05Z"}"#,
            )
            .create_async()
            .await;

        let client = client(&server);
        let org = client
            .orgs()
            .create(&PostOrganizationRequest {
                name: "acme".to_string(),
                description: Some("Acme Corp".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(org.id, "0a1");
        assert_eq!(org.created_at.as_deref(), Some("2024-01-02T03:04:05Z"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn find_by_name_maps_not_found_to_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/orgs")
            .match_query(Matcher::UrlEncoded("org".into(), "missing".into()))
            .with_status(404)
            .with_body(r#"{"code":"not found","message":"organization name \"missing\" not found"}"#)
            .create_async()
            .await;

        let client = client(&server);
        assert_eq!(client.orgs().find_by_name("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn membership_uses_role_collection() {
        let mut server = Server::new_async().await;
        let add = server
            .mock("POST", "/api/v2/orgs/0a1/owners")
            .match_body(Matcher::Json(serde_json::json!({"id": "u1"})))
            .with_status(201)
            .with_body(r#"{"id":"u1","name":"jane","role":"owner"}"#)
            .create_async()
            .await;
        let list = server
            .mock("GET", "/api/v2/orgs/0a1/members")
            .with_status(200)
            .with_body(r#"{"users":[{"id":"u2","name":"joe","role":"member"}]}"#)
            .create_async()
            .await;
        let remove = server
            .mock("DELETE", "/api/v2/orgs/0a1/members/u2")
            .with_status(204)
            .create_async()
            .await;

        let client = client(&server);
        let orgs = client.orgs();
        let owner = orgs.add_with_role("0a1", "u1", MemberRole::Owner).await.unwrap();
        let members = orgs.list_by_role("0a1", MemberRole::Member).await.unwrap();
        orgs.remove_with_role("0a1", "u2", MemberRole::Member)
            .await
            .unwrap();

        assert_eq!(owner.role.as_deref(), Some("owner"));
        assert_eq!(members[0].id, "u2");
        add.assert_async().await;
        list.assert_async().await;
        remove.assert_async().await;
    }

    #[test]
    fn member_role_round_trips_names() {
        assert_eq!(MemberRole::parse("owner"), Some(MemberRole::Owner));
        assert_eq!(MemberRole::Member.as_str(), "member");
        assert_eq!(MemberRole::parse("admin"), None);
    }
}
