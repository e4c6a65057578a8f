use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::ApiQueryParams;
use super::error::ApiError;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Users {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostUserRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PatchUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Serialize)]
struct PasswordRequest<'a> {
    password: &'a str,
}

pub struct UsersApi<'a> {
    client: &'a Client,
}

impl<'a> UsersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List all users
    /// GET /api/v2/users
    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        self.client
            .get_all_pages("/api/v2/users", &ApiQueryParams::new(), |page: Users| {
                page.users
            })
            .await
    }

    /// GET /api/v2/users/{userID}
    pub async fn get(&self, user_id: &str) -> Result<User, ApiError> {
        self.client
            .get(&format!("/api/v2/users/{}", urlencoding::encode(user_id)))
            .await
    }

    /// POST /api/v2/users
    pub async fn create(&self, request: &PostUserRequest) -> Result<User, ApiError> {
        self.client.post("/api/v2/users", request).await
    }

    /// PATCH /api/v2/users/{userID}
    pub async fn update(&self, user_id: &str, request: &PatchUserRequest) -> Result<User, ApiError> {
        self.client
            .patch(
                &format!("/api/v2/users/{}", urlencoding::encode(user_id)),
                request,
            )
            .await
    }

    /// DELETE /api/v2/users/{userID}
    pub async fn delete(&self, user_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/api/v2/users/{}", urlencoding::encode(user_id)))
            .await
    }

    /// POST /api/v2/users/{userID}/password
    pub async fn set_password(&self, user_id: &str, password: &str) -> Result<(), ApiError> {
        self.client
            .post(
                &format!("/api/v2/users/{}/password", urlencoding::encode(user_id)),
                &PasswordRequest { password },
            )
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
    async fn set_password_posts_password() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/users/u1/password")
            .match_body(Matcher::Json(serde_json::json!({"password": "hunter22"})))
            .with_status(204)
            .create_async()
            .await;

        let client = client(&server);
        client.users().set_password("u1", "hunter22").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_reads_users_page() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/users")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"users":[{"id":"u1","name":"admin","status":"active"},
                             {"id":"u2","name":"jane","status":"inactive"}]}"#,
            )
            .create_async()
            .await;

        let client = client(&server);
        let users = client.users().list().await.unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[1].status.as_deref(), Some("inactive"));
        mock.assert_async().await;
    }
}
