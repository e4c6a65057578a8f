use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::client::Client;
use super::common::{ApiQueryParams, Links};
use super::error::ApiError;
use super::labels::Label;

/// Largest page the tasks endpoint returns
const TASK_PAGE_LIMIT: u32 = 500;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(rename = "orgID")]
    pub org_id: Option<String>,
    pub org: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "ownerID")]
    pub owner_id: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(rename = "authorizationID")]
    pub authorization_id: Option<String>,
    pub flux: String,
    pub every: Option<String>,
    pub cron: Option<String>,
    pub offset: Option<String>,
    pub latest_completed: Option<String>,
    pub last_run_status: Option<String>,
    pub last_run_error: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct Tasks {
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostTaskRequest {
    #[serde(rename = "orgID")]
    pub org_id: String,
    pub flux: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Name and schedule come from the `option task` block in the flux script
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatchTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flux: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

pub struct TasksApi<'a> {
    client: &'a Client,
}

impl<'a> TasksApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List all tasks, following the `after` cursor across pages
    /// GET /api/v2/tasks
    pub async fn list(&self) -> Result<Vec<Task>, ApiError> {
        let mut tasks: Vec<Task> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        loop {
            let params = ApiQueryParams::new()
                .add("limit", TASK_PAGE_LIMIT)
                .add_optional("after", tasks.last().map(|task| task.id.clone()));
            let page: Tasks = self
                .client
                .get_with_params("/api/v2/tasks", &params)
                .await?;
            let short = (page.tasks.len() as u32) < TASK_PAGE_LIMIT;
            let before = tasks.len();
            for task in page.tasks {
                if seen.insert(task.id.clone()) {
                    tasks.push(task);
                }
            }

            // A page with nothing new means the cursor is not advancing
            if short || tasks.len() == before {
                return Ok(tasks);
            }
        }
    }

    /// GET /api/v2/tasks/{taskID}
    pub async fn get(&self, task_id: &str) -> Result<Task, ApiError> {
        self.client
            .get(&format!("/api/v2/tasks/{}", urlencoding::encode(task_id)))
            .await
    }

    /// POST /api/v2/tasks
    pub async fn create(&self, request: &PostTaskRequest) -> Result<Task, ApiError> {
        self.client.post("/api/v2/tasks", request).await
    }

    /// PATCH /api/v2/tasks/{taskID}
    pub async fn update(&self, task_id: &str, request: &PatchTaskRequest) -> Result<Task, ApiError> {
        self.client
            .patch(
                &format!("/api/v2/tasks/{}", urlencoding::encode(task_id)),
                request,
            )
            .await
    }

    /// DELETE /api/v2/tasks/{taskID}
    pub async fn delete(&self, task_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/api/v2/tasks/{}", urlencoding::encode(task_id)))
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

    #[test]
    fn task_decodes_links_and_labels() {
        let task: Task = serde_json::from_str(
            r#"{
                "id": "t1", "orgID": "o1", "org": "acme", "name": "downsample",
                "status": "active", "flux": "option task = {name: \"downsample\", every: 1h}",
                "every": "1h", "labels": [{"id": "l1", "name": "critical", "orgID": "o1"}],
                "links": {"self": "/api/v2/tasks/t1", "runs": "/api/v2/tasks/t1/runs"}
            }"#,
        )
        .unwrap();

        assert_eq!(task.every.as_deref(), Some("1h"));
        assert_eq!(task.labels[0].name, "critical");
        let links = task.links.unwrap();
        assert_eq!(links.self_link.as_deref(), Some("/api/v2/tasks/t1"));
        assert!(links.owners.is_none());
    }

    #[tokio::test]
    async fn list_requests_first_page_without_cursor() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/tasks")
            .match_query(Matcher::Exact("limit=500".to_string()))
            .with_status(200)
            .with_body(r#"{"tasks":[{"id":"t1","flux":"from(bucket: \"b\")"}]}"#)
            .create_async()
            .await;

        let client = client(&server);
        let tasks = client.tasks().list().await.unwrap();

        assert_eq!(tasks.len(), 1);
        mock.assert_async().await;
    }

    fn task_page(ids: impl Iterator<Item = usize>) -> String {
        let tasks: Vec<serde_json::Value> = ids
            .map(|i| serde_json::json!({"id": format!("t{}", i), "flux": "from(bucket: \"b\")"}))
            .collect();
        serde_json::json!({ "tasks": tasks }).to_string()
    }

    #[tokio::test]
    async fn list_follows_cursor_after_full_page() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/api/v2/tasks")
            .match_query(Matcher::Exact("limit=500".to_string()))
            .with_status(200)
            .with_body(task_page(0..500))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/v2/tasks")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "500".into()),
                Matcher::UrlEncoded("after".into(), "t499".into()),
            ]))
            .with_status(200)
            .with_body(task_page(500..520))
            .expect(1)
            .create_async()
            .await;

        let client = client(&server);
        let tasks = client.tasks().list().await.unwrap();

        assert_eq!(tasks.len(), 520);
        assert_eq!(tasks[0].id, "t0");
        assert_eq!(tasks[519].id, "t519");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn list_stops_when_cursor_is_ignored() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/tasks")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(task_page(0..500))
            .expect(2)
            .create_async()
            .await;

        let client = client(&server);
        let tasks = client.tasks().list().await.unwrap();

        assert_eq!(tasks.len(), 500);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_posts_flux_and_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/tasks")
            .match_body(Matcher::Json(serde_json::json!({
                "orgID": "o1",
                "flux": "option task = {name: \"t\", every: 1h}",
                "status": "inactive"
            })))
            .with_status(201)
            .with_body(
                r#"{"id":"t1","orgID":"o1","name":"t","status":"inactive",
                    "flux":"option task = {name: \"t\", every: 1h}","every":"1h"}"#,
            )
            .create_async()
            .await;

        let client = client(&server);
        let task = client
            .tasks()
            .create(&PostTaskRequest {
                org_id: "o1".to_string(),
                flux: "option task = {name: \"t\", every: 1h}".to_string(),
                status: Some("inactive".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(task.status.as_deref(), Some("inactive"));
        mock.assert_async().await;
    }
}
