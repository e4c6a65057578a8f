use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::ApiQueryParams;
use super::error::ApiError;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetentionRule {
    #[serde(rename = "type", default = "RetentionRule::expire")]
    pub rule_type: String,
    /// Zero keeps data forever
    pub every_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_group_duration_seconds: Option<i64>,
}

impl RetentionRule {
    fn expire() -> String {
        "expire".to_string()
    }

    pub fn expire_after(every_seconds: i64) -> Self {
        Self {
            rule_type: Self::expire(),
            every_seconds,
            shard_group_duration_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub id: String,
    #[serde(rename = "orgID")]
    pub org_id: Option<String>,
    #[serde(rename = "type")]
    pub bucket_type: Option<String>,
    pub schema_type: Option<String>,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub retention_rules: Vec<RetentionRule>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Bucket {
    /// Retention of the first rule, zero for infinite retention
    pub fn retention_seconds(&self) -> i64 {
        self.retention_rules
            .first()
            .map_or(0, |rule| rule.every_seconds)
    }
}

#[derive(Debug, Deserialize)]
struct Buckets {
    #[serde(default)]
    buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostBucketRequest {
    #[serde(rename = "orgID")]
    pub org_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub retention_rules: Vec<RetentionRule>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchBucketRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_rules: Option<Vec<RetentionRule>>,
}

pub struct BucketsApi<'a> {
    client: &'a Client,
}

impl<'a> BucketsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List all buckets visible to the token
    /// GET /api/v2/buckets
    pub async fn list(&self) -> Result<Vec<Bucket>, ApiError> {
        self.client
            .get_all_pages("/api/v2/buckets", &ApiQueryParams::new(), |page: Buckets| {
                page.buckets
            })
            .await
    }

    /// Look up a bucket by name
    /// GET /api/v2/buckets?name={name}
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Bucket>, ApiError> {
        let params = ApiQueryParams::new().add("name", name);
        match self
            .client
            .get_with_params::<Buckets>("/api/v2/buckets", &params)
            .await
        {
            Ok(page) => Ok(page.buckets.into_iter().find(|bucket| bucket.name == name)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// GET /api/v2/buckets/{bucketID}
    pub async fn get(&self, bucket_id: &str) -> Result<Bucket, ApiError> {
        self.client
            .get(&format!("/api/v2/buckets/{}", urlencoding::encode(bucket_id)))
            .await
    }

    /// POST /api/v2/buckets
    pub async fn create(&self, request: &PostBucketRequest) -> Result<Bucket, ApiError> {
        self.client.post("/api/v2/buckets", request).await
    }

    /// PATCH /api/v2/buckets/{bucketID}
    pub async fn update(
        &self,
        bucket_id: &str,
        request: &PatchBucketRequest,
    ) -> Result<Bucket, ApiError> {
        self.client
            .patch(
                &format!("/api/v2/buckets/{}", urlencoding::encode(bucket_id)),
                request,
            )
            .await
    }

    /// DELETE /api/v2/buckets/{bucketID}
    pub async fn delete(&self, bucket_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/api/v2/buckets/{}", urlencoding::encode(bucket_id)))
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
    fn bucket_without_rules_has_infinite_retention() {
        let bucket: Bucket = serde_json::from_str(
            r#"{"id":"b1","orgID":"o1","type":"user","name":"metrics","retentionRules":[]}"#,
        )
        .unwrap();

        assert_eq!(bucket.retention_seconds(), 0);
        assert_eq!(bucket.bucket_type.as_deref(), Some("user"));
    }

    #[tokio::test]
    async fn create_sends_expire_rule() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/buckets")
            .match_body(Matcher::Json(serde_json::json!({
                "orgID": "o1",
                "name": "metrics",
                "retentionRules": [{"type": "expire", "everySeconds": 3600}]
            })))
            .with_status(201)
            .with_body(
                r#"{"id":"b1","orgID":"o1","type":"user","name":"metrics",
                    "retentionRules":[{"type":"expire","everySeconds":3600,"shardGroupDurationSeconds":3600}]}"#,
            )
            .create_async()
            .await;

        let client = client(&server);
        let bucket = client
            .buckets()
            .create(&PostBucketRequest {
                org_id: "o1".to_string(),
                name: "metrics".to_string(),
                description: None,
                retention_rules: vec![RetentionRule::expire_after(3600)],
            })
            .await
            .unwrap();

        assert_eq!(bucket.retention_seconds(), 3600);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_patches_bucket() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/api/v2/buckets/b1")
            .match_body(Matcher::Json(serde_json::json!({
                "description": "raw data",
                "retentionRules": [{"type": "expire", "everySeconds": 0}]
            })))
            .with_status(200)
            .with_body(r#"{"id":"b1","name":"metrics","description":"raw data"}"#)
            .create_async()
            .await;

        let client = client(&server);
        let bucket = client
            .buckets()
            .update(
                "b1",
                &PatchBucketRequest {
                    description: Some("raw data".to_string()),
                    retention_rules: Some(vec![RetentionRule::expire_after(0)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(bucket.description.as_deref(), Some("raw data"));
        mock.assert_async().await;
    }
}
