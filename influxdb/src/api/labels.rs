use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::client::Client;
use super::error::ApiError;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Label {
    pub id: String,
    #[serde(rename = "orgID")]
    pub org_id: Option<String>,
    pub name: String,
    pub properties: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct LabelResponse {
    label: Label,
}

#[derive(Debug, Deserialize)]
struct Labels {
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostLabelRequest {
    #[serde(rename = "orgID")]
    pub org_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, String>>,
}

/// A property sent with an empty value is removed from the label
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatchLabelRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, String>>,
}

pub struct LabelsApi<'a> {
    client: &'a Client,
}

impl<'a> LabelsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List all labels
    /// GET /api/v2/labels
    pub async fn list(&self) -> Result<Vec<Label>, ApiError> {
        let page: Labels = self.client.get("/api/v2/labels").await?;
        Ok(page.labels)
    }

    /// GET /api/v2/labels/{labelID}
    pub async fn get(&self, label_id: &str) -> Result<Label, ApiError> {
        let response: LabelResponse = self
            .client
            .get(&format!("/api/v2/labels/{}", urlencoding::encode(label_id)))
            .await?;
        Ok(response.label)
    }

    /// POST /api/v2/labels
    pub async fn create(&self, request: &PostLabelRequest) -> Result<Label, ApiError> {
        let response: LabelResponse = self.client.post("/api/v2/labels", request).await?;
        Ok(response.label)
    }

    /// PATCH /api/v2/labels/{labelID}
    pub async fn update(
        &self,
        label_id: &str,
        request: &PatchLabelRequest,
    ) -> Result<Label, ApiError> {
        let response: LabelResponse = self
            .client
            .patch(
                &format!("/api/v2/labels/{}", urlencoding::encode(label_id)),
                request,
            )
            .await?;
        Ok(response.label)
    }

    /// DELETE /api/v2/labels/{labelID}
    pub async fn delete(&self, label_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/api/v2/labels/{}", urlencoding::encode(label_id)))
            .await
    }
}
