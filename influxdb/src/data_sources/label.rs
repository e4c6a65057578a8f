//! `influxdb_label` and `influxdb_labels` data sources

use crate::api::labels::Label;
use crate::api::{cancellable, Client};
use crate::resources::label::label_values;
use async_trait::async_trait;
use tfplug::request::{DataSourceReadRequest, DataSourceReadResponse};
use tfplug::schema::Attribute;
use tfplug::{
    AttributeBuilder, AttributeType, DataSourceSchema, DataSourceV2, Diagnostics, Dynamic,
    SchemaBuilder, StateBuilder,
};

use super::{computed_string, failed, lookup_key};

fn label_attributes() -> Vec<Attribute> {
    vec![
        computed_string("name", "The label name."),
        computed_string("org_id", "The organization ID."),
        AttributeBuilder::map("properties", AttributeType::String)
            .computed()
            .description("The key-value pairs associated with this label.")
            .build(),
    ]
}

fn label_object(label: &Label) -> StateBuilder {
    label_values(label).string_map("properties", label.properties.as_ref())
}

pub struct LabelDataSource {
    client: Client,
}

impl LabelDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        let mut schema = SchemaBuilder::new()
            .description("Retrieve details about a label.")
            .attribute(
                AttributeBuilder::string("id")
                    .required()
                    .description("The label ID."),
            );
        for attribute in label_attributes() {
            schema = schema.attribute(attribute);
        }
        schema.build()
    }
}

#[async_trait]
impl DataSourceV2 for LabelDataSource {
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

        match cancellable(&request.context, self.client.labels().get(&id)).await {
            Ok(label) => DataSourceReadResponse {
                state: Some(label_object(&label).build()),
                diagnostics,
            },
            Err(e) => {
                diagnostics.add_error(
                    "Label not found",
                    Some(format!("Unable to read label {}: {}", id, e)),
                );
                failed(diagnostics)
            }
        }
    }
}

pub struct LabelsDataSource {
    client: Client,
}

impl LabelsDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        let mut attributes = label_attributes();
        attributes.push(computed_string("id", "The label ID."));

        SchemaBuilder::new()
            .description("Lists labels.")
            .attribute(
                AttributeBuilder::nested_list("labels", attributes)
                    .computed()
                    .description("Labels visible to the provider's credentials."),
            )
            .build()
    }
}

#[async_trait]
impl DataSourceV2 for LabelsDataSource {
    async fn read(&self, request: DataSourceReadRequest) -> DataSourceReadResponse {
        let mut diagnostics = Diagnostics::new();

        match cancellable(&request.context, self.client.labels().list()).await {
            Ok(labels) => {
                let items = labels
                    .iter()
                    .map(|label| label_object(label).build_object())
                    .collect();
                DataSourceReadResponse {
                    state: Some(
                        StateBuilder::new()
                            .value("labels", Dynamic::List(items))
                            .build(),
                    ),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error("Unable to list labels", Some(e.to_string()));
                failed(diagnostics)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{config, test_client};
    use mockito::Server;
    use tfplug::Context;

    #[tokio::test]
    async fn reads_label_properties() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/labels/l1")
            .with_status(200)
            .with_body(r#"{"label":{"id":"l1","orgID":"o1","name":"critical","properties":{"color":"ffb3b3"}}}"#)
            .create_async()
            .await;

        let data_source = LabelDataSource::new(test_client(&server));
        let response = data_source
            .read(DataSourceReadRequest {
                context: Context::new(),
                config: config(&[("id", "l1".into())]),
            })
            .await;

        let state = response.state.unwrap();
        assert_eq!(state.get_string("name"), Some("critical".to_string()));
        assert_eq!(state.get_map("properties").unwrap()["color"], Dynamic::from("ffb3b3"));
    }

    #[tokio::test]
    async fn empty_id_is_rejected() {
        let server = Server::new_async().await;
        let data_source = LabelDataSource::new(test_client(&server));

        let response = data_source
            .read(DataSourceReadRequest {
                context: Context::new(),
                config: config(&[("id", "".into())]),
            })
            .await;

        assert_eq!(response.diagnostics.errors[0].summary, "Id is empty");
    }

    #[tokio::test]
    async fn lists_labels() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/labels")
            .with_status(200)
            .with_body(r#"{"labels":[{"id":"l1","orgID":"o1","name":"critical"}]}"#)
            .create_async()
            .await;

        let data_source = LabelsDataSource::new(test_client(&server));
        let response = data_source
            .read(DataSourceReadRequest {
                context: Context::new(),
                config: config(&[]),
            })
            .await;

        let state = response.state.unwrap();
        let labels = state.get_list("labels").unwrap();
        assert!(labels[0].as_map().unwrap()["properties"].is_null());
    }
}
