//! `influxdb_organization` and `influxdb_organizations` data sources

use crate::api::{cancellable, Client};
use crate::resources::organization::organization_values;
use async_trait::async_trait;
use tfplug::request::{DataSourceReadRequest, DataSourceReadResponse};
use tfplug::schema::Attribute;
use tfplug::{
    AttributeBuilder, DataSourceSchema, DataSourceV2, Diagnostics, Dynamic, SchemaBuilder,
    StateBuilder,
};

use super::{computed_string, failed, lookup_key};

fn organization_attributes() -> Vec<Attribute> {
    vec![
        computed_string("id", "An organization ID."),
        computed_string("description", "The description of the organization."),
        computed_string("created_at", "Organization creation date."),
        computed_string("updated_at", "Last Organization update date."),
    ]
}

pub struct OrganizationDataSource {
    client: Client,
}

impl OrganizationDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        let mut schema = SchemaBuilder::new()
            .description("Retrieve details about an organization.")
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .description("The name of the organization."),
            );
        for attribute in organization_attributes() {
            schema = schema.attribute(attribute);
        }
        schema.build()
    }
}

#[async_trait]
impl DataSourceV2 for OrganizationDataSource {
    async fn read(&self, request: DataSourceReadRequest) -> DataSourceReadResponse {
        let mut diagnostics = Diagnostics::new();

        let Some(name) = lookup_key(
            &request.config,
            "name",
            "Name is empty",
            "Must set name",
            &mut diagnostics,
        ) else {
            return failed(diagnostics);
        };

        match cancellable(&request.context, self.client.orgs().find_by_name(&name)).await {
            Ok(Some(org)) => DataSourceReadResponse {
                state: Some(
                    organization_values(&org)
                        .optional_string("description", org.description.clone())
                        .build(),
                ),
                diagnostics,
            },
            Ok(None) => {
                diagnostics.add_error(
                    "Organization not found",
                    Some(format!("No organization named {} exists.", name)),
                );
                failed(diagnostics)
            }
            Err(e) => {
                diagnostics.add_error(
                    "Organization not found",
                    Some(format!("Unable to read organization {}: {}", name, e)),
                );
                failed(diagnostics)
            }
        }
    }
}

pub struct OrganizationsDataSource {
    client: Client,
}

impl OrganizationsDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        let mut attributes = organization_attributes();
        attributes.push(computed_string("name", "The name of the organization."));

        SchemaBuilder::new()
            .description("Lists organizations.")
            .attribute(
                AttributeBuilder::nested_list("organizations", attributes)
                    .computed()
                    .description("Organizations visible to the provider's credentials."),
            )
            .build()
    }
}

#[async_trait]
impl DataSourceV2 for OrganizationsDataSource {
    async fn read(&self, request: DataSourceReadRequest) -> DataSourceReadResponse {
        let mut diagnostics = Diagnostics::new();

        match cancellable(&request.context, self.client.orgs().list()).await {
            Ok(orgs) => {
                let items = orgs
                    .iter()
                    .map(|org| {
                        organization_values(org)
                            .optional_string("description", org.description.clone())
                            .build_object()
                    })
                    .collect();
                DataSourceReadResponse {
                    state: Some(
                        StateBuilder::new()
                            .value("organizations", Dynamic::List(items))
                            .build(),
                    ),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error("Unable to list Organizations", Some(e.to_string()));
                failed(diagnostics)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{config, test_client};
    use mockito::{Matcher, Server};
    use tfplug::Context;

    #[tokio::test]
    async fn looks_up_organization_by_name() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/orgs")
            .match_query(Matcher::UrlEncoded("org".into(), "acme".into()))
            .with_status(200)
            .with_body(r#"{"orgs":[{"id":"o1","name":"acme","description":"Acme Corp"}]}"#)
            .create_async()
            .await;

        let data_source = OrganizationDataSource::new(test_client(&server));
        let response = data_source
            .read(DataSourceReadRequest {
                context: Context::new(),
                config: config(&[("name", "acme".into())]),
            })
            .await;

        let state = response.state.unwrap();
        assert_eq!(state.get_string("id"), Some("o1".to_string()));
        assert_eq!(state.get_string("description"), Some("Acme Corp".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_name_is_reported() {
        let server = Server::new_async().await;
        let data_source = OrganizationDataSource::new(test_client(&server));

        let response = data_source
            .read(DataSourceReadRequest {
                context: Context::new(),
                config: config(&[]),
            })
            .await;

        assert!(response.state.is_none());
        assert_eq!(response.diagnostics.errors[0].summary, "Name is empty");
    }

    #[tokio::test]
    async fn unknown_organization_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/orgs")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"code":"not found","message":"organization name \"ghost\" not found"}"#)
            .create_async()
            .await;

        let data_source = OrganizationDataSource::new(test_client(&server));
        let response = data_source
            .read(DataSourceReadRequest {
                context: Context::new(),
                config: config(&[("name", "ghost".into())]),
            })
            .await;

        assert_eq!(response.diagnostics.errors[0].summary, "Organization not found");
    }

    #[tokio::test]
    async fn lists_organizations() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/orgs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"orgs":[{"id":"o1","name":"acme"},{"id":"o2","name":"globex"}]}"#)
            .create_async()
            .await;

        let data_source = OrganizationsDataSource::new(test_client(&server));
        let response = data_source
            .read(DataSourceReadRequest {
                context: Context::new(),
                config: config(&[]),
            })
            .await;

        let state = response.state.unwrap();
        let orgs = state.get_list("organizations").unwrap();
        assert_eq!(orgs.len(), 2);
        assert_eq!(orgs[1].as_map().unwrap()["name"], Dynamic::from("globex"));
        assert!(orgs[0].as_map().unwrap()["description"].is_null());
    }
}
