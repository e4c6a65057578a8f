pub mod api;
pub mod config;
pub mod data_sources;
pub mod resources;

#[cfg(test)]
mod test_helpers;

use async_trait::async_trait;
use config::{AuthMethod, ProviderSettings};
use std::collections::HashMap;
use tfplug::provider::{DataSourceSchema, ResourceSchema};
use tfplug::request::{ConfigureRequest, ConfigureResponse};
use tfplug::{
    AttributeBuilder, DataSourceV2, Diagnostics, ProviderV2, ResourceV2, Schema, SchemaBuilder,
};

pub struct InfluxDbProvider {
    client: Option<api::Client>,
}

impl Default for InfluxDbProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InfluxDbProvider {
    pub fn new() -> Self {
        Self { client: None }
    }

    /// Builds a client for the resolved settings and checks the server answers
    ///
    /// On failure returns the diagnostic detail to report.
    async fn connect(settings: &ProviderSettings) -> Result<api::Client, String> {
        let unexpected = |e: api::ApiError| {
            format!(
                "An unexpected error occurred when creating the InfluxDB client. \
                 If the error is not clear, please contact the provider developers.\n\n\
                 InfluxDB Client Error: {}",
                e
            )
        };

        let client = match &settings.auth {
            AuthMethod::Token(token) => {
                api::Client::new(&settings.url, token).map_err(unexpected)?
            }
            AuthMethod::Password { username, password } => {
                api::Client::sign_in(&settings.url, username, password)
                    .await
                    .map_err(|e| {
                        format!(
                            "Failed to login with username and password to InfluxDB.\n\n\
                             InfluxDB Client Error: {}",
                            e
                        )
                    })?
            }
        };

        client.ping().await.map_err(unexpected)?;
        Ok(client)
    }
}

#[async_trait]
impl ProviderV2 for InfluxDbProvider {
    fn type_name(&self) -> &str {
        "influxdb"
    }

    fn provider_schema(&self) -> Schema {
        SchemaBuilder::new()
            .description("InfluxDB provider to deploy and manage resources supported by InfluxDB.")
            .attribute(
                AttributeBuilder::string("url")
                    .optional()
                    .description("The InfluxDB Cloud or OSS URL. May also be set with the INFLUXDB_URL environment variable."),
            )
            .attribute(
                AttributeBuilder::string("token")
                    .optional()
                    .sensitive()
                    .description("An InfluxDB API token. May also be set with the INFLUXDB_TOKEN environment variable."),
            )
            .attribute(
                AttributeBuilder::string("username")
                    .optional()
                    .description("Username to sign in with. Takes precedence over the token when set."),
            )
            .attribute(
                AttributeBuilder::string("password")
                    .optional()
                    .sensitive()
                    .description("Password used together with username."),
            )
            .build()
    }

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse {
        let mut diags = Diagnostics::new();

        let Some(settings) = ProviderSettings::from_config(&request.config, &mut diags) else {
            return ConfigureResponse { diagnostics: diags };
        };

        tracing::debug!(url = %settings.url, "creating InfluxDB client");

        match Self::connect(&settings).await {
            Ok(client) => {
                tracing::info!(url = %client.base_url(), "configured InfluxDB client");
                self.client = Some(client);
            }
            Err(detail) => diags.add_error("Unable to Create InfluxDB Client", Some(detail)),
        }

        ConfigureResponse { diagnostics: diags }
    }

    async fn create_resource(&self, name: &str) -> tfplug::Result<Box<dyn ResourceV2>> {
        let client = self
            .client
            .as_ref()
            .ok_or("Provider not configured")?
            .clone();

        match name {
            "influxdb_organization" => {
                Ok(Box::new(resources::OrganizationResource::new(client)))
            }
            "influxdb_bucket" => Ok(Box::new(resources::BucketResource::new(client))),
            "influxdb_authorization" => {
                Ok(Box::new(resources::AuthorizationResource::new(client)))
            }
            "influxdb_label" => Ok(Box::new(resources::LabelResource::new(client))),
            "influxdb_task" => Ok(Box::new(resources::TaskResource::new(client))),
            "influxdb_user" => Ok(Box::new(resources::UserResource::new(client))),
            _ => Err(format!("Unknown resource: {}", name).into()),
        }
    }

    async fn create_data_source(&self, name: &str) -> tfplug::Result<Box<dyn DataSourceV2>> {
        let client = self
            .client
            .as_ref()
            .ok_or("Provider not configured")?
            .clone();

        use data_sources::*;
        match name {
            "influxdb_organization" => Ok(Box::new(OrganizationDataSource::new(client))),
            "influxdb_organizations" => Ok(Box::new(OrganizationsDataSource::new(client))),
            "influxdb_bucket" => Ok(Box::new(BucketDataSource::new(client))),
            "influxdb_buckets" => Ok(Box::new(BucketsDataSource::new(client))),
            "influxdb_authorization" => Ok(Box::new(AuthorizationDataSource::new(client))),
            "influxdb_authorizations" => Ok(Box::new(AuthorizationsDataSource::new(client))),
            "influxdb_label" => Ok(Box::new(LabelDataSource::new(client))),
            "influxdb_labels" => Ok(Box::new(LabelsDataSource::new(client))),
            "influxdb_task" => Ok(Box::new(TaskDataSource::new(client))),
            "influxdb_tasks" => Ok(Box::new(TasksDataSource::new(client))),
            "influxdb_user" => Ok(Box::new(UserDataSource::new(client))),
            "influxdb_users" => Ok(Box::new(UsersDataSource::new(client))),
            _ => Err(format!("Unknown data source: {}", name).into()),
        }
    }

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema> {
        static SCHEMAS: std::sync::OnceLock<HashMap<String, ResourceSchema>> =
            std::sync::OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                use resources::*;
                [
                    ("influxdb_organization", OrganizationResource::schema_static()),
                    ("influxdb_bucket", BucketResource::schema_static()),
                    ("influxdb_authorization", AuthorizationResource::schema_static()),
                    ("influxdb_label", LabelResource::schema_static()),
                    ("influxdb_task", TaskResource::schema_static()),
                    ("influxdb_user", UserResource::schema_static()),
                ]
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect()
            })
            .clone()
    }

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema> {
        static SCHEMAS: std::sync::OnceLock<HashMap<String, DataSourceSchema>> =
            std::sync::OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                use data_sources::*;
                [
                    ("influxdb_organization", OrganizationDataSource::schema_static()),
                    ("influxdb_organizations", OrganizationsDataSource::schema_static()),
                    ("influxdb_bucket", BucketDataSource::schema_static()),
                    ("influxdb_buckets", BucketsDataSource::schema_static()),
                    ("influxdb_authorization", AuthorizationDataSource::schema_static()),
                    ("influxdb_authorizations", AuthorizationsDataSource::schema_static()),
                    ("influxdb_label", LabelDataSource::schema_static()),
                    ("influxdb_labels", LabelsDataSource::schema_static()),
                    ("influxdb_task", TaskDataSource::schema_static()),
                    ("influxdb_tasks", TasksDataSource::schema_static()),
                    ("influxdb_user", UserDataSource::schema_static()),
                    ("influxdb_users", UsersDataSource::schema_static()),
                ]
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect()
            })
            .clone()
    }
}
