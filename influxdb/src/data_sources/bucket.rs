//! `influxdb_bucket` and `influxdb_buckets` data sources

use crate::api::buckets::Bucket;
use crate::api::{cancellable, Client};
use async_trait::async_trait;
use tfplug::request::{DataSourceReadRequest, DataSourceReadResponse};
use tfplug::schema::Attribute;
use tfplug::{
    AttributeBuilder, DataSourceSchema, DataSourceV2, Diagnostics, Dynamic, SchemaBuilder,
    StateBuilder,
};

use super::{computed_string, failed, lookup_key};

const SECONDS_PER_DAY: i64 = 86_400;

fn bucket_attributes() -> Vec<Attribute> {
    vec![
        computed_string("id", "A Bucket ID."),
        computed_string("org_id", "An organization ID."),
        computed_string("type", "The Bucket type."),
        computed_string("schema_type", "The Bucket schema type."),
        computed_string("description", "A description of the bucket."),
        computed_string("created_at", "Bucket creation date."),
        computed_string("updated_at", "Last bucket update date."),
        AttributeBuilder::number("retention_days")
            .computed()
            .description("The number of days data is kept, 0 for infinite retention.")
            .build(),
    ]
}

fn bucket_values(bucket: &Bucket) -> StateBuilder {
    StateBuilder::new()
        .string("id", &bucket.id)
        .string("name", &bucket.name)
        .optional_string("org_id", bucket.org_id.clone())
        .optional_string("type", bucket.bucket_type.clone())
        .optional_string("schema_type", bucket.schema_type.clone())
        .optional_string("description", bucket.description.clone())
        .optional_string("created_at", bucket.created_at.clone())
        .optional_string("updated_at", bucket.updated_at.clone())
        .number(
            "retention_days",
            (bucket.retention_seconds() / SECONDS_PER_DAY) as f64,
        )
}

pub struct BucketDataSource {
    client: Client,
}

impl BucketDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        let mut schema = SchemaBuilder::new()
            .description("Retrieve details about a bucket.")
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .description("A Bucket name."),
            );
        for attribute in bucket_attributes() {
            schema = schema.attribute(attribute);
        }
        schema.build()
    }
}

#[async_trait]
impl DataSourceV2 for BucketDataSource {
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

        match cancellable(&request.context, self.client.buckets().find_by_name(&name)).await {
            Ok(Some(bucket)) => DataSourceReadResponse {
                state: Some(bucket_values(&bucket).build()),
                diagnostics,
            },
            Ok(None) => {
                diagnostics.add_error(
                    "Bucket not found",
                    Some(format!("No bucket named {} exists.", name)),
                );
                failed(diagnostics)
            }
            Err(e) => {
                diagnostics.add_error(
                    "Bucket not found",
                    Some(format!("Unable to read bucket {}: {}", name, e)),
                );
                failed(diagnostics)
            }
        }
    }
}

pub struct BucketsDataSource {
    client: Client,
}

impl BucketsDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        let mut attributes = bucket_attributes();
        attributes.push(computed_string("name", "A Bucket name."));

        SchemaBuilder::new()
            .description("Lists buckets.")
            .attribute(
                AttributeBuilder::nested_list("buckets", attributes)
                    .computed()
                    .description("Buckets visible to the provider's credentials."),
            )
            .build()
    }
}

#[async_trait]
impl DataSourceV2 for BucketsDataSource {
    async fn read(&self, request: DataSourceReadRequest) -> DataSourceReadResponse {
        let mut diagnostics = Diagnostics::new();

        match cancellable(&request.context, self.client.buckets().list()).await {
            Ok(buckets) => {
                let items = buckets
                    .iter()
                    .map(|bucket| bucket_values(bucket).build_object())
                    .collect();
                DataSourceReadResponse {
                    state: Some(
                        StateBuilder::new()
                            .value("buckets", Dynamic::List(items))
                            .build(),
                    ),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error("Unable to list buckets", Some(e.to_string()));
                failed(diagnostics)
            }
        }
    }
}
