//! Provider, resource and data source traits
//!
//! A provider is a factory: after `configure` it hands out fresh resource and
//! data source instances for each request, so implementations can hold the
//! configured API client by value instead of sharing mutable state.

use crate::import::import_state_passthrough_id;
use crate::request::{
    ConfigureRequest, ConfigureResponse, CreateRequest, CreateResponse, DataSourceReadRequest,
    DataSourceReadResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ReadRequest, ReadResponse, UpdateRequest, UpdateResponse,
};
use crate::schema::Schema;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub type ResourceSchema = Schema;
pub type DataSourceSchema = Schema;

#[async_trait]
pub trait ProviderV2: Send + Sync {
    /// Prefix shared by the provider's resource and data source type names
    fn type_name(&self) -> &str;

    fn provider_schema(&self) -> Schema;

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse;

    async fn create_resource(&self, name: &str) -> Result<Box<dyn ResourceV2>>;

    async fn create_data_source(&self, name: &str) -> Result<Box<dyn DataSourceV2>>;

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema>;

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema>;
}

#[async_trait]
pub trait ResourceV2: Send + Sync {
    async fn create(&self, request: CreateRequest) -> CreateResponse;

    async fn read(&self, request: ReadRequest) -> ReadResponse;

    async fn update(&self, request: UpdateRequest) -> UpdateResponse;

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse;

    /// Imports by placing the import identifier in the `id` attribute
    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_passthrough_id("id", &request)
    }
}

#[async_trait]
pub trait DataSourceV2: Send + Sync {
    async fn read(&self, request: DataSourceReadRequest) -> DataSourceReadResponse;
}
