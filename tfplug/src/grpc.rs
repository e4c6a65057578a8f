//! gRPC service implementation for ProviderV2
//!
//! Translates Terraform Plugin Protocol v6 requests into calls on the
//! factory-based provider traits. Values cross the wire as msgpack; state
//! returned to Terraform is always normalized against the resource schema.

use crate::context::Context;
use crate::plan::plan_resource_change;
use crate::proto::tfplugin6 as proto;
use crate::proto::tfplugin6::provider_server::Provider as ProtoProvider;
use crate::provider::ProviderV2;
use crate::request::{
    ConfigureRequest, CreateRequest, DataSourceReadRequest, DeleteRequest, ImportStateRequest,
    ReadRequest, UpdateRequest,
};
use crate::schema::{Attribute, NestingMode, Schema};
use crate::types::{
    decode_json, decode_msgpack, encode_msgpack, AttributePath, AttributePathStep, Config,
    Diagnostics, Dynamic, State,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

type Values = HashMap<String, Dynamic>;
type RpcResult<T> = std::result::Result<Response<T>, Status>;

pub struct ProviderService<P: ProviderV2> {
    provider: Arc<RwLock<P>>,
    stop: Context,
}

impl<P: ProviderV2 + 'static> ProviderService<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
            stop: Context::new(),
        }
    }

    async fn resource_schema(&self, type_name: &str) -> std::result::Result<Schema, Status> {
        let provider = self.provider.read().await;
        provider
            .resource_schemas()
            .await
            .remove(type_name)
            .ok_or_else(|| Status::not_found(format!("unknown resource type: {}", type_name)))
    }

    async fn data_source_schema(&self, type_name: &str) -> std::result::Result<Schema, Status> {
        let provider = self.provider.read().await;
        provider
            .data_source_schemas()
            .await
            .remove(type_name)
            .ok_or_else(|| Status::not_found(format!("unknown data source type: {}", type_name)))
    }
}

#[tonic::async_trait]
impl<P: ProviderV2 + 'static> ProtoProvider for ProviderService<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> RpcResult<proto::get_metadata::Response> {
        let provider = self.provider.read().await;

        let mut resources: Vec<String> = provider.resource_schemas().await.into_keys().collect();
        let mut data_sources: Vec<String> =
            provider.data_source_schemas().await.into_keys().collect();
        resources.sort();
        data_sources.sort();

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities()),
            diagnostics: vec![],
            data_sources: data_sources
                .into_iter()
                .map(|type_name| proto::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: resources
                .into_iter()
                .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> RpcResult<proto::get_provider_schema::Response> {
        let provider = self.provider.read().await;

        let resource_schemas = provider
            .resource_schemas()
            .await
            .iter()
            .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
            .collect();
        let data_source_schemas = provider
            .data_source_schemas()
            .await
            .iter()
            .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
            .collect();

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&provider.provider_schema())),
            resource_schemas,
            data_source_schemas,
            diagnostics: vec![],
            provider_meta: None,
            server_capabilities: Some(server_capabilities()),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> RpcResult<proto::validate_provider_config::Response> {
        let request = request.into_inner();
        let schema = self.provider.read().await.provider_schema();

        let diagnostics = validate_config(&schema, request.config.as_ref())?;

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> RpcResult<proto::validate_resource_config::Response> {
        let request = request.into_inner();
        let schema = self.resource_schema(&request.type_name).await?;

        let diagnostics = validate_config(&schema, request.config.as_ref())?;

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> RpcResult<proto::validate_data_resource_config::Response> {
        let request = request.into_inner();
        let schema = self.data_source_schema(&request.type_name).await?;

        let diagnostics = validate_config(&schema, request.config.as_ref())?;

        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> RpcResult<proto::upgrade_resource_state::Response> {
        let request = request.into_inner();
        let schema = self.resource_schema(&request.type_name).await?;
        let mut diagnostics = Diagnostics::new();

        let raw = request.raw_state.unwrap_or_default();
        if raw.json.is_empty() {
            if !raw.flatmap.is_empty() {
                diagnostics.add_error(
                    "Unsupported state format",
                    Some(format!(
                        "Flatmap state for {} cannot be upgraded",
                        request.type_name
                    )),
                );
            }
            return Ok(Response::new(proto::upgrade_resource_state::Response {
                upgraded_state: Some(encode_object(None)?),
                diagnostics: diagnostics_to_proto(diagnostics),
            }));
        }

        let mut values = match decode_json(&raw.json).map_err(decode_error)? {
            Dynamic::Map(values) => values,
            other => {
                return Err(Status::invalid_argument(format!(
                    "stored state must be an object, got {}",
                    other.type_name()
                )))
            }
        };
        schema.normalize(&mut values);

        tracing::debug!(
            type_name = %request.type_name,
            version = request.version,
            "upgraded resource state"
        );

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode_object(Some(values))?),
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> RpcResult<proto::configure_provider::Response> {
        let request = request.into_inner();
        let config = decode_object(request.config.as_ref())?.unwrap_or_default();

        tracing::info!(terraform_version = %request.terraform_version, "configuring provider");

        let mut provider = self.provider.write().await;
        let response = provider
            .configure(ConfigureRequest {
                context: self.stop.clone(),
                terraform_version: request.terraform_version,
                config: Config::from_values(config),
            })
            .await;

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> RpcResult<proto::read_resource::Response> {
        let request = request.into_inner();
        let schema = self.resource_schema(&request.type_name).await?;

        let Some(current) = decode_object(request.current_state.as_ref())? else {
            return Ok(Response::new(proto::read_resource::Response {
                new_state: Some(encode_object(None)?),
                diagnostics: vec![],
                private: request.private,
            }));
        };

        let provider = self.provider.read().await;
        let resource = provider
            .create_resource(&request.type_name)
            .await
            .map_err(|e| Status::internal(e.to_string()))?;

        let response = resource
            .read(ReadRequest {
                context: self.stop.clone(),
                current_state: State::from_values(current.clone()),
            })
            .await;

        let new_state = if response.diagnostics.has_errors() {
            Some(current)
        } else {
            match response.state {
                Some(state) => Some(finalize_state(&schema, state.values, &request.type_name)),
                None => {
                    tracing::info!(type_name = %request.type_name, "resource no longer exists");
                    None
                }
            }
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(encode_object(new_state)?),
            diagnostics: diagnostics_to_proto(response.diagnostics),
            private: request.private,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> RpcResult<proto::plan_resource_change::Response> {
        let request = request.into_inner();
        let schema = self.resource_schema(&request.type_name).await?;

        let prior = decode_object(request.prior_state.as_ref())?;
        let proposed = decode_object(request.proposed_new_state.as_ref())?;
        let config = decode_object(request.config.as_ref())?.unwrap_or_default();

        let result = plan_resource_change(&schema, prior.as_ref(), proposed, &config);

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_object(result.planned_state)?),
            requires_replace: result
                .requires_replace
                .iter()
                .map(attribute_path_to_proto)
                .collect(),
            planned_private: request.prior_private,
            diagnostics: diagnostics_to_proto(result.diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> RpcResult<proto::apply_resource_change::Response> {
        let request = request.into_inner();
        let schema = self.resource_schema(&request.type_name).await?;

        let prior = decode_object(request.prior_state.as_ref())?;
        let planned = decode_object(request.planned_state.as_ref())?;
        let config = Config::from_values(decode_object(request.config.as_ref())?.unwrap_or_default());

        let provider = self.provider.read().await;
        let resource = provider
            .create_resource(&request.type_name)
            .await
            .map_err(|e| Status::internal(e.to_string()))?;
        let context = self.stop.clone();

        let (new_state, diagnostics) = match (prior, planned) {
            (None, Some(planned)) => {
                tracing::info!(type_name = %request.type_name, "creating resource");
                let response = resource
                    .create(CreateRequest {
                        context,
                        config,
                        planned_state: State::from_values(planned),
                    })
                    .await;
                let state = (!response.diagnostics.has_errors()).then(|| {
                    finalize_state(&schema, response.state.values, &request.type_name)
                });
                (state, response.diagnostics)
            }
            (Some(prior), Some(planned)) => {
                tracing::info!(type_name = %request.type_name, "updating resource");
                let response = resource
                    .update(UpdateRequest {
                        context,
                        config,
                        planned_state: State::from_values(planned),
                        current_state: State::from_values(prior.clone()),
                    })
                    .await;
                let state = if response.diagnostics.has_errors() {
                    prior
                } else {
                    finalize_state(&schema, response.state.values, &request.type_name)
                };
                (Some(state), response.diagnostics)
            }
            (Some(prior), None) => {
                tracing::info!(type_name = %request.type_name, "deleting resource");
                let response = resource
                    .delete(DeleteRequest {
                        context,
                        current_state: State::from_values(prior.clone()),
                    })
                    .await;
                let state = response.diagnostics.has_errors().then_some(prior);
                (state, response.diagnostics)
            }
            (None, None) => (None, Diagnostics::new()),
        };

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_object(new_state)?),
            private: vec![],
            diagnostics: diagnostics_to_proto(diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> RpcResult<proto::import_resource_state::Response> {
        let request = request.into_inner();
        let schema = self.resource_schema(&request.type_name).await?;

        let provider = self.provider.read().await;
        let resource = provider
            .create_resource(&request.type_name)
            .await
            .map_err(|e| Status::internal(e.to_string()))?;

        tracing::info!(type_name = %request.type_name, id = %request.id, "importing resource");

        let response = resource
            .import_state(ImportStateRequest {
                context: self.stop.clone(),
                type_name: request.type_name.clone(),
                id: request.id,
            })
            .await;

        let mut imported_resources = Vec::new();
        if !response.diagnostics.has_errors() {
            if let Some(state) = response.state {
                let mut values = state.values;
                schema.normalize(&mut values);
                imported_resources.push(proto::import_resource_state::ImportedResource {
                    type_name: request.type_name,
                    state: Some(encode_object(Some(values))?),
                    private: vec![],
                });
            }
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> RpcResult<proto::read_data_source::Response> {
        let request = request.into_inner();
        let schema = self.data_source_schema(&request.type_name).await?;
        let config = decode_object(request.config.as_ref())?.unwrap_or_default();

        let provider = self.provider.read().await;
        let data_source = provider
            .create_data_source(&request.type_name)
            .await
            .map_err(|e| Status::internal(e.to_string()))?;

        let response = data_source
            .read(DataSourceReadRequest {
                context: self.stop.clone(),
                config: Config::from_values(config),
            })
            .await;

        let state = if response.diagnostics.has_errors() {
            None
        } else {
            match response.state {
                Some(state) => Some(encode_object(Some(finalize_state(
                    &schema,
                    state.values,
                    &request.type_name,
                )))?),
                None => None,
            }
        };

        Ok(Response::new(proto::read_data_source::Response {
            state,
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> RpcResult<proto::stop_provider::Response> {
        tracing::info!("stop requested, cancelling in-flight operations");
        self.stop.cancel();

        Ok(Response::new(proto::stop_provider::Response {
            error: String::new(),
        }))
    }
}

fn server_capabilities() -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: false,
        get_provider_schema_optional: false,
        move_resource_state: false,
    }
}

fn decode_error(err: crate::TfplugError) -> Status {
    Status::invalid_argument(err.to_string())
}

fn decode_value(value: Option<&proto::DynamicValue>) -> std::result::Result<Dynamic, Status> {
    match value {
        None => Ok(Dynamic::Null),
        Some(value) if !value.msgpack.is_empty() => {
            decode_msgpack(&value.msgpack).map_err(decode_error)
        }
        Some(value) if !value.json.is_empty() => decode_json(&value.json).map_err(decode_error),
        Some(_) => Ok(Dynamic::Null),
    }
}

/// Decodes a whole-object value; null means the object does not exist
///
/// A wholly unknown object carries no attribute values, so it decodes to
/// an empty map.
fn decode_object(value: Option<&proto::DynamicValue>) -> std::result::Result<Option<Values>, Status> {
    match decode_value(value)? {
        Dynamic::Null => Ok(None),
        Dynamic::Map(values) => Ok(Some(values)),
        Dynamic::Unknown => Ok(Some(Values::new())),
        other => Err(Status::invalid_argument(format!(
            "expected an object value, got {}",
            other.type_name()
        ))),
    }
}

/// Validates a configuration object; null or wholly unknown objects pass
fn validate_config(
    schema: &Schema,
    config: Option<&proto::DynamicValue>,
) -> std::result::Result<Diagnostics, Status> {
    match decode_value(config)? {
        Dynamic::Map(values) => Ok(schema.validate(&values)),
        Dynamic::Null | Dynamic::Unknown => Ok(Diagnostics::new()),
        other => Err(Status::invalid_argument(format!(
            "expected an object value, got {}",
            other.type_name()
        ))),
    }
}

fn encode_object(values: Option<Values>) -> std::result::Result<proto::DynamicValue, Status> {
    let value = values.map_or(Dynamic::Null, Dynamic::Map);
    let msgpack = encode_msgpack(&value).map_err(|e| Status::internal(e.to_string()))?;
    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

/// Normalizes state returned by a resource and nulls leftover unknowns
fn finalize_state(schema: &Schema, mut values: Values, type_name: &str) -> Values {
    schema.normalize(&mut values);

    let replaced: usize = values.values_mut().map(Dynamic::unknowns_to_null).sum();
    if replaced > 0 {
        tracing::warn!(
            type_name,
            count = replaced,
            "resource returned unknown values after apply, storing them as null"
        );
    }

    values
}

fn diagnostics_to_proto(diagnostics: Diagnostics) -> Vec<proto::Diagnostic> {
    let errors = diagnostics
        .errors
        .into_iter()
        .map(|d| (proto::diagnostic::Severity::Error, d));
    let warnings = diagnostics
        .warnings
        .into_iter()
        .map(|d| (proto::diagnostic::Severity::Warning, d));

    errors
        .chain(warnings)
        .map(|(severity, d)| proto::Diagnostic {
            severity: severity as i32,
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.as_ref().map(attribute_path_to_proto),
        })
        .collect()
}

fn attribute_path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::step::Selector;

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| proto::attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(proto::schema::Block {
            version: schema.version,
            attributes: schema.attributes.values().map(attribute_to_proto).collect(),
            block_types: vec![],
            description: schema.description.clone(),
            description_kind: proto::StringKind::Plain as i32,
            deprecated: false,
        }),
    }
}

fn attribute_to_proto(attr: &Attribute) -> proto::schema::Attribute {
    let nested_type = attr.nested.as_ref().map(|nested| proto::schema::Object {
        attributes: nested.attributes.values().map(attribute_to_proto).collect(),
        nesting: match nested.nesting {
            NestingMode::Single => proto::schema::object::NestingMode::Single,
            NestingMode::List => proto::schema::object::NestingMode::List,
            NestingMode::Set => proto::schema::object::NestingMode::Set,
            NestingMode::Map => proto::schema::object::NestingMode::Map,
        } as i32,
    });

    proto::schema::Attribute {
        name: attr.name.clone(),
        // nested attributes describe their type through nested_type only
        r#type: if nested_type.is_some() {
            vec![]
        } else {
            attr.r#type.to_bytes()
        },
        nested_type,
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: proto::StringKind::Plain as i32,
        deprecated: false,
        write_only: false,
    }
}
