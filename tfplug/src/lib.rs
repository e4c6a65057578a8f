//! tfplug - Terraform Plugin Framework for Rust
//!
//! A framework for building Terraform providers in Rust, implementing the
//! Terraform Plugin Protocol v6.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod provider;
pub mod request;

// Helper modules
pub mod builders;
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod validator;

// Framework implementation modules
pub mod grpc;
pub mod plan;
pub mod proto;
pub mod server;

// Re-exports for convenience
pub use builders::StateBuilder;
pub use context::Context;
pub use defaults::{StaticNumber, StaticString};
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use provider::{DataSourceSchema, DataSourceV2, ProviderV2, ResourceSchema, ResourceV2};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use server::{serve, ServerConfig};
pub use types::{AttributePath, Config, Diagnostics, Dynamic, State};

