//! Data source implementations
//!
//! Each domain has a single-object lookup and a list variant.

pub mod authorization;
pub mod bucket;
pub mod label;
pub mod organization;
pub mod task;
pub mod user;

pub use authorization::{AuthorizationDataSource, AuthorizationsDataSource};
pub use bucket::{BucketDataSource, BucketsDataSource};
pub use label::{LabelDataSource, LabelsDataSource};
pub use organization::{OrganizationDataSource, OrganizationsDataSource};
pub use task::{TaskDataSource, TasksDataSource};
pub use user::{UserDataSource, UsersDataSource};

use tfplug::request::DataSourceReadResponse;
use tfplug::schema::Attribute;
use tfplug::{AttributeBuilder, AttributePath, Config, Diagnostics};

/// Reads the attribute a lookup is keyed on
pub(crate) fn lookup_key(
    config: &Config,
    name: &str,
    summary: &str,
    detail: &str,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    match config.get_string(name) {
        Some(value) if !value.is_empty() => Some(value),
        _ => {
            diagnostics.add_attribute_error(AttributePath::new(name), summary, detail);
            None
        }
    }
}

pub(crate) fn failed(diagnostics: Diagnostics) -> DataSourceReadResponse {
    DataSourceReadResponse {
        state: None,
        diagnostics,
    }
}

pub(crate) fn computed_string(name: &str, description: &str) -> Attribute {
    AttributeBuilder::string(name)
        .computed()
        .description(description)
        .build()
}
