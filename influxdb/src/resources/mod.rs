//! Resource implementations

pub mod authorization;
pub mod bucket;
pub mod label;
pub mod organization;
pub mod task;
pub mod user;

pub use authorization::AuthorizationResource;
pub use bucket::BucketResource;
pub use label::LabelResource;
pub use organization::OrganizationResource;
pub use task::TaskResource;
pub use user::UserResource;

use crate::api::ApiError;
use tfplug::{AttributePath, Diagnostics, State};

/// CRUD step a diagnostic is reported for
#[derive(Debug, Clone, Copy)]
pub(crate) enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    fn verb(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    fn gerund(self) -> &'static str {
        match self {
            Operation::Create => "creating",
            Operation::Read => "reading",
            Operation::Update => "updating",
            Operation::Delete => "deleting",
        }
    }
}

/// Reports a failed API call as `Error creating bucket` with the cause in
/// the detail.
pub(crate) fn add_api_error(
    diagnostics: &mut Diagnostics,
    operation: Operation,
    kind: &str,
    err: &ApiError,
) {
    diagnostics.add_error(
        format!("Error {} {}", operation.gerund(), kind),
        Some(format!(
            "Could not {} {}, unexpected error: {}",
            operation.verb(),
            kind,
            err
        )),
    );
}

pub(crate) fn required_string(
    state: &State,
    name: &str,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    let value = state.get_string(name);
    if value.is_none() {
        diagnostics.add_attribute_error(
            AttributePath::new(name),
            "Missing required attribute",
            format!("The attribute {} must be set to a known value.", name),
        );
    }
    value
}

/// State value for an optional string the API drops when empty
///
/// A configured empty string is kept so the applied state matches the plan.
pub(crate) fn echo_optional(api: Option<String>, configured: Option<String>) -> Option<String> {
    match api.filter(|value| !value.is_empty()) {
        Some(value) => Some(value),
        None => configured.filter(|value| value.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_name_the_operation() {
        let mut diagnostics = Diagnostics::new();
        add_api_error(
            &mut diagnostics,
            Operation::Create,
            "bucket",
            &ApiError::RateLimited,
        );

        let error = &diagnostics.errors[0];
        assert_eq!(error.summary, "Error creating bucket");
        assert_eq!(
            error.detail.as_deref(),
            Some("Could not create bucket, unexpected error: Too many requests, rate limited")
        );
    }

    #[test]
    fn required_string_reports_attribute() {
        let mut diagnostics = Diagnostics::new();
        let value = required_string(&State::new(), "org_id", &mut diagnostics);

        assert!(value.is_none());
        assert_eq!(
            diagnostics.errors[0].attribute,
            Some(AttributePath::new("org_id"))
        );
    }

    #[test]
    fn echo_optional_keeps_configured_empty_string() {
        assert_eq!(echo_optional(None, Some(String::new())), Some(String::new()));
        assert_eq!(echo_optional(Some(String::new()), None), None);
        assert_eq!(
            echo_optional(Some("prod".to_string()), None),
            Some("prod".to_string())
        );
        assert_eq!(echo_optional(None, Some("stale".to_string())), None);
    }
}
