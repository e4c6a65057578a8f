use crate::types::{AttributePath, Diagnostics, Dynamic};
use std::collections::HashMap;

/// Input handed to a validator
///
/// `config` holds the sibling values of the attribute: the whole
/// configuration for top-level attributes, the enclosing object for nested
/// ones.
pub struct ValidateRequest<'a> {
    pub value: &'a Dynamic,
    pub config: &'a HashMap<String, Dynamic>,
    pub attribute_path: &'a AttributePath,
}

/// Validators only run for known, non-null values.
pub trait Validator: Send + Sync {
    fn validate(&self, request: ValidateRequest<'_>, diagnostics: &mut Diagnostics);
}

/// Accepts only one of a fixed set of strings
pub struct OneOf {
    values: Vec<String>,
}

impl OneOf {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for OneOf {
    fn validate(&self, request: ValidateRequest<'_>, diagnostics: &mut Diagnostics) {
        if let Some(s) = request.value.as_string() {
            if !self.values.iter().any(|v| v == s) {
                let allowed: Vec<String> =
                    self.values.iter().map(|v| format!("\"{}\"", v)).collect();
                diagnostics.add_attribute_error(
                    request.attribute_path.clone(),
                    "Invalid Attribute Value Match",
                    format!(
                        "Attribute {} value must be one of: [{}], got: \"{}\"",
                        request.attribute_path,
                        allowed.join(" "),
                        s
                    ),
                );
            }
        }
    }
}

/// Requires sibling attributes to be set whenever this one is
pub struct AlsoRequires {
    attributes: Vec<String>,
}

impl AlsoRequires {
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for AlsoRequires {
    fn validate(&self, request: ValidateRequest<'_>, diagnostics: &mut Diagnostics) {
        for other in &self.attributes {
            if request.config.get(other).map_or(true, Dynamic::is_null) {
                diagnostics.add_attribute_error(
                    request.attribute_path.clone(),
                    "Invalid Attribute Combination",
                    format!(
                        "Attribute \"{}\" must be specified when \"{}\" is specified",
                        other, request.attribute_path
                    ),
                );
            }
        }
    }
}

/// Rejects lists containing duplicate elements
pub struct UniqueValues;

impl Validator for UniqueValues {
    fn validate(&self, request: ValidateRequest<'_>, diagnostics: &mut Diagnostics) {
        let Some(items) = request.value.as_list() else {
            return;
        };

        for (idx, item) in items.iter().enumerate() {
            if !item.is_fully_known() {
                continue;
            }
            if let Some(first) = items[..idx].iter().position(|earlier| earlier == item) {
                diagnostics.add_attribute_error(
                    request.attribute_path.clone().index(idx as i64),
                    "Duplicate List Value",
                    format!(
                        "This attribute contains duplicate values of: element {} repeats element {}",
                        idx, first
                    ),
                );
            }
        }
    }
}
