//! Default values for optional computed attributes
//!
//! A default is applied during planning when the practitioner left an
//! optional + computed attribute out of the configuration.

use crate::types::Dynamic;

pub struct DefaultRequest {
    pub attribute_path: String,
}

pub struct DefaultResponse {
    pub value: Dynamic,
}

pub trait Default: Send + Sync {
    fn description(&self) -> String;

    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

pub struct StaticString {
    value: String,
}

impl StaticString {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}

impl Default for StaticString {
    fn description(&self) -> String {
        format!("value defaults to \"{}\"", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: Dynamic::String(self.value.clone()),
        }
    }
}

pub struct StaticNumber {
    value: f64,
}

impl StaticNumber {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Default for StaticNumber {
    fn description(&self) -> String {
        format!("value defaults to {}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: Dynamic::Number(self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_string_default() {
        let default = StaticString::new("active");
        let response = default.default_value(DefaultRequest {
            attribute_path: "status".to_string(),
        });

        assert_eq!(response.value, Dynamic::String("active".to_string()));
        assert!(default.description().contains("active"));
    }

    #[test]
    fn static_number_default() {
        let default = StaticNumber::new(2592000.0);
        let response = default.default_value(DefaultRequest {
            attribute_path: "retention_period".to_string(),
        });

        assert_eq!(response.value.as_number(), Some(2592000.0));
    }
}
