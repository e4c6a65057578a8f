use crate::types::{Dynamic, State};
use std::collections::HashMap;

/// Fluent builder for state values and nested objects
///
/// Optional values map `None` to null so every attribute ends up present.
#[derive(Debug, Default)]
pub struct StateBuilder {
    values: HashMap<String, Dynamic>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values
            .insert(name.to_string(), Dynamic::String(value.into()));
        self
    }

    pub fn optional_string(mut self, name: &str, value: Option<impl Into<String>>) -> Self {
        self.values.insert(
            name.to_string(),
            value.map_or(Dynamic::Null, |v| Dynamic::String(v.into())),
        );
        self
    }

    /// Empty strings become null
    pub fn non_empty_string(self, name: &str, value: Option<&str>) -> Self {
        self.optional_string(name, value.filter(|v| !v.is_empty()))
    }

    pub fn number(mut self, name: &str, value: f64) -> Self {
        self.values.insert(name.to_string(), Dynamic::Number(value));
        self
    }

    pub fn bool(mut self, name: &str, value: bool) -> Self {
        self.values.insert(name.to_string(), Dynamic::Bool(value));
        self
    }

    pub fn string_map(mut self, name: &str, value: Option<&HashMap<String, String>>) -> Self {
        let value = value.map_or(Dynamic::Null, |map| {
            Dynamic::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
                    .collect(),
            )
        });
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn value(mut self, name: &str, value: impl Into<Dynamic>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn build(self) -> State {
        State::from_values(self.values)
    }

    /// Builds a nested object value
    pub fn build_object(self) -> Dynamic {
        Dynamic::Map(self.values)
    }
}
