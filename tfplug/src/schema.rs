//! Schema types and builders for tfplug
//!
//! A [`Schema`] describes the attributes of a provider, resource or data
//! source. Schemas are handed to Terraform through `GetProviderSchema` and are
//! also used locally to validate configuration, to compute plans and to make
//! sure every state we return carries each attribute Terraform expects.

use crate::defaults::Default;
use crate::plan_modifier::PlanModifier;
use crate::types::{AttributePath, Diagnostics, Dynamic};
use crate::validator::{ValidateRequest, Validator};
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(BTreeMap<String, AttributeType>),
}

impl AttributeType {
    /// JSON type constraint understood by Terraform, e.g. `["list","string"]`
    pub fn to_json(&self) -> JsonValue {
        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(elem) => json!(["list", elem.to_json()]),
            AttributeType::Set(elem) => json!(["set", elem.to_json()]),
            AttributeType::Map(elem) => json!(["map", elem.to_json()]),
            AttributeType::Object(attrs) => {
                let fields: serde_json::Map<String, JsonValue> = attrs
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_json()))
                    .collect();
                json!(["object", fields])
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    /// Checks the shape of a value; null and unknown are accepted anywhere
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(elem), Dynamic::List(items))
            | (AttributeType::Set(elem), Dynamic::List(items)) => {
                items.iter().all(|item| elem.accepts(item))
            }
            (AttributeType::Map(elem), Dynamic::Map(map)) => {
                map.values().all(|item| elem.accepts(item))
            }
            (AttributeType::Object(attrs), Dynamic::Map(map)) => map
                .iter()
                .all(|(name, item)| attrs.get(name).is_some_and(|ty| ty.accepts(item))),
            _ => false,
        }
    }
}

/// How the objects of a nested attribute are arranged
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Single,
    List,
    Set,
    Map,
}

/// Attributes of the objects held by a nested attribute
#[derive(Debug, Clone)]
pub struct NestedAttributes {
    pub nesting: NestingMode,
    pub attributes: BTreeMap<String, Attribute>,
}

impl NestedAttributes {
    fn object_type(&self) -> AttributeType {
        AttributeType::Object(
            self.attributes
                .iter()
                .map(|(name, attr)| (name.clone(), attr.r#type.clone()))
                .collect(),
        )
    }
}

/// Attribute represents a single schema attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    /// For nested attributes this is the implied object collection type
    pub r#type: AttributeType,
    pub nested: Option<NestedAttributes>,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn Default>>,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("nested", &self.nested)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("validators", &self.validators.len())
            .field("plan_modifiers", &self.plan_modifiers.len())
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// AttributeBuilder provides fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, r#type: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type,
                nested: None,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
            },
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, AttributeType::Number)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn list(name: &str, element: AttributeType) -> Self {
        Self::new(name, AttributeType::List(Box::new(element)))
    }

    pub fn set(name: &str, element: AttributeType) -> Self {
        Self::new(name, AttributeType::Set(Box::new(element)))
    }

    pub fn map(name: &str, element: AttributeType) -> Self {
        Self::new(name, AttributeType::Map(Box::new(element)))
    }

    pub fn object(name: &str, fields: BTreeMap<String, AttributeType>) -> Self {
        Self::new(name, AttributeType::Object(fields))
    }

    /// Nested attribute holding a list of objects
    pub fn nested_list(name: &str, attributes: Vec<Attribute>) -> Self {
        Self::nested(name, NestingMode::List, attributes)
    }

    /// Nested attribute holding exactly one object
    pub fn nested_single(name: &str, attributes: Vec<Attribute>) -> Self {
        Self::nested(name, NestingMode::Single, attributes)
    }

    fn nested(name: &str, nesting: NestingMode, attributes: Vec<Attribute>) -> Self {
        let nested = NestedAttributes {
            nesting,
            attributes: attributes
                .into_iter()
                .map(|attr| (attr.name.clone(), attr))
                .collect(),
        };
        let object = nested.object_type();
        let r#type = match nesting {
            NestingMode::Single => object,
            NestingMode::List => AttributeType::List(Box::new(object)),
            NestingMode::Set => AttributeType::Set(Box::new(object)),
            NestingMode::Map => AttributeType::Map(Box::new(object)),
        };

        let mut builder = Self::new(name, r#type);
        builder.attribute.nested = Some(nested);
        builder
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(Arc::from(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(Arc::from(modifier));
        self
    }

    pub fn default(mut self, default: Box<dyn Default>) -> Self {
        self.attribute.default = Some(Arc::from(default));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

impl From<AttributeBuilder> for Attribute {
    fn from(builder: AttributeBuilder) -> Self {
        builder.build()
    }
}

/// Schema for a provider, resource or data source
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub version: i64,
    pub description: String,
    pub attributes: BTreeMap<String, Attribute>,
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.r#type == other.r#type
            && self.required == other.required
            && self.optional == other.optional
            && self.computed == other.computed
            && self.sensitive == other.sensitive
    }
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Validates configuration values against the schema
    ///
    /// Unknown values pass every check; they are validated again once known.
    pub fn validate(&self, config: &HashMap<String, Dynamic>) -> Diagnostics {
        let mut diags = Diagnostics::new();
        validate_object(&self.attributes, config, &AttributePath::root(), &mut diags);
        diags
    }

    /// Shapes values to the schema: attributes missing from `values` are
    /// filled with null and attributes the schema does not know are dropped.
    /// Nested attribute objects are shaped the same way.
    pub fn normalize(&self, values: &mut HashMap<String, Dynamic>) {
        normalize_object(&self.attributes, values);
    }
}

fn validate_object(
    attributes: &BTreeMap<String, Attribute>,
    values: &HashMap<String, Dynamic>,
    base: &AttributePath,
    diags: &mut Diagnostics,
) {
    for name in values.keys() {
        if !attributes.contains_key(name) {
            diags.add_attribute_error(
                base.clone().attribute(name),
                "Unsupported argument",
                format!("An argument named \"{}\" is not expected here.", name),
            );
        }
    }

    for (name, attr) in attributes {
        let path = base.clone().attribute(name);
        let value = values.get(name).unwrap_or(&Dynamic::Null);

        if value.is_null() {
            if attr.required {
                diags.add_attribute_error(
                    path,
                    "Missing required argument",
                    format!("The argument \"{}\" is required, but no definition was found.", name),
                );
            }
            continue;
        }
        if value.is_unknown() {
            continue;
        }

        if !attr.optional && !attr.required && attr.computed {
            diags.add_attribute_error(
                path,
                "Invalid configuration",
                format!("\"{}\" is computed and cannot be set in configuration.", name),
            );
            continue;
        }

        if !attr.r#type.accepts(value) {
            diags.add_attribute_error(
                path,
                "Incorrect attribute value type",
                format!(
                    "Inappropriate value for attribute \"{}\": got {}.",
                    name,
                    value.type_name()
                ),
            );
            continue;
        }

        for validator in &attr.validators {
            validator.validate(
                ValidateRequest {
                    value,
                    config: values,
                    attribute_path: &path,
                },
                diags,
            );
        }

        if let Some(nested) = &attr.nested {
            for_each_nested_object(nested.nesting, value, &path, |object, element_path| {
                validate_object(&nested.attributes, object, &element_path, diags)
            });
        }
    }
}

fn for_each_nested_object<F>(nesting: NestingMode, value: &Dynamic, path: &AttributePath, mut f: F)
where
    F: FnMut(&HashMap<String, Dynamic>, AttributePath),
{
    match (nesting, value) {
        (NestingMode::Single, Dynamic::Map(object)) => f(object, path.clone()),
        (NestingMode::List | NestingMode::Set, Dynamic::List(items)) => {
            for (idx, item) in items.iter().enumerate() {
                if let Dynamic::Map(object) = item {
                    f(object, path.clone().index(idx as i64));
                }
            }
        }
        (NestingMode::Map, Dynamic::Map(entries)) => {
            for (key, item) in entries {
                if let Dynamic::Map(object) = item {
                    f(object, path.clone().key(key));
                }
            }
        }
        _ => {}
    }
}

fn normalize_object(attributes: &BTreeMap<String, Attribute>, values: &mut HashMap<String, Dynamic>) {
    values.retain(|name, _| attributes.contains_key(name));

    for (name, attr) in attributes {
        let value = values.entry(name.clone()).or_insert(Dynamic::Null);
        normalize_value(attr, value);
    }
}

fn normalize_value(attr: &Attribute, value: &mut Dynamic) {
    if let Some(nested) = &attr.nested {
        match (nested.nesting, value) {
            (NestingMode::Single, Dynamic::Map(object)) => {
                normalize_object(&nested.attributes, object)
            }
            (NestingMode::List | NestingMode::Set, Dynamic::List(items)) => {
                for item in items.iter_mut() {
                    if let Dynamic::Map(object) = item {
                        normalize_object(&nested.attributes, object);
                    }
                }
            }
            (NestingMode::Map, Dynamic::Map(entries)) => {
                for item in entries.values_mut() {
                    if let Dynamic::Map(object) = item {
                        normalize_object(&nested.attributes, object);
                    }
                }
            }
            _ => {}
        }
        return;
    }

    normalize_typed(&attr.r#type, value);
}

// Object-typed values need every field present, even inside collections.
fn normalize_typed(ty: &AttributeType, value: &mut Dynamic) {
    match (ty, value) {
        (AttributeType::Object(fields), Dynamic::Map(object)) => {
            object.retain(|name, _| fields.contains_key(name));
            for (name, field_ty) in fields {
                let field = object.entry(name.clone()).or_insert(Dynamic::Null);
                normalize_typed(field_ty, field);
            }
        }
        (AttributeType::List(elem) | AttributeType::Set(elem), Dynamic::List(items)) => {
            for item in items.iter_mut() {
                normalize_typed(elem, item);
            }
        }
        (AttributeType::Map(elem), Dynamic::Map(entries)) => {
            for item in entries.values_mut() {
                normalize_typed(elem, item);
            }
        }
        _ => {}
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                description: String::new(),
                attributes: BTreeMap::new(),
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: impl Into<Attribute>) -> Self {
        let attr = attr.into();
        self.schema.attributes.insert(attr.name.clone(), attr);
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::OneOf;

    fn permissions_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::string("id").computed())
            .attribute(AttributeBuilder::string("org_id").required())
            .attribute(AttributeBuilder::nested_list(
                "permissions",
                vec![
                    AttributeBuilder::string("action")
                        .required()
                        .validator(Box::new(OneOf::new(["read", "write"])))
                        .build(),
                    AttributeBuilder::nested_single(
                        "resource",
                        vec![
                            AttributeBuilder::string("type").required().build(),
                            AttributeBuilder::string("name").computed().build(),
                        ],
                    )
                    .required()
                    .build(),
                ],
            )
            .required())
            .build()
    }

    #[test]
    fn attribute_types_encode_as_terraform_json() {
        assert_eq!(AttributeType::String.to_bytes(), br#""string""#.to_vec());
        assert_eq!(
            AttributeType::Map(Box::new(AttributeType::String)).to_bytes(),
            br#"["map","string"]"#.to_vec()
        );

        let object = AttributeType::Object(BTreeMap::from([
            ("id".to_string(), AttributeType::String),
            ("count".to_string(), AttributeType::Number),
        ]));
        assert_eq!(
            AttributeType::List(Box::new(object)).to_bytes(),
            br#"["list",["object",{"count":"number","id":"string"}]]"#.to_vec()
        );
    }

    #[test]
    fn nested_list_implies_list_of_objects() {
        let schema = permissions_schema();
        let permissions = schema.attribute("permissions").unwrap();

        match &permissions.r#type {
            AttributeType::List(elem) => match elem.as_ref() {
                AttributeType::Object(fields) => {
                    assert!(fields.contains_key("action"));
                    assert!(matches!(fields.get("resource"), Some(AttributeType::Object(_))));
                }
                other => panic!("expected object element, got {:?}", other),
            },
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn validate_reports_missing_required_and_unknown_fields() {
        let schema = permissions_schema();
        let config = HashMap::from([("bogus".to_string(), Dynamic::from("x"))]);

        let diags = schema.validate(&config);
        let summaries: Vec<_> = diags.errors.iter().map(|d| d.summary.as_str()).collect();

        assert!(summaries.contains(&"Unsupported argument"));
        assert_eq!(
            summaries
                .iter()
                .filter(|s| **s == "Missing required argument")
                .count(),
            2
        );
    }

    #[test]
    fn validate_runs_nested_validators_with_element_paths() {
        let schema = permissions_schema();
        let permission = HashMap::from([
            ("action".to_string(), Dynamic::from("delete")),
            (
                "resource".to_string(),
                Dynamic::Map(HashMap::from([(
                    "type".to_string(),
                    Dynamic::from("buckets"),
                )])),
            ),
        ]);
        let config = HashMap::from([
            ("org_id".to_string(), Dynamic::from("org1")),
            (
                "permissions".to_string(),
                Dynamic::List(vec![Dynamic::Map(permission)]),
            ),
        ]);

        let diags = schema.validate(&config);
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(
            diags.errors[0].attribute.as_ref().unwrap().to_string(),
            "permissions[0].action"
        );
    }

    #[test]
    fn validate_skips_unknown_values() {
        let schema = permissions_schema();
        let config = HashMap::from([
            ("org_id".to_string(), Dynamic::Unknown),
            ("permissions".to_string(), Dynamic::Unknown),
        ]);

        assert!(!schema.validate(&config).has_errors());
    }

    #[test]
    fn normalize_fills_missing_and_drops_extra_attributes() {
        let schema = permissions_schema();
        let mut values = HashMap::from([
            ("org_id".to_string(), Dynamic::from("org1")),
            ("legacy".to_string(), Dynamic::from("gone")),
            (
                "permissions".to_string(),
                Dynamic::List(vec![Dynamic::Map(HashMap::from([(
                    "resource".to_string(),
                    Dynamic::Map(HashMap::from([(
                        "type".to_string(),
                        Dynamic::from("orgs"),
                    )])),
                )]))]),
            ),
        ]);

        schema.normalize(&mut values);

        assert!(values["id"].is_null());
        assert!(!values.contains_key("legacy"));
        let permission = values["permissions"].as_list().unwrap()[0].as_map().unwrap();
        assert!(permission["action"].is_null());
        let resource = permission["resource"].as_map().unwrap();
        assert!(resource["name"].is_null());
    }
}
