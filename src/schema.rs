use crate::error::Error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// JSON Schema primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    Object,
    Array,
    String,
    Boolean,
    Integer,
    Number,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::String => "string",
            SchemaType::Boolean => "boolean",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
        }
    }
}

/// Fluent builder for the JSON Schema documents that describe acceptable
/// input.
///
/// The built document is both the validation contract applied to submitted
/// JSON and the shape advertised to clients, so it serializes as the bare
/// schema object.
///
/// # Examples
///
/// ```
/// use authflow_engine::{SchemaBuilder, SchemaType};
/// use serde_json::json;
///
/// let schema = SchemaBuilder::new()
///     .type_(SchemaType::Object)
///     .required(&["login_id"])
///     .property("login_id", SchemaBuilder::new().type_(SchemaType::String));
///
/// assert!(schema.validate("login", &json!({ "login_id": "user@example.com" })).is_ok());
/// assert!(schema.validate("login", &json!({ "otp": "123456" })).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SchemaBuilder(Map<String, Value>);

impl SchemaBuilder {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn type_(mut self, schema_type: SchemaType) -> Self {
        self.0
            .insert("type".to_string(), Value::from(schema_type.as_str()));
        self
    }

    /// Appends to the `required` list.
    pub fn required(mut self, names: &[&str]) -> Self {
        let entry = self
            .0
            .entry("required")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(required) = entry {
            required.extend(names.iter().map(|name| Value::from(*name)));
        }
        self
    }

    pub fn property(mut self, name: &str, schema: SchemaBuilder) -> Self {
        let entry = self
            .0
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(properties) = entry {
            properties.insert(name.to_string(), schema.into_value());
        }
        self
    }

    pub fn one_of(mut self, schemas: impl IntoIterator<Item = SchemaBuilder>) -> Self {
        let schemas = schemas.into_iter().map(SchemaBuilder::into_value).collect();
        self.0.insert("oneOf".to_string(), Value::Array(schemas));
        self
    }

    pub fn additional_properties(mut self, allowed: bool) -> Self {
        self.0
            .insert("additionalProperties".to_string(), Value::Bool(allowed));
        self
    }

    pub fn enum_values(mut self, values: &[&str]) -> Self {
        let values = values.iter().map(|v| Value::from(*v)).collect();
        self.0.insert("enum".to_string(), Value::Array(values));
        self
    }

    pub fn min_length(mut self, length: u64) -> Self {
        self.0.insert("minLength".to_string(), Value::from(length));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Validates `instance`, collecting every violation.
    ///
    /// `kind` names the target type in the returned [`Error::InvalidInput`].
    pub fn validate(&self, kind: &str, instance: &Value) -> Result<(), Error> {
        let schema = self.to_value();
        let validator =
            jsonschema::validator_for(&schema).map_err(|e| Error::InvalidSchema(e.to_string()))?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidInput {
                kind: kind.to_string(),
                errors,
            })
        }
    }

    /// Validates `instance` and then deserializes it into `T`.
    pub fn parse<T: DeserializeOwned>(&self, kind: &str, instance: &Value) -> Result<T, Error> {
        self.validate(kind, instance)?;
        serde_json::from_value(instance.clone()).map_err(|e| Error::InvalidInput {
            kind: kind.to_string(),
            errors: vec![e.to_string()],
        })
    }
}
