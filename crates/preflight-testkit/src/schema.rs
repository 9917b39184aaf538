//! JSON schema validators for preflight DTOs.
//!
//! Schemas are generated with schemars from the DTO types themselves, so a
//! serialized value that fails validation means serde and schemars disagree.

use jsonschema::JSONSchema;
use preflight_types::{ConfigFile, UserResponse};
use schemars::schema_for;

/// Error type for schema validation failures.
#[derive(Debug)]
pub struct SchemaValidationError {
    /// The validation errors.
    pub errors: Vec<String>,
}

impl std::fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Schema validation failed: {}", self.errors.join("; "))
    }
}

impl std::error::Error for SchemaValidationError {}

pub fn load_config_schema() -> JSONSchema {
    let schema = serde_json::to_value(schema_for!(ConfigFile)).expect("schema serializes");
    JSONSchema::compile(&schema).expect("Config schema should compile")
}

pub fn load_user_response_schema() -> JSONSchema {
    let schema = serde_json::to_value(schema_for!(UserResponse)).expect("schema serializes");
    JSONSchema::compile(&schema).expect("UserResponse schema should compile")
}

/// Validate a ConfigFile against its JSON schema.
pub fn validate_config_file(config: &ConfigFile) -> Result<(), SchemaValidationError> {
    let json_value = serde_json::to_value(config).expect("ConfigFile should serialize to JSON");
    validate_with_schema(&load_config_schema(), &json_value)
}

/// Validate formatter output (already parsed JSON) against the UserResponse schema.
pub fn validate_user_response_json(json: &serde_json::Value) -> Result<(), SchemaValidationError> {
    validate_with_schema(&load_user_response_schema(), json)
}

fn validate_with_schema(
    schema: &JSONSchema,
    json: &serde_json::Value,
) -> Result<(), SchemaValidationError> {
    match schema.validate(json) {
        Ok(()) => Ok(()),
        Err(errors) => Err(SchemaValidationError {
            errors: errors.map(|e| e.to_string()).collect(),
        }),
    }
}
