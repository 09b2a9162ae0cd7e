//! Explicit mutation API over a compiled deployment template.
//!
//! Only `Resources` and `Outputs` are touched; every other top-level key is
//! carried through untouched.

use serde_json::{Map, Value};
use thiserror::Error;

/// Logical ID of the REST API resource the host compiles.
pub const REST_API_LOGICAL_ID: &str = "ApiGatewayRestApi";

const RESOURCES_KEY: &str = "Resources";
const OUTPUTS_KEY: &str = "Outputs";

/// Errors raised when a value does not have the shape of a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template must be a JSON object")]
    NotAnObject,

    #[error("Template has no Resources map")]
    MissingResources,

    #[error("Template Outputs must be a map")]
    InvalidOutputs,
}

/// A deployment template with a guaranteed `Resources` map.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    resources: Map<String, Value>,
    outputs: Option<Map<String, Value>>,
    rest: Map<String, Value>,
}

impl Template {
    /// Wrap a template value. `Resources` must exist and be a map.
    pub fn from_value(value: Value) -> Result<Self, TemplateError> {
        let Value::Object(mut rest) = value else {
            return Err(TemplateError::NotAnObject);
        };
        let resources = match rest.remove(RESOURCES_KEY) {
            Some(Value::Object(resources)) => resources,
            _ => return Err(TemplateError::MissingResources),
        };
        let outputs = match rest.remove(OUTPUTS_KEY) {
            None => None,
            Some(Value::Object(outputs)) => Some(outputs),
            Some(_) => return Err(TemplateError::InvalidOutputs),
        };
        Ok(Self {
            resources,
            outputs,
            rest,
        })
    }

    /// Reassemble the full template value.
    pub fn into_value(self) -> Value {
        let mut root = self.rest;
        root.insert(RESOURCES_KEY.into(), Value::Object(self.resources));
        if let Some(outputs) = self.outputs {
            root.insert(OUTPUTS_KEY.into(), Value::Object(outputs));
        }
        Value::Object(root)
    }

    pub fn resources(&self) -> &Map<String, Value> {
        &self.resources
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources.get(logical_id)
    }

    pub fn resource_mut(&mut self, logical_id: &str) -> Option<&mut Value> {
        self.resources.get_mut(logical_id)
    }

    /// Insert a resource, replacing any resource already stored under `key`.
    ///
    /// Returns the replaced resource. Last write wins.
    pub fn insert_resource(&mut self, key: impl Into<String>, resource: Value) -> Option<Value> {
        self.resources.insert(key.into(), resource)
    }

    pub fn output(&self, key: &str) -> Option<&Value> {
        self.outputs.as_ref().and_then(|outputs| outputs.get(key))
    }

    /// Insert a stack output, creating `Outputs` if needed. Last write wins.
    pub fn insert_output(&mut self, key: impl Into<String>, output: Value) -> Option<Value> {
        self.outputs
            .get_or_insert_with(Map::new)
            .insert(key.into(), output)
    }
}
