//! The service definition: the declarative input the host tool hands us.
//!
//! Only the subset of the host's service file that matters for models and
//! documentation is modelled here; unknown keys are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::documentation::PartType;

/// Content type assigned to models that do not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Errors raised while loading or validating a service definition.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML service definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON service definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid model name '{0}': must be a non-empty alphanumeric identifier")]
    InvalidModelName(String),
}

/// Top-level service definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceDefinition {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub custom: CustomConfig,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionDefinition>,
}

impl ServiceDefinition {
    /// Parse a YAML service definition.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let service: Self = serde_yaml::from_str(source)?;
        service.validate()?;
        Ok(service)
    }

    /// Parse a JSON service definition.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let service: Self = serde_json::from_str(source)?;
        service.validate()?;
        Ok(service)
    }

    /// Load a service definition from disk. `.json` files are read as JSON,
    /// everything else as YAML.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&source),
            _ => Self::from_yaml_str(&source),
        }
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.custom.documentation {
            Some(documentation) => documentation.validate(),
            None => Ok(()),
        }
    }

    /// The documentation block, if the service declares one.
    pub fn documentation(&self) -> Option<&DocumentationConfig> {
        self.custom.documentation.as_ref()
    }

    /// Every HTTP event that carries a `documentation` block, paired with the
    /// name of the function it belongs to.
    pub fn documented_endpoints(&self) -> Vec<(&str, &HttpEndpointEvent)> {
        self.functions
            .iter()
            .flat_map(|(name, function)| {
                function
                    .events
                    .iter()
                    .filter_map(|event| event.http.as_ref())
                    .filter(|http| http.documentation.is_some())
                    .map(move |http| (name.as_str(), http))
            })
            .collect()
    }
}

/// Provider settings relevant to stack and version naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_stage")]
    pub stage: String,
    #[serde(default = "default_region")]
    pub region: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            stage: default_stage(),
            region: default_region(),
        }
    }
}

fn default_stage() -> String {
    "dev".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// The `custom` section. Only `documentation` is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<DocumentationConfig>,
}

/// API-wide documentation, models and version settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationConfig {
    #[serde(
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,
    #[serde(default)]
    pub auto_version: bool,
    /// Description attached to the published documentation version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Stage the documentation version is published under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<DocFields>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorizers: Vec<AuthorizerDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelDescription>,
}

impl DocumentationConfig {
    /// Reject model names the gateway would refuse or that cannot form a
    /// logical ID.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for model in &self.models {
            if !is_identifier_safe(&model.name) {
                return Err(ConfigError::InvalidModelName(model.name.clone()));
            }
        }
        Ok(())
    }
}

fn is_identifier_safe(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric())
}

/// A request/response model declared by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// JSON-schema-like document. Not validated locally.
    #[serde(default)]
    pub schema: Value,
    #[serde(flatten)]
    pub docs: DocFields,
}

impl ModelDescription {
    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// Documentation for a resource path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDoc {
    pub path: String,
    #[serde(flatten)]
    pub docs: DocFields,
}

/// Documentation for an authorizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizerDoc {
    pub name: String,
    #[serde(flatten)]
    pub docs: DocFields,
}

/// The documentation properties any node of the tree may carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
}

impl DocFields {
    /// Properties published for a part of the given type.
    ///
    /// Every type carries `description` and `summary`; `tags` is kept for
    /// API and METHOD parts, `info` for the API part only.
    pub fn properties(&self, part_type: PartType) -> Map<String, Value> {
        let mut props = Map::new();
        if let Some(description) = &self.description {
            props.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(summary) = &self.summary {
            props.insert("summary".into(), Value::String(summary.clone()));
        }
        if matches!(part_type, PartType::Api | PartType::Method)
            && let Some(tags) = &self.tags
        {
            props.insert(
                "tags".into(),
                Value::Array(tags.iter().cloned().map(Value::String).collect()),
            );
        }
        if part_type == PartType::Api
            && let Some(info) = &self.info
        {
            props.insert("info".into(), info.clone());
        }
        props
    }
}

/// A function declared in the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionDefinition {
    #[serde(default)]
    pub events: Vec<FunctionEvent>,
}

/// One trigger of a function. Non-HTTP triggers deserialize with `http: None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionEvent {
    #[serde(
        default,
        deserialize_with = "optional_http_event",
        skip_serializing_if = "Option::is_none"
    )]
    pub http: Option<HttpEndpointEvent>,
}

/// An HTTP trigger, optionally carrying documentation overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpEndpointEvent {
    pub path: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<EndpointDocumentation>,
}

impl HttpEndpointEvent {
    /// Parse the `"VERB path"` shorthand.
    pub fn from_shorthand(shorthand: &str) -> Option<Self> {
        let mut parts = shorthand.split_whitespace();
        let method = parts.next()?;
        let path = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            path: path.to_string(),
            method: method.to_string(),
            documentation: None,
        })
    }
}

/// Per-endpoint documentation block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDocumentation {
    #[serde(flatten)]
    pub docs: DocFields,
    /// Content type → model name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub request_models: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_params: Vec<NamedDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_params: Vec<NamedDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_headers: Vec<NamedDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<DocFields>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub method_responses: Vec<MethodResponseDoc>,
}

/// Documentation for a named parameter or header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedDoc {
    pub name: String,
    #[serde(flatten)]
    pub docs: DocFields,
}

/// Documentation and models for one response status code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodResponseDoc {
    #[serde(deserialize_with = "string_or_number")]
    pub status_code: String,
    /// Content type → model name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub response_models: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_headers: Vec<NamedDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<DocFields>,
    #[serde(flatten)]
    pub docs: DocFields,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

/// Status codes and versions are often written as bare numbers in YAML.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}

fn optional_http_event<'de, D>(deserializer: D) -> Result<Option<HttpEndpointEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Shorthand(String),
        Full(HttpEndpointEvent),
    }

    match Option::<Repr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Repr::Full(event)) => Ok(Some(event)),
        Some(Repr::Shorthand(shorthand)) => HttpEndpointEvent::from_shorthand(&shorthand)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid http event shorthand: {shorthand}"))),
    }
}
