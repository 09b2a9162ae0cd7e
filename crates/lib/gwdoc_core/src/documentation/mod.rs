//! Located fragments of API documentation as the
//! gateway models them.
//!
//! - [`compile_paths`] turns the documentation tree into parts
//! - [`diff::diff`] plans the remote changes needed to reach them

pub mod compiler;
pub mod diff;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use compiler::{compile_paths, compile_service};
pub use diff::{PartChange, PartPlan, RemotePart};

/// Location types understood by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartType {
    Api,
    Authorizer,
    Model,
    Resource,
    Method,
    PathParameter,
    QueryParameter,
    RequestHeader,
    RequestBody,
    Response,
    ResponseHeader,
    ResponseBody,
}

impl PartType {
    fn uses_path(self) -> bool {
        !matches!(self, Self::Api | Self::Authorizer | Self::Model)
    }

    fn uses_method(self) -> bool {
        self.uses_path() && self != Self::Resource
    }

    fn uses_status_code(self) -> bool {
        matches!(
            self,
            Self::Response | Self::ResponseHeader | Self::ResponseBody
        )
    }

    fn uses_name(self) -> bool {
        matches!(
            self,
            Self::Authorizer
                | Self::Model
                | Self::PathParameter
                | Self::QueryParameter
                | Self::RequestHeader
                | Self::ResponseHeader
        )
    }
}

/// Where a part lives. Two parts with equal locations are the same part.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub part_type: PartType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Location {
    pub fn new(part_type: PartType) -> Self {
        Self {
            part_type,
            path: None,
            method: None,
            status_code: None,
            name: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_status_code(mut self, status_code: impl Into<String>) -> Self {
        self.status_code = Some(status_code.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Canonical form used for comparison: fields the type does not use
    /// are dropped, paths start with `/`, methods are upper-case.
    pub fn normalized(self) -> Self {
        let part_type = self.part_type;
        Self {
            part_type,
            path: self
                .path
                .filter(|_| part_type.uses_path())
                .map(|path| normalize_path(&path)),
            method: self
                .method
                .filter(|_| part_type.uses_method())
                .map(|method| method.to_uppercase()),
            status_code: self.status_code.filter(|_| part_type.uses_status_code()),
            name: self.name.filter(|_| part_type.uses_name()),
        }
    }
}

/// Renders the wire form, e.g. `{"type":"METHOD","path":"/users","method":"GET"}`.
impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        f.write_str(&rendered)
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// A located documentation fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationPart {
    pub location: Location,
    pub properties: Map<String, Value>,
}
