//! The single call primitive used to talk to the cloud provider.
//!
//! Failures are typed. In particular an attempt to publish a documentation
//! version that already exists is [`RemoteError::VersionAlreadyExists`],
//! never a string to be matched by callers.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub const CLOUDFORMATION: &str = "CloudFormation";
pub const API_GATEWAY: &str = "APIGateway";

/// Message historically used to signal an existing documentation version.
pub const VERSION_ALREADY_EXISTS_MESSAGE: &str =
    "documentation version already exists, skipping upload";

/// Message the gateway returns when a documentation version is unknown.
pub const INVALID_VERSION_MESSAGE: &str = "Invalid Documentation version specified";

/// Typed remote failure kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("documentation version already exists, skipping upload")]
    VersionAlreadyExists,

    #[error("{code}: {message}")]
    Service { code: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Map a raw service failure for `operation` onto an error kind.
    pub fn classify(operation: &str, code: Option<&str>, message: &str) -> Self {
        if message == VERSION_ALREADY_EXISTS_MESSAGE
            || (operation == "createDocumentationVersion" && code == Some("ConflictException"))
        {
            return Self::VersionAlreadyExists;
        }
        if message == INVALID_VERSION_MESSAGE || code == Some("NotFoundException") {
            return Self::NotFound(message.to_string());
        }
        Self::Service {
            code: code.unwrap_or("UnknownError").to_string(),
            message: message.to_string(),
        }
    }
}

/// Issues one request against a provider service.
///
/// Implementations own timeouts and retries; callers do not retry.
#[async_trait]
pub trait RemoteRequest: Send + Sync {
    async fn request(
        &self,
        service: &str,
        operation: &str,
        params: Value,
        stage: &str,
        region: &str,
    ) -> Result<Value, RemoteError>;
}

#[cfg(test)]
pub(crate) mod testing;
