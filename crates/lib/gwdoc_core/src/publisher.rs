//! Reconciles the gateway's documentation parts
//! with the compiled ones and publishes a documentation version.
//!
//! Phases: `NotStarted → FetchingRemoteState → Diffing → Reconciling →
//! PublishingVersion → Done | Failed`.
//!
//! - A failing stack lookup, version lookup or part listing is fatal.
//! - Individual part create/update/delete failures are collected in the
//!   report and logged; they do not stop the remaining calls.
//! - The version is published only after every part call has settled.
//! - A version that already exists is success. If it exists before
//!   reconciliation starts, no part calls are made at all.

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::documentation::diff::{PartChange, RemotePart, diff};
use crate::documentation::{DocumentationPart, Location};
use crate::remote::{API_GATEWAY, CLOUDFORMATION, RemoteError, RemoteRequest};

/// Stack output holding the REST API id.
pub const API_ID_OUTPUT_KEY: &str = "AwsDocApiId";

/// Page size used when listing remote parts.
const PARTS_PAGE_LIMIT: u32 = 500;

/// Default number of part calls in flight.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Fatal publish failures.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Stack lookup for {stack} failed: {source}")]
    StackLookup {
        stack: String,
        #[source]
        source: RemoteError,
    },

    #[error("Stack {0} has no AwsDocApiId output")]
    ApiIdNotFound(String),

    #[error("Fetching remote documentation state failed: {0}")]
    RemoteState(#[source] RemoteError),

    #[error("Publishing documentation version {version} failed: {source}")]
    VersionPublish {
        version: String,
        #[source]
        source: RemoteError,
    },
}

/// Where the publisher is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPhase {
    NotStarted,
    FetchingRemoteState,
    Diffing,
    Reconciling,
    PublishingVersion,
    Done,
    Failed,
}

/// Kind of part call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartAction {
    Create,
    Update,
    Delete,
}

/// A part call that failed during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct PartFailure {
    pub action: PartAction,
    pub location: Location,
    pub error: RemoteError,
}

/// How the version step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOutcome {
    Published,
    AlreadyExists,
}

/// Summary of a publish run.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReport {
    pub api_id: String,
    pub version: String,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failures: Vec<PartFailure>,
    pub version_outcome: VersionOutcome,
}

impl PublishReport {
    fn new(api_id: &str, version: &str, version_outcome: VersionOutcome) -> Self {
        Self {
            api_id: api_id.to_string(),
            version: version.to_string(),
            created: 0,
            updated: 0,
            deleted: 0,
            unchanged: 0,
            failures: Vec::new(),
            version_outcome,
        }
    }
}

/// Wire shape of a listed part.
#[derive(Deserialize)]
struct RawPart {
    id: String,
    location: Location,
    #[serde(default)]
    properties: Option<String>,
}

#[derive(Deserialize)]
struct RawPartsPage {
    #[serde(default)]
    items: Vec<RawPart>,
    #[serde(default)]
    position: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackOutput {
    output_key: String,
    output_value: String,
}

/// Publishes documentation for one stage/region.
pub struct Publisher<'r> {
    remote: &'r dyn RemoteRequest,
    stage: String,
    region: String,
    version_stage: Option<String>,
    concurrency: usize,
    phase: PublishPhase,
}

impl<'r> Publisher<'r> {
    pub fn new(remote: &'r dyn RemoteRequest, stage: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            remote,
            stage: stage.into(),
            region: region.into(),
            version_stage: None,
            concurrency: DEFAULT_CONCURRENCY,
            phase: PublishPhase::NotStarted,
        }
    }

    /// Stage the version is published under, when it differs from the
    /// deployment stage.
    pub fn with_version_stage(mut self, stage: Option<String>) -> Self {
        self.version_stage = stage;
        self
    }

    /// Maximum number of part calls in flight (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn phase(&self) -> PublishPhase {
        self.phase
    }

    fn enter(&mut self, phase: PublishPhase) {
        debug!(from = ?self.phase, to = ?phase, "publish phase");
        self.phase = phase;
    }

    async fn call(&self, service: &str, operation: &str, params: Value) -> Result<Value, RemoteError> {
        self.remote
            .request(service, operation, params, &self.stage, &self.region)
            .await
    }

    /// Resolve the REST API id from the deployed stack's outputs.
    pub async fn resolve_api_id(&self, stack_name: &str) -> Result<String, PublishError> {
        let lookup_error = |source: RemoteError| PublishError::StackLookup {
            stack: stack_name.to_string(),
            source,
        };
        let result = self
            .call(CLOUDFORMATION, "describeStacks", json!({ "StackName": stack_name }))
            .await
            .map_err(lookup_error)?;

        let outputs = result["Stacks"][0]["Outputs"].clone();
        let outputs: Vec<StackOutput> = match outputs {
            Value::Null => Vec::new(),
            outputs => serde_json::from_value(outputs)
                .map_err(|e| lookup_error(RemoteError::InvalidResponse(e.to_string())))?,
        };

        outputs
            .into_iter()
            .find(|output| output.output_key == API_ID_OUTPUT_KEY)
            .map(|output| output.output_value)
            .ok_or_else(|| PublishError::ApiIdNotFound(stack_name.to_string()))
    }

    /// Reconcile `desired` against the parts stored for `api_id`, then
    /// publish `version`.
    pub async fn publish(
        &mut self,
        api_id: &str,
        desired: &[DocumentationPart],
        version: &str,
        description: Option<&str>,
    ) -> Result<PublishReport, PublishError> {
        let result = self.run(api_id, desired, version, description).await;
        self.enter(match result {
            Ok(_) => PublishPhase::Done,
            Err(_) => PublishPhase::Failed,
        });
        result
    }

    async fn run(
        &mut self,
        api_id: &str,
        desired: &[DocumentationPart],
        version: &str,
        description: Option<&str>,
    ) -> Result<PublishReport, PublishError> {
        self.enter(PublishPhase::FetchingRemoteState);
        if self.version_exists(api_id, version).await? {
            info!(version, "documentation version already exists, skipping upload");
            return Ok(PublishReport::new(api_id, version, VersionOutcome::AlreadyExists));
        }
        let remote = self.fetch_parts(api_id).await?;

        self.enter(PublishPhase::Diffing);
        let plan = diff(desired, &remote);
        info!(
            create = plan.creates(),
            update = plan.updates(),
            delete = plan.deletes(),
            unchanged = plan.unchanged,
            "documentation plan"
        );

        self.enter(PublishPhase::Reconciling);
        let mut report = PublishReport::new(api_id, version, VersionOutcome::Published);
        report.unchanged = plan.unchanged;
        let outcomes: Vec<Result<PartAction, PartFailure>> = stream::iter(plan.changes)
            .map(|change| self.apply(api_id, change))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        for outcome in outcomes {
            match outcome {
                Ok(PartAction::Create) => report.created += 1,
                Ok(PartAction::Update) => report.updated += 1,
                Ok(PartAction::Delete) => report.deleted += 1,
                Err(failure) => {
                    warn!(
                        action = ?failure.action,
                        location = ?failure.location,
                        error = %failure.error,
                        "documentation part call failed"
                    );
                    report.failures.push(failure);
                }
            }
        }

        self.enter(PublishPhase::PublishingVersion);
        report.version_outcome = self.create_version(api_id, version, description).await?;
        Ok(report)
    }

    async fn version_exists(&self, api_id: &str, version: &str) -> Result<bool, PublishError> {
        let params = json!({ "restApiId": api_id, "documentationVersion": version });
        match self.call(API_GATEWAY, "getDocumentationVersion", params).await {
            Ok(_) => Ok(true),
            Err(RemoteError::NotFound(_)) => Ok(false),
            Err(e) => Err(PublishError::RemoteState(e)),
        }
    }

    /// List every stored part, following pagination.
    async fn fetch_parts(&self, api_id: &str) -> Result<Vec<RemotePart>, PublishError> {
        let mut parts = Vec::new();
        let mut position: Option<String> = None;
        loop {
            let mut params = json!({ "restApiId": api_id, "limit": PARTS_PAGE_LIMIT });
            if let Some(position) = &position {
                params["position"] = Value::String(position.clone());
            }
            let page = self
                .call(API_GATEWAY, "getDocumentationParts", params)
                .await
                .map_err(PublishError::RemoteState)?;
            let page: RawPartsPage = serde_json::from_value(page).map_err(|e| {
                PublishError::RemoteState(RemoteError::InvalidResponse(e.to_string()))
            })?;

            parts.extend(page.items.into_iter().map(into_remote_part));
            match page.position {
                Some(next) if position.as_ref() != Some(&next) => position = Some(next),
                _ => break,
            }
        }
        debug!(count = parts.len(), "fetched remote documentation parts");
        Ok(parts)
    }

    async fn apply(&self, api_id: &str, change: PartChange) -> Result<PartAction, PartFailure> {
        let (action, operation, params) = match &change {
            PartChange::Create(part) => (
                PartAction::Create,
                "createDocumentationPart",
                json!({
                    "restApiId": api_id,
                    "location": part.location,
                    "properties": Value::Object(part.properties.clone()).to_string(),
                }),
            ),
            PartChange::Update { id, part } => (
                PartAction::Update,
                "updateDocumentationPart",
                json!({
                    "restApiId": api_id,
                    "documentationPartId": id,
                    "patchOperations": [{
                        "op": "replace",
                        "path": "/properties",
                        "value": Value::Object(part.properties.clone()).to_string(),
                    }],
                }),
            ),
            PartChange::Delete { id, .. } => (
                PartAction::Delete,
                "deleteDocumentationPart",
                json!({ "restApiId": api_id, "documentationPartId": id }),
            ),
        };

        self.call(API_GATEWAY, operation, params)
            .await
            .map(|_| action)
            .map_err(|error| PartFailure {
                action,
                location: change.location().clone(),
                error,
            })
    }

    async fn create_version(
        &self,
        api_id: &str,
        version: &str,
        description: Option<&str>,
    ) -> Result<VersionOutcome, PublishError> {
        let stage = self.version_stage.as_deref().unwrap_or(&self.stage);
        let mut params = json!({
            "restApiId": api_id,
            "documentationVersion": version,
            "stageName": stage,
        });
        if let Some(description) = description {
            params["description"] = Value::String(description.to_string());
        }
        match self.call(API_GATEWAY, "createDocumentationVersion", params).await {
            Ok(_) => {
                info!(version, stage, "documentation version published");
                Ok(VersionOutcome::Published)
            }
            Err(RemoteError::VersionAlreadyExists) => {
                info!(version, "documentation version already exists, skipping upload");
                Ok(VersionOutcome::AlreadyExists)
            }
            Err(source) => Err(PublishError::VersionPublish {
                version: version.to_string(),
                source,
            }),
        }
    }
}

fn into_remote_part(raw: RawPart) -> RemotePart {
    let properties = match raw.properties.as_deref().map(serde_json::from_str::<Value>) {
        Some(Ok(Value::Object(properties))) => properties,
        None => Map::new(),
        Some(_) => {
            warn!(id = %raw.id, "remote part has unreadable properties");
            Map::new()
        }
    };
    RemotePart {
        id: raw.id,
        location: raw.location,
        properties,
    }
}
