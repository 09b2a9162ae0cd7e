//! In-memory gateway used by tests. Records every call it receives.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{INVALID_VERSION_MESSAGE, RemoteError, RemoteRequest};
use crate::documentation::Location;

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub service: String,
    pub operation: String,
    pub params: Value,
    pub stage: String,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredPart {
    pub id: String,
    pub location: Value,
    pub properties: String,
}

#[derive(Default)]
struct State {
    api_id: Option<String>,
    parts: Vec<StoredPart>,
    next_id: usize,
    versions: BTreeSet<String>,
    failures: BTreeMap<String, RemoteError>,
    page_size: usize,
    calls: Vec<Call>,
}

pub(crate) struct RecordingRemote {
    state: Mutex<State>,
}

impl RecordingRemote {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                page_size: 2,
                ..Default::default()
            }),
        }
    }

    pub fn with_api_id(self, api_id: &str) -> Self {
        self.state.lock().unwrap().api_id = Some(api_id.to_string());
        self
    }

    pub fn with_part(self, id: &str, location: &Location, properties: Value) -> Self {
        self.state.lock().unwrap().parts.push(StoredPart {
            id: id.to_string(),
            location: serde_json::to_value(location).unwrap(),
            properties: properties.to_string(),
        });
        self
    }

    pub fn with_raw_part(self, id: &str, location: Value, properties: &str) -> Self {
        self.state.lock().unwrap().parts.push(StoredPart {
            id: id.to_string(),
            location,
            properties: properties.to_string(),
        });
        self
    }

    pub fn with_version(self, version: &str) -> Self {
        self.state.lock().unwrap().versions.insert(version.to_string());
        self
    }

    /// Every call to `operation` fails with `error`.
    pub fn failing(self, operation: &str, error: RemoteError) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation.to_string(), error);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, operation: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation == operation)
            .map(|call| call.params)
            .collect()
    }

    pub fn parts(&self) -> Vec<StoredPart> {
        self.state.lock().unwrap().parts.clone()
    }

    pub fn versions(&self) -> BTreeSet<String> {
        self.state.lock().unwrap().versions.clone()
    }
}

#[async_trait]
impl RemoteRequest for RecordingRemote {
    async fn request(
        &self,
        service: &str,
        operation: &str,
        params: Value,
        stage: &str,
        _region: &str,
    ) -> Result<Value, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            service: service.to_string(),
            operation: operation.to_string(),
            params: params.clone(),
            stage: stage.to_string(),
        });
        if let Some(error) = state.failures.get(operation) {
            return Err(error.clone());
        }

        match operation {
            "describeStacks" => {
                let outputs: Vec<Value> = state
                    .api_id
                    .iter()
                    .map(|id| json!({"OutputKey": "AwsDocApiId", "OutputValue": id}))
                    .collect();
                Ok(json!({"Stacks": [{"StackName": params["StackName"], "Outputs": outputs}]}))
            }
            "getDocumentationVersion" => {
                let version = params["documentationVersion"].as_str().unwrap_or_default();
                if state.versions.contains(version) {
                    Ok(json!({"version": version}))
                } else {
                    Err(RemoteError::NotFound(INVALID_VERSION_MESSAGE.to_string()))
                }
            }
            "getDocumentationParts" => {
                let start: usize = params["position"]
                    .as_str()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(0);
                let end = (start + state.page_size).min(state.parts.len());
                let items: Vec<Value> = state.parts[start..end]
                    .iter()
                    .map(|part| {
                        json!({"id": part.id, "location": part.location, "properties": part.properties})
                    })
                    .collect();
                let mut page = json!({ "items": items });
                if end < state.parts.len() {
                    page["position"] = Value::String(end.to_string());
                }
                Ok(page)
            }
            "createDocumentationPart" => {
                state.next_id += 1;
                let id = format!("created-{}", state.next_id);
                state.parts.push(StoredPart {
                    id: id.clone(),
                    location: params["location"].clone(),
                    properties: params["properties"].as_str().unwrap_or_default().to_string(),
                });
                Ok(json!({ "id": id }))
            }
            "updateDocumentationPart" => {
                let id = params["documentationPartId"].as_str().unwrap_or_default();
                let value = params["patchOperations"][0]["value"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                match state.parts.iter_mut().find(|part| part.id == id) {
                    Some(part) => {
                        part.properties = value;
                        Ok(json!({ "id": id }))
                    }
                    None => Err(RemoteError::NotFound(id.to_string())),
                }
            }
            "deleteDocumentationPart" => {
                let id = params["documentationPartId"].as_str().unwrap_or_default();
                let before = state.parts.len();
                state.parts.retain(|part| part.id != id);
                if state.parts.len() == before {
                    Err(RemoteError::NotFound(id.to_string()))
                } else {
                    Ok(json!({}))
                }
            }
            "createDocumentationVersion" => {
                let version = params["documentationVersion"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                if state.versions.insert(version.clone()) {
                    Ok(json!({ "version": version }))
                } else {
                    Err(RemoteError::VersionAlreadyExists)
                }
            }
            other => Err(RemoteError::Service {
                code: "UnknownOperation".into(),
                message: other.to_string(),
            }),
        }
    }
}
