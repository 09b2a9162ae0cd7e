//! Documentation part compiler.
//!
//! Walks the documentation tree in a fixed order (API-wide parts, then each
//! endpoint's method, parameters, request body and responses) and collects
//! one part per location. A later declaration of the same location replaces
//! the earlier one, and one that carries no properties removes it. Output
//! order is not part of the contract.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::{DocFields, DocumentationConfig, HttpEndpointEvent, ServiceDefinition};

use super::{DocumentationPart, Location, PartType};

#[derive(Default)]
struct PartCollector {
    parts: BTreeMap<Location, Map<String, Value>>,
}

impl PartCollector {
    /// Record a part if `docs` carries any property for its type. A later
    /// declaration without properties removes an earlier part at the same
    /// location.
    fn push(&mut self, location: Location, docs: &DocFields) {
        let properties = docs.properties(location.part_type);
        let location = location.normalized();
        if properties.is_empty() {
            self.parts.remove(&location);
        } else {
            self.parts.insert(location, properties);
        }
    }

    fn into_parts(self) -> Vec<DocumentationPart> {
        self.parts
            .into_iter()
            .map(|(location, properties)| DocumentationPart {
                location,
                properties,
            })
            .collect()
    }
}

/// Compile the API-wide documentation and every documented endpoint.
pub fn compile_paths<'a>(
    documentation: &DocumentationConfig,
    endpoints: impl IntoIterator<Item = &'a HttpEndpointEvent>,
) -> Vec<DocumentationPart> {
    let mut collector = PartCollector::default();
    collect_global(&mut collector, documentation);
    for endpoint in endpoints {
        collect_endpoint(&mut collector, endpoint);
    }
    collector.into_parts()
}

/// Compile all parts declared by a service. Empty when the service has no
/// documentation block.
pub fn compile_service(service: &ServiceDefinition) -> Vec<DocumentationPart> {
    match service.documentation() {
        Some(documentation) => compile_paths(
            documentation,
            service
                .documented_endpoints()
                .into_iter()
                .map(|(_, endpoint)| endpoint),
        ),
        None => Vec::new(),
    }
}

fn collect_global(collector: &mut PartCollector, documentation: &DocumentationConfig) {
    if let Some(api) = &documentation.api {
        collector.push(Location::new(PartType::Api), api);
    }
    for resource in &documentation.resources {
        collector.push(
            Location::new(PartType::Resource).with_path(&resource.path),
            &resource.docs,
        );
    }
    for authorizer in &documentation.authorizers {
        collector.push(
            Location::new(PartType::Authorizer).with_name(&authorizer.name),
            &authorizer.docs,
        );
    }
    for model in &documentation.models {
        collector.push(
            Location::new(PartType::Model).with_name(&model.name),
            &model.docs,
        );
    }
}

fn collect_endpoint(collector: &mut PartCollector, endpoint: &HttpEndpointEvent) {
    let Some(documentation) = &endpoint.documentation else {
        return;
    };
    let method = Location::new(PartType::Method)
        .with_path(&endpoint.path)
        .with_method(&endpoint.method);
    collector.push(method.clone(), &documentation.docs);

    let params = [
        (PartType::PathParameter, &documentation.path_params),
        (PartType::QueryParameter, &documentation.query_params),
        (PartType::RequestHeader, &documentation.request_headers),
    ];
    for (part_type, entries) in params {
        for entry in entries {
            collector.push(
                Location {
                    part_type,
                    ..method.clone()
                }
                .with_name(&entry.name),
                &entry.docs,
            );
        }
    }

    if let Some(body) = &documentation.request_body {
        collector.push(
            Location {
                part_type: PartType::RequestBody,
                ..method.clone()
            },
            body,
        );
    }

    for response in &documentation.method_responses {
        let location = Location {
            part_type: PartType::Response,
            ..method.clone()
        }
        .with_status_code(&response.status_code);
        collector.push(location.clone(), &response.docs);

        for header in &response.response_headers {
            collector.push(
                Location {
                    part_type: PartType::ResponseHeader,
                    ..location.clone()
                }
                .with_name(&header.name),
                &header.docs,
            );
        }
        if let Some(body) = &response.response_body {
            collector.push(
                Location {
                    part_type: PartType::ResponseBody,
                    ..location.clone()
                },
                body,
            );
        }
    }
}
