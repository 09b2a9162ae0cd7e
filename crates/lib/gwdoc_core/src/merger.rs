//! Inserts model resources into a template and wires request/response
//! models into the method resources of documented HTTP endpoints.
//!
//! Two permissive behaviours are part of the contract:
//!
//! - models whose logical IDs collide replace each other, last write wins;
//! - endpoints whose method resource is missing from the template are
//!   skipped without error.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::{EndpointDocumentation, HttpEndpointEvent, MethodResponseDoc};
use crate::models::{ModelResource, model_logical_id};
use crate::naming::Naming;
use crate::template::Template;

/// What a merge changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Logical IDs of inserted model resources.
    pub models: Vec<String>,
    /// Logical IDs that replaced an existing resource.
    pub replaced: Vec<String>,
    /// Method resources that were updated.
    pub methods: Vec<String>,
    /// Method logical IDs that were not found in the template.
    pub skipped: Vec<String>,
}

/// Insert every model into `Resources` under `<Name>Model`.
pub fn insert_models(template: &mut Template, models: &[ModelResource], report: &mut MergeReport) {
    for model in models {
        let logical_id = model.logical_id();
        if template
            .insert_resource(logical_id.clone(), model.to_value())
            .is_some()
        {
            debug!(logical_id = %logical_id, "model resource replaced");
            report.replaced.push(logical_id.clone());
        }
        report.models.push(logical_id);
    }
}

/// Merge models and endpoint documentation into `template`.
pub fn merge<'a>(
    template: &mut Template,
    models: &[ModelResource],
    endpoints: impl IntoIterator<Item = &'a HttpEndpointEvent>,
    naming: &dyn Naming,
) -> MergeReport {
    let mut report = MergeReport::default();
    insert_models(template, models, &mut report);

    let declared: BTreeSet<&str> = models.iter().map(|m| m.name.as_str()).collect();

    for endpoint in endpoints {
        let Some(documentation) = &endpoint.documentation else {
            continue;
        };
        let logical_id = naming.method_logical_id(&endpoint.path, &endpoint.method);
        let Some(resource) = template.resource_mut(&logical_id) else {
            debug!(logical_id = %logical_id, "method resource not in template, skipping");
            report.skipped.push(logical_id);
            continue;
        };
        apply_documentation(resource, documentation, &declared);
        report.methods.push(logical_id);
    }

    report
}

/// Apply one endpoint's models to its method resource.
fn apply_documentation(
    resource: &mut Value,
    documentation: &EndpointDocumentation,
    declared: &BTreeSet<&str>,
) {
    let Some(resource) = resource.as_object_mut() else {
        return;
    };

    let mut added = BTreeSet::new();

    let properties = object_entry(resource, "Properties");

    if !documentation.method_responses.is_empty() {
        let responses = array_entry(properties, "MethodResponses");
        for response in &documentation.method_responses {
            apply_method_response(responses, response, declared, &mut added);
        }
    }

    if !documentation.request_models.is_empty() {
        add_dependencies(&documentation.request_models, declared, &mut added);
        let request_models = object_entry(properties, "RequestModels");
        request_models.extend(model_refs(&documentation.request_models, declared));
    }

    // an existing DependsOn is left as written unless a model was added
    if added.is_empty() {
        return;
    }
    let mut depends_on = existing_depends_on(resource.get("DependsOn"));
    depends_on.extend(added);
    resource.insert(
        "DependsOn".into(),
        Value::Array(depends_on.into_iter().map(Value::String).collect()),
    );
}

fn apply_method_response(
    responses: &mut Vec<Value>,
    response: &MethodResponseDoc,
    declared: &BTreeSet<&str>,
    depends_on: &mut BTreeSet<String>,
) {
    let index = match responses
        .iter()
        .position(|existing| status_code_of(existing).as_deref() == Some(response.status_code.as_str()))
    {
        Some(index) => index,
        None => {
            let mut entry = json!({ "StatusCode": response.status_code });
            if !response.response_headers.is_empty() {
                let parameters: Map<String, Value> = response
                    .response_headers
                    .iter()
                    .map(|header| {
                        (
                            format!("method.response.header.{}", header.name),
                            Value::Bool(true),
                        )
                    })
                    .collect();
                entry["ResponseParameters"] = Value::Object(parameters);
            }
            responses.push(entry);
            responses.len() - 1
        }
    };

    if !response.response_models.is_empty() {
        add_dependencies(&response.response_models, declared, depends_on);
        responses[index]["ResponseModels"] =
            Value::Object(model_refs(&response.response_models, declared));
    }
}

/// Content type → model reference. Models declared in this deployment are
/// referenced through their logical ID; others (e.g. `Empty`) by name.
fn model_refs(models: &BTreeMap<String, String>, declared: &BTreeSet<&str>) -> Map<String, Value> {
    models
        .iter()
        .map(|(content_type, name)| {
            let reference = if declared.contains(name.as_str()) {
                json!({ "Ref": model_logical_id(name) })
            } else {
                Value::String(name.clone())
            };
            (content_type.clone(), reference)
        })
        .collect()
}

fn add_dependencies(
    models: &BTreeMap<String, String>,
    declared: &BTreeSet<&str>,
    depends_on: &mut BTreeSet<String>,
) {
    depends_on.extend(
        models
            .values()
            .filter(|name| declared.contains(name.as_str()))
            .map(|name| model_logical_id(name)),
    );
}

fn existing_depends_on(value: Option<&Value>) -> BTreeSet<String> {
    match value {
        Some(Value::String(id)) => BTreeSet::from([id.clone()]),
        Some(Value::Array(ids)) => ids
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => BTreeSet::new(),
    }
}

fn status_code_of(response: &Value) -> Option<String> {
    match response.get("StatusCode")? {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}

/// Get `map[key]` as an object, replacing any non-object value.
fn object_entry<'m>(map: &'m mut Map<String, Value>, key: &str) -> &'m mut Map<String, Value> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry {
        Value::Object(object) => object,
        _ => unreachable!("entry was just made an object"),
    }
}

/// Get `map[key]` as an array, replacing any non-array value.
fn array_entry<'m>(map: &'m mut Map<String, Value>, key: &str) -> &'m mut Vec<Value> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !entry.is_array() {
        *entry = Value::Array(Vec::new());
    }
    match entry {
        Value::Array(array) => array,
        _ => unreachable!("entry was just made an array"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DocFields, ModelDescription, NamedDoc};
    use crate::models;
    use crate::naming::DefaultNaming;

    fn model(name: &str, schema: Value) -> ModelResource {
        models::compile(&ModelDescription {
            name: name.into(),
            content_type: None,
            schema,
            docs: DocFields::default(),
        })
    }

    fn endpoint(path: &str, method: &str, documentation: EndpointDocumentation) -> HttpEndpointEvent {
        HttpEndpointEvent {
            path: path.into(),
            method: method.into(),
            documentation: Some(documentation),
        }
    }

    fn request_models(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base_template() -> Template {
        Template::from_value(json!({
            "Resources": {
                "ApiGatewayMethodUsersPut": {
                    "Type": "AWS::ApiGateway::Method",
                    "Properties": {"HttpMethod": "PUT", "Integration": {"Type": "AWS_PROXY"}},
                    "DependsOn": ["ApiGatewayResourceUsers"],
                },
                "Other": {"Type": "AWS::Lambda::Function", "Properties": {}},
            }
        }))
        .unwrap()
    }

    #[test]
    fn missing_method_resource_is_skipped() {
        let mut template = Template::from_value(json!({
            "Resources": {"Other": {"Type": "X"}}
        }))
        .unwrap();
        let before = template.clone();
        let put = endpoint(
            "method1",
            "put",
            EndpointDocumentation {
                request_models: request_models(&[("application/json", "Foo")]),
                ..Default::default()
            },
        );

        let report = merge(&mut template, &[], [&put], &DefaultNaming::new("svc"));

        assert_eq!(template, before);
        assert_eq!(report.skipped, vec!["ApiGatewayMethodMethod1Put".to_string()]);
        assert!(report.methods.is_empty());
    }

    #[test]
    fn duplicate_model_names_last_write_wins() {
        let mut template = Template::from_value(json!({"Resources": {}})).unwrap();
        let first = model("Foo", json!({"title": "first"}));
        let second = model("Foo", json!({"title": "second"}));

        let report = merge(&mut template, &[first, second], [], &DefaultNaming::new("svc"));

        assert_eq!(template.resources().len(), 1);
        assert_eq!(
            template.resource("FooModel").unwrap()["Properties"]["Schema"]["title"],
            "second"
        );
        assert_eq!(report.replaced, vec!["FooModel".to_string()]);
    }

    #[test]
    fn merging_twice_converges() {
        let models = vec![model("User", json!({"type": "object"}))];
        let put = endpoint(
            "users",
            "put",
            EndpointDocumentation {
                request_models: request_models(&[("application/json", "User")]),
                method_responses: vec![MethodResponseDoc {
                    status_code: "200".into(),
                    response_models: request_models(&[("application/json", "User")]),
                    response_headers: vec![],
                    response_body: None,
                    docs: DocFields::default(),
                }],
                ..Default::default()
            },
        );
        let naming = DefaultNaming::new("svc");

        let mut template = base_template();
        merge(&mut template, &models, [&put], &naming);
        let once = template.clone();
        merge(&mut template, &models, [&put], &naming);

        assert_eq!(template, once);
        assert_eq!(
            template.resource("ApiGatewayMethodUsersPut").unwrap()["Properties"]["MethodResponses"]
                .as_array()
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn request_models_reference_model_resources() {
        let mut template = base_template();
        let put = endpoint(
            "users",
            "PUT",
            EndpointDocumentation {
                request_models: request_models(&[
                    ("application/json", "User"),
                    ("text/plain", "Empty"),
                ]),
                ..Default::default()
            },
        );

        let report = merge(
            &mut template,
            &[model("User", json!({}))],
            [&put],
            &DefaultNaming::new("svc"),
        );

        assert_eq!(report.methods, vec!["ApiGatewayMethodUsersPut".to_string()]);
        let method = template.resource("ApiGatewayMethodUsersPut").unwrap();
        assert_eq!(
            method["Properties"]["RequestModels"],
            json!({"application/json": {"Ref": "UserModel"}, "text/plain": "Empty"})
        );
        // unrelated properties survive
        assert_eq!(method["Properties"]["HttpMethod"], "PUT");
        assert_eq!(method["Properties"]["Integration"]["Type"], "AWS_PROXY");
        assert_eq!(
            method["DependsOn"],
            json!(["ApiGatewayResourceUsers", "UserModel"])
        );
        // unrelated resources untouched
        assert_eq!(
            template.resource("Other").unwrap(),
            &json!({"Type": "AWS::Lambda::Function", "Properties": {}})
        );
    }

    #[test]
    fn request_models_merge_with_existing_content_types() {
        let mut template = Template::from_value(json!({
            "Resources": {
                "ApiGatewayMethodUsersPost": {
                    "Properties": {"RequestModels": {"application/xml": "Legacy"}}
                }
            }
        }))
        .unwrap();
        let post = endpoint(
            "users",
            "post",
            EndpointDocumentation {
                request_models: request_models(&[("application/json", "Empty")]),
                ..Default::default()
            },
        );

        merge(&mut template, &[], [&post], &DefaultNaming::new("svc"));

        let method = template.resource("ApiGatewayMethodUsersPost").unwrap();
        assert_eq!(
            method["Properties"]["RequestModels"],
            json!({"application/xml": "Legacy", "application/json": "Empty"})
        );
        assert!(method.get("DependsOn").is_none());
    }

    #[test]
    fn method_responses_merge_by_status_code() {
        let mut template = Template::from_value(json!({
            "Resources": {
                "ApiGatewayMethodUsersGet": {
                    "Properties": {"MethodResponses": [{"StatusCode": 200}]}
                }
            }
        }))
        .unwrap();
        let get = endpoint(
            "users",
            "get",
            EndpointDocumentation {
                method_responses: vec![
                    MethodResponseDoc {
                        status_code: "200".into(),
                        response_models: request_models(&[("application/json", "UserList")]),
                        response_headers: vec![],
                        response_body: None,
                        docs: DocFields::default(),
                    },
                    MethodResponseDoc {
                        status_code: "404".into(),
                        response_models: BTreeMap::new(),
                        response_headers: vec![NamedDoc {
                            name: "X-Request-Id".into(),
                            docs: DocFields::default(),
                        }],
                        response_body: None,
                        docs: DocFields::default(),
                    },
                ],
                ..Default::default()
            },
        );

        merge(
            &mut template,
            &[model("UserList", json!({"type": "array"}))],
            [&get],
            &DefaultNaming::new("svc"),
        );

        let method = template.resource("ApiGatewayMethodUsersGet").unwrap();
        assert_eq!(
            method["Properties"]["MethodResponses"],
            json!([
                {"StatusCode": 200, "ResponseModels": {"application/json": {"Ref": "UserListModel"}}},
                {"StatusCode": "404", "ResponseParameters": {"method.response.header.X-Request-Id": true}},
            ])
        );
        assert_eq!(method["DependsOn"], json!(["UserListModel"]));
    }

    #[test]
    fn depends_on_untouched_without_declared_models() {
        let mut template = Template::from_value(json!({
            "Resources": {
                "ApiGatewayMethodUsersPost": {
                    "Properties": {},
                    "DependsOn": "ApiGatewayResourceUsers"
                },
                "ApiGatewayMethodUsersGet": {
                    "Properties": {},
                    "DependsOn": []
                }
            }
        }))
        .unwrap();
        let post = endpoint(
            "users",
            "post",
            EndpointDocumentation {
                request_models: request_models(&[("application/json", "Empty")]),
                ..Default::default()
            },
        );
        let get = endpoint(
            "users",
            "get",
            EndpointDocumentation {
                docs: DocFields {
                    summary: Some("List users".into()),
                    ..Default::default()
                },
                ..Default::default()
            },
        );

        merge(&mut template, &[], [&post, &get], &DefaultNaming::new("svc"));

        assert_eq!(
            template.resource("ApiGatewayMethodUsersPost").unwrap()["DependsOn"],
            "ApiGatewayResourceUsers"
        );
        assert_eq!(
            template.resource("ApiGatewayMethodUsersGet").unwrap()["DependsOn"],
            json!([])
        );
    }

    #[test]
    fn endpoints_without_documentation_are_ignored() {
        let mut template = base_template();
        let before = template.clone();
        let bare = HttpEndpointEvent {
            path: "users".into(),
            method: "put".into(),
            documentation: None,
        };

        let report = merge(&mut template, &[], [&bare], &DefaultNaming::new("svc"));

        assert_eq!(template, before);
        assert!(report.skipped.is_empty());
        assert!(report.methods.is_empty());
    }
}
