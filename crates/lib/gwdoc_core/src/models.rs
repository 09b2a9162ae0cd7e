//! Turns declared models into `AWS::ApiGateway::Model`
//! template resources.
//!
//! Schemas are passed through as-is. The gateway validates them when the
//! template is applied; a malformed schema surfaces there, not here.

use serde_json::{Value, json};

use crate::config::ModelDescription;
use crate::template::REST_API_LOGICAL_ID;

pub const MODEL_RESOURCE_TYPE: &str = "AWS::ApiGateway::Model";

/// Logical ID of the resource compiled from the model called `name`.
pub fn model_logical_id(name: &str) -> String {
    format!("{name}Model")
}

/// A compiled model resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResource {
    pub name: String,
    pub content_type: String,
    pub schema: Value,
    pub description: Option<String>,
}

impl ModelResource {
    /// Key under which the resource is stored in `Resources`.
    pub fn logical_id(&self) -> String {
        model_logical_id(&self.name)
    }

    /// The template fragment for this model.
    pub fn to_value(&self) -> Value {
        let mut properties = json!({
            "RestApiId": { "Ref": REST_API_LOGICAL_ID },
            "ContentType": self.content_type,
            "Name": self.name,
            "Schema": self.schema,
        });
        if let Some(description) = &self.description {
            properties["Description"] = Value::String(description.clone());
        }
        json!({
            "Type": MODEL_RESOURCE_TYPE,
            "Properties": properties,
        })
    }
}

/// Compile one model description.
pub fn compile(model: &ModelDescription) -> ModelResource {
    ModelResource {
        name: model.name.clone(),
        content_type: model.content_type().to_string(),
        schema: model.schema.clone(),
        description: model.docs.description.clone(),
    }
}

/// Compile every model, preserving declaration order.
pub fn compile_all(models: &[ModelDescription]) -> Vec<ModelResource> {
    models.iter().map(compile).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocFields;

    fn model(name: &str, content_type: Option<&str>, schema: Value) -> ModelDescription {
        ModelDescription {
            name: name.to_string(),
            content_type: content_type.map(str::to_string),
            schema,
            docs: DocFields::default(),
        }
    }

    #[test]
    fn compiles_model_resource() {
        let resource = compile(&model("User", Some("application/xml"), json!({"type": "object"})));
        assert_eq!(resource.logical_id(), "UserModel");
        assert_eq!(
            resource.to_value(),
            json!({
                "Type": "AWS::ApiGateway::Model",
                "Properties": {
                    "RestApiId": {"Ref": "ApiGatewayRestApi"},
                    "ContentType": "application/xml",
                    "Name": "User",
                    "Schema": {"type": "object"},
                }
            })
        );
    }

    #[test]
    fn content_type_defaults_to_json() {
        let resource = compile(&model("Error", None, json!({})));
        assert_eq!(resource.content_type, "application/json");
    }

    #[test]
    fn name_is_preserved_for_any_identifier() {
        for name in ["A", "Foo", "Foo123", "lowercase"] {
            let resource = compile(&model(name, None, Value::Null));
            assert_eq!(resource.to_value()["Properties"]["Name"], name);
            assert_eq!(resource.logical_id(), format!("{name}Model"));
        }
    }

    #[test]
    fn schema_is_passed_through_unvalidated() {
        let schema = json!({"type": "not-a-type", "properties": {"a": {"b": {"c": [1, 2]}}}});
        let resource = compile(&model("Odd", None, schema.clone()));
        assert_eq!(resource.to_value()["Properties"]["Schema"], schema);
    }

    #[test]
    fn description_is_copied() {
        let mut described = model("Pet", None, json!({}));
        described.docs.description = Some("A pet".into());
        assert_eq!(compile(&described).to_value()["Properties"]["Description"], "A pet");
    }
}
