//! Documentation version resolution.
//!
//! An explicit `version` always wins. With `autoVersion: true` the version is
//! a content hash of everything that ends up in the published documentation,
//! so an unchanged service never publishes a new version.

use serde_json::{Map, Value, json};

use crate::config::ServiceDefinition;

/// The version to publish, or `None` when the service declares neither a
/// version nor `autoVersion`.
pub fn resolve(service: &ServiceDefinition) -> Result<Option<String>, serde_json::Error> {
    let Some(documentation) = service.documentation() else {
        return Ok(None);
    };
    if let Some(version) = &documentation.version {
        return Ok(Some(version.clone()));
    }
    if !documentation.auto_version {
        return Ok(None);
    }

    let mut function_docs = Map::new();
    for (function, endpoint) in service.documented_endpoints() {
        let key = format!("{function}{}{}", endpoint.method, endpoint.path);
        function_docs.insert(key, serde_json::to_value(&endpoint.documentation)?);
    }
    let snapshot = json!({
        "globalDocs": serde_json::to_value(documentation)?,
        "functionDocs": Value::Object(function_docs),
    });

    // serde_json maps are key-sorted, so the rendering is canonical
    Ok(Some(compute_hash(&snapshot.to_string())))
}

/// FNV-1a 128-bit hash, hex encoded.
fn compute_hash(input: &str) -> String {
    let mut h: u128 = 0x6c62272e07bb0142_62b821756295c58d;
    for b in input.bytes() {
        h ^= b as u128;
        h = h.wrapping_mul(0x0000000001000000_000000000000013B);
    }
    format!("{h:032x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(yaml: &str) -> ServiceDefinition {
        ServiceDefinition::from_yaml_str(yaml).unwrap()
    }

    const AUTO: &str = r#"
custom:
  documentation:
    autoVersion: true
    api:
      description: v1
functions:
  f:
    events:
      - http:
          path: users
          method: get
          documentation:
            summary: List users
"#;

    #[test]
    fn explicit_version_wins() {
        let svc = service("custom:\n  documentation:\n    version: 3\n    autoVersion: true\n");
        assert_eq!(resolve(&svc).unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn no_version_without_auto_version() {
        assert_eq!(resolve(&service("custom:\n  documentation: {}\n")).unwrap(), None);
        assert_eq!(resolve(&service("service: x\n")).unwrap(), None);
    }

    #[test]
    fn auto_version_is_stable_and_content_sensitive() {
        let first = resolve(&service(AUTO)).unwrap().unwrap();
        let again = resolve(&service(AUTO)).unwrap().unwrap();
        assert_eq!(first, again);
        assert_eq!(first.len(), 32);

        let changed = resolve(&service(&AUTO.replace("List users", "List all users")))
            .unwrap()
            .unwrap();
        assert_ne!(first, changed);
    }

    #[test]
    fn hash_is_fnv1a_128() {
        assert_eq!(compute_hash(""), "6c62272e07bb014262b821756295c58d");
    }
}
