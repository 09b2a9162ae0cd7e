//! Logical-ID naming rules shared with the host deployment tool.
//!
//! The merger must find method resources under exactly the IDs the host's
//! template compiler produced, so these rules mirror the host's.

/// Naming collaborator. Implementations must be pure and deterministic.
pub trait Naming: Send + Sync {
    /// Canonical resource name for a URL path, e.g. `users/{id}` → `UsersIdVar`.
    fn normalize_path(&self, path: &str) -> String;

    /// Logical ID of the method resource for `verb` on `path`.
    fn method_logical_id(&self, path: &str, verb: &str) -> String;

    /// Name of the deployed stack for `stage`.
    fn stack_name(&self, stage: &str) -> String;
}

/// The host tool's default naming rules.
#[derive(Debug, Clone)]
pub struct DefaultNaming {
    service: String,
}

impl DefaultNaming {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl Naming for DefaultNaming {
    fn normalize_path(&self, path: &str) -> String {
        path.split('/').map(normalize_path_part).collect()
    }

    fn method_logical_id(&self, path: &str, verb: &str) -> String {
        format!(
            "ApiGatewayMethod{}{}",
            self.normalize_path(path),
            upper_first(&verb.to_lowercase())
        )
    }

    fn stack_name(&self, stage: &str) -> String {
        format!("{}-{stage}", self.service)
    }
}

/// `user-profile` → `UserDashprofile`, `{id}` → `IdVar`, `{proxy+}` → `ProxyVar`.
fn normalize_path_part(part: &str) -> String {
    let capitalized = upper_first(&part.to_lowercase()).replace('-', "Dash");
    let with_vars = match (capitalized.find('{'), capitalized.rfind('}')) {
        (Some(open), Some(close)) if open < close => format!(
            "{}{}Var{}",
            &capitalized[..open],
            &capitalized[open + 1..close],
            &capitalized[close + 1..]
        ),
        _ => capitalized,
    };
    let alphanumeric: String = with_vars
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    upper_first(&alphanumeric)
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
