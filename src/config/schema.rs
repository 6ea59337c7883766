//! Configuration schema definitions.
//!
//! This module defines the declarative route table format.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::route::Paths;
use crate::routing::router::DispatchDefaults;

/// Root configuration for a route table.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    /// Matching options applied to every route.
    pub options: OptionsConfig,

    /// Fallback dispatch keys.
    pub defaults: DispatchDefaults,

    /// Paths resolved when nothing matches.
    pub not_found: Option<PathsConfig>,

    /// Top-level routes, registered before any group.
    pub routes: Vec<RouteConfig>,

    /// Route groups, registered in order after the top-level routes.
    pub groups: Vec<GroupConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Process-wide matching options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// Strip trailing slashes from patterns and request paths.
    pub remove_extra_slashes: bool,

    /// Compare paths case-sensitively.
    pub case_sensitive: bool,

    /// Install the `/{controller}/{action}[/{params}]` routes.
    pub default_routes: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            remove_extra_slashes: true,
            case_sensitive: true,
            default_routes: true,
        }
    }
}

/// Route paths: a `"[module::]controller::action"` string or a table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PathsConfig {
    Shorthand(String),
    Table(Paths),
}

impl PathsConfig {
    pub fn to_paths(&self) -> Paths {
        match self {
            PathsConfig::Shorthand(s) => Paths::parse(s),
            PathsConfig::Table(paths) => paths.clone(),
        }
    }
}

/// A single route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Optional unique name.
    #[serde(default)]
    pub name: Option<String>,

    /// Path pattern, relative to the enclosing groups' prefixes.
    pub pattern: String,

    /// Allowed methods; empty means any.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Hostname constraint.
    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default)]
    pub paths: Option<PathsConfig>,
}

impl RouteConfig {
    /// Name if set, pattern otherwise. Used in error messages.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.pattern)
    }
}

/// A group of routes sharing a prefix, paths and hostname.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GroupConfig {
    pub prefix: String,
    pub paths: Option<PathsConfig>,
    pub hostname: Option<String>,
    pub routes: Vec<RouteConfig>,

    /// Nested groups.
    pub groups: Vec<GroupConfig>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::PathValue;
    use serde_json::json;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: RoutingConfig = toml::from_str("").unwrap();
        assert!(config.options.remove_extra_slashes);
        assert!(config.options.default_routes);
        assert!(config.routes.is_empty());
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_paths_forms() {
        let config: RoutingConfig = toml::from_str(
            r#"
            [[routes]]
            pattern = "/a"
            paths = "users::show"

            [[routes]]
            pattern = "/([0-9]+)"
            paths = { controller = "users", id = 1 }
            "#,
        )
        .unwrap();

        let first = config.routes[0].paths.as_ref().unwrap().to_paths();
        assert_eq!(first.get("action"), Some(&PathValue::Value(json!("show"))));

        let second = config.routes[1].paths.as_ref().unwrap().to_paths();
        assert_eq!(second.get("id"), Some(&PathValue::Position(1)));
        assert_eq!(second.get("controller"), Some(&PathValue::Value(json!("users"))));
    }

    #[test]
    fn test_nested_groups_parse() {
        let config: RoutingConfig = toml::from_str(
            r#"
            [[groups]]
            prefix = "/admin"
            hostname = "admin.example.com"

              [[groups.routes]]
              pattern = "/users"

              [[groups.groups]]
              prefix = "/reports"

                [[groups.groups.routes]]
                pattern = "/daily"
            "#,
        )
        .unwrap();
        let admin = &config.groups[0];
        assert_eq!(admin.routes.len(), 1);
        assert_eq!(admin.groups[0].prefix, "/reports");
        assert_eq!(admin.groups[0].routes[0].pattern, "/daily");
    }
}
