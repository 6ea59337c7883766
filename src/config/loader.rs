//! Configuration loading from disk and router construction.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{GroupConfig, RouteConfig, RoutingConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::routing::error::RouterError;
use crate::routing::method::{Method, MethodSet};
use crate::routing::pattern::MatchOptions;
use crate::routing::registry::{Group, RouteRegistry};
use crate::routing::router::Router;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("Route error: {0}")]
    Route(#[from] RouterError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RoutingConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: RoutingConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load a file and build a router from it.
pub fn load_router(path: &Path) -> Result<Router, ConfigError> {
    let config = load_config(path)?;
    build_router(&config)
}

/// Build a frozen router from a configuration.
///
/// Top-level routes are registered first, then each group in order.
pub fn build_router(config: &RoutingConfig) -> Result<Router, ConfigError> {
    validate_config(config).map_err(ConfigError::Validation)?;

    let options = MatchOptions {
        remove_extra_slashes: config.options.remove_extra_slashes,
        case_sensitive: config.options.case_sensitive,
    };
    let mut registry = RouteRegistry::with_default_routes(options, config.options.default_routes);

    for route in &config.routes {
        add_route(&mut registry, route)?;
    }
    for group in &config.groups {
        add_group(&mut registry, group)?;
    }

    let mut router = Router::new(registry).with_defaults(config.defaults.clone());
    if let Some(not_found) = &config.not_found {
        router = router.with_not_found(not_found.to_paths());
    }
    Ok(router)
}

fn add_route(registry: &mut RouteRegistry, config: &RouteConfig) -> Result<(), RouterError> {
    let paths = config
        .paths
        .as_ref()
        .map(|p| p.to_paths())
        .unwrap_or_default();
    let methods: MethodSet = config
        .methods
        .iter()
        .filter_map(|m| m.parse::<Method>().ok())
        .collect();

    let route = registry.add(&config.pattern, paths)?;
    route.via(methods);
    if let Some(name) = &config.name {
        route.named(name.clone());
    }
    if let Some(hostname) = &config.hostname {
        route.set_hostname(hostname)?;
    }
    Ok(())
}

fn add_group(registry: &mut RouteRegistry, config: &GroupConfig) -> Result<(), RouterError> {
    let mut group = Group::new(config.prefix.clone());
    if let Some(paths) = &config.paths {
        group = group.with_paths(paths.to_paths());
    }
    if let Some(hostname) = &config.hostname {
        group = group.with_hostname(hostname.clone());
    }

    registry.begin_group(group, |registry| {
        for route in &config.routes {
            add_route(registry, route)?;
        }
        for nested in &config.groups {
            add_group(registry, nested)?;
        }
        Ok(())
    })
}
