//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route names are unique
//! - Check methods belong to the known set
//! - Compile every pattern and hostname with the configured options
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RoutingConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{GroupConfig, PathsConfig, RouteConfig, RoutingConfig};
use crate::routing::method::Method;
use crate::routing::pattern::{MatchOptions, PatternCompiler};
use crate::routing::route::PathValue;

/// A single semantic problem in a route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route `{route}`: unknown HTTP method `{method}`")]
    UnknownMethod { route: String, method: String },

    #[error("duplicate route name `{0}`")]
    DuplicateName(String),

    #[error("`{route}`: capture position for `{param}` must be at least 1")]
    ZeroPosition { route: String, param: String },

    #[error("route `{route}`: {reason}")]
    InvalidPattern { route: String, reason: String },

    #[error("group `{prefix}`: {reason}")]
    InvalidGroup { prefix: String, reason: String },
}

pub fn validate_config(config: &RoutingConfig) -> Result<(), Vec<ValidationError>> {
    let compiler = PatternCompiler::new(MatchOptions {
        remove_extra_slashes: config.options.remove_extra_slashes,
        case_sensitive: config.options.case_sensitive,
    });
    let mut state = Validator {
        compiler,
        names: HashSet::new(),
        errors: Vec::new(),
    };

    for route in &config.routes {
        state.route(route, "");
    }
    for group in &config.groups {
        state.group(group, "");
    }

    if state.errors.is_empty() {
        Ok(())
    } else {
        Err(state.errors)
    }
}

struct Validator<'a> {
    compiler: PatternCompiler,
    names: HashSet<&'a str>,
    errors: Vec<ValidationError>,
}

impl<'a> Validator<'a> {
    fn route(&mut self, route: &'a RouteConfig, prefix: &str) {
        let label = route.label().to_string();

        if let Some(name) = &route.name {
            if !self.names.insert(name) {
                self.errors.push(ValidationError::DuplicateName(name.clone()));
            }
        }

        for method in &route.methods {
            if method.parse::<Method>().is_err() {
                self.errors.push(ValidationError::UnknownMethod {
                    route: label.clone(),
                    method: method.clone(),
                });
            }
        }

        self.positions(route.paths.as_ref(), &label);

        if let Err(e) = self.compiler.compile(&format!("{}{}", prefix, route.pattern)) {
            self.errors.push(ValidationError::InvalidPattern {
                route: label.clone(),
                reason: e.to_string(),
            });
        }

        if let Some(hostname) = &route.hostname {
            if let Err(e) = self.compiler.compile_hostname(hostname) {
                self.errors.push(ValidationError::InvalidPattern {
                    route: label,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn positions(&mut self, paths: Option<&PathsConfig>, owner: &str) {
        if let Some(PathsConfig::Table(paths)) = paths {
            for (param, value) in paths.iter() {
                if matches!(value, PathValue::Position(0)) {
                    self.errors.push(ValidationError::ZeroPosition {
                        route: owner.to_string(),
                        param: param.to_string(),
                    });
                }
            }
        }
    }

    fn group(&mut self, group: &'a GroupConfig, outer_prefix: &str) {
        let prefix = format!("{}{}", outer_prefix, group.prefix);
        self.positions(group.paths.as_ref(), &prefix);

        if let Some(hostname) = &group.hostname {
            if let Err(e) = self.compiler.compile_hostname(hostname) {
                self.errors.push(ValidationError::InvalidGroup {
                    prefix: prefix.clone(),
                    reason: e.to_string(),
                });
            }
        }

        for route in &group.routes {
            self.route(route, &prefix);
        }
        for nested in &group.groups {
            self.group(nested, &prefix);
        }
    }
}
