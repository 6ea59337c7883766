//! Parameter binding.
//!
//! # Precedence (later overwrites earlier)
//! ```text
//! 1. route paths (static values)
//! 2. hostname captures (named only), then path captures
//!      named group        → its name
//!      paths position n   → every name mapped to n
//!      unnamed, unmapped  → "n"
//! 3. converters, for every name that has a value (or unconditionally)
//! ```
//!
//! Reserved names (`controller`, `action`, `namespace`, `module`) get no
//! special treatment here.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::observability::metrics;
use crate::routing::error::RouterError;
use crate::routing::matcher::MatchResult;
use crate::routing::registry::static_values;
use crate::routing::route::Paths;

/// Bound parameters, keyed by name.
pub type Params = BTreeMap<String, Value>;

/// Turns a [`MatchResult`] into the final parameter map.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterBinder;

impl ParameterBinder {
    pub fn new() -> Self {
        Self
    }

    pub fn bind(&self, matched: &MatchResult<'_>) -> Result<Params, RouterError> {
        let route = matched.route;
        let mut params = Params::new();

        for (name, value) in static_values(route.paths()) {
            params.insert(name.to_string(), value.clone());
        }

        if let Some(hostname) = route.hostname() {
            for (name, value) in hostname.param_names().iter().zip(&matched.hostname_captures) {
                if let Some(name) = name {
                    params.insert(name.clone(), Value::String(value.clone()));
                }
            }
        }

        bind_captures(
            &mut params,
            route.paths(),
            route.pattern().param_names(),
            &matched.raw_captures,
        );

        for (name, converter) in route.converters() {
            let input = match params.remove(name) {
                Some(value) => value,
                None if converter.is_unconditional() => Value::Null,
                None => continue,
            };
            match converter.apply(input) {
                Ok(output) => {
                    params.insert(name.to_string(), output);
                }
                Err(source) => {
                    tracing::warn!(
                        route_id = route.id().0,
                        param = name,
                        error = %source,
                        "parameter conversion failed"
                    );
                    metrics::record_conversion_failure(name);
                    return Err(RouterError::Conversion {
                        param: name.to_string(),
                        source,
                    });
                }
            }
        }

        Ok(params)
    }
}

fn bind_captures(
    params: &mut Params,
    paths: &Paths,
    names: &[Option<String>],
    captures: &[String],
) {
    for (index, (name, value)) in names.iter().zip(captures).enumerate() {
        let position = index + 1;
        let mut mapped = false;
        for alias in paths.names_for_position(position) {
            params.insert(alias.to_string(), Value::String(value.clone()));
            mapped = true;
        }
        match name {
            Some(name) => {
                params.insert(name.clone(), Value::String(value.clone()));
            }
            None if !mapped => {
                params.insert(position.to_string(), Value::String(value.clone()));
            }
            None => {}
        }
    }
}
