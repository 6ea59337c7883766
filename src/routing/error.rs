//! Routing error taxonomy.
//!
//! Registration errors (`InvalidPattern`, `RouteNotFound`) surface from
//! `add*`/reordering calls at startup. `Conversion` is the only error a
//! request can produce. A request that matches nothing is not an error.

use thiserror::Error;

/// Boxed error returned by user converters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while building or using a router.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The route (or hostname) pattern could not be compiled.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A reordering call referenced a route name that is not registered.
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// A converter rejected the value bound to `param`.
    #[error("conversion of parameter `{param}` failed: {source}")]
    Conversion {
        param: String,
        #[source]
        source: BoxError,
    },
}

impl RouterError {
    pub(crate) fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        RouterError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}
