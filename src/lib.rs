//! Request routing library: compiled route patterns, ordered matching,
//! parameter binding and hot-reloadable route tables.

pub mod config;
pub mod observability;
pub mod routing;

pub use config::schema::RoutingConfig;
pub use routing::{Request, Resolution, RouteRegistry, Router, RouterError, SharedRouter};
