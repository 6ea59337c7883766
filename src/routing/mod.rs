//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     add*/prepend/insert_*_name/begin_group
//!     → registry.rs (ids, group prefix/paths/hostname)
//!     → pattern.rs (compile to literal or anchored regex)
//!     → Router::new freezes the registry
//!
//! Incoming Request (method, hostname, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (method → hostname → before-match → path)
//!     → binder.rs (paths, captures, converters)
//!     → Resolution, or explicit no-match
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Literal patterns compared by equality, no regex
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)

pub mod binder;
pub mod error;
pub mod matcher;
pub mod method;
pub mod pattern;
pub mod registry;
pub mod route;
pub mod router;

pub use binder::{ParameterBinder, Params};
pub use error::{BoxError, RouterError};
pub use matcher::{MatchResult, Matcher, Request};
pub use method::{Method, MethodSet};
pub use pattern::{MatchOptions, PatternCompiler, RoutePattern};
pub use registry::{Group, RouteRegistry};
pub use route::{Converter, PathValue, Paths, Route, RouteId};
pub use router::{DispatchDefaults, Resolution, Router, SharedRouter};
