//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! route table (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → loader::build_router (registry → frozen Router)
//!     → shared via SharedRouter to all readers
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<Router>
//!     → readers observe new routes on their next load
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{build_router, load_config, load_router, ConfigError};
pub use schema::{GroupConfig, ObservabilityConfig, RouteConfig, RoutingConfig};
pub use validation::ValidationError;
