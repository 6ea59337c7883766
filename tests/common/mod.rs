//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::io::Write;

use route_engine::routing::{MatchOptions, Request, Resolution, RouteRegistry, Router};
use tempfile::NamedTempFile;

/// A registry without the `/{controller}/{action}` fallbacks.
pub fn bare_registry() -> RouteRegistry {
    RouteRegistry::with_default_routes(MatchOptions::default(), false)
}

/// Resolve `method path`, panicking if the router reports an error.
pub fn resolve(router: &Router, method: &str, path: &str) -> Option<Resolution> {
    router
        .handle(&Request::new(method, path))
        .expect("routing should not fail")
}

/// Resolve `method host path`, panicking if the router reports an error.
pub fn resolve_on_host(router: &Router, method: &str, host: &str, path: &str) -> Option<Resolution> {
    router
        .handle(&Request::new(method, path).with_hostname(host))
        .expect("routing should not fail")
}

/// Write `contents` to a temporary TOML file kept alive by the handle.
pub fn write_table(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write table");
    file.flush().expect("flush table");
    file
}
