//! Route lookup and dispatch resolution.
//!
//! # Responsibilities
//! - Store compiled routes, frozen after construction
//! - Look up the matching route for a request
//! - Bind parameters and resolve controller/action/namespace/module
//! - Publish routers for concurrent readers with atomic swap on reload
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) ordered scan, first match wins
//! - Explicit no-match (`None`) rather than silent default, unless
//!   not-found paths were configured

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::observability::metrics;
use crate::routing::binder::{ParameterBinder, Params};
use crate::routing::error::RouterError;
use crate::routing::matcher::{MatchResult, Matcher, Request};
use crate::routing::pattern::MatchOptions;
use crate::routing::registry::{static_values, RouteRegistry};
use crate::routing::route::{Paths, Route, RouteId};

/// Fallbacks for the reserved dispatch keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchDefaults {
    pub namespace: Option<String>,
    pub module: Option<String>,
    pub controller: Option<String>,
    pub action: Option<String>,
}

/// What the dispatch collaborator receives for a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// `false` when the not-found paths were used.
    pub matched: bool,
    pub route_id: Option<RouteId>,
    pub route_name: Option<String>,
    pub namespace: Option<String>,
    pub module: Option<String>,
    pub controller: Option<String>,
    pub action: Option<String>,
    /// The `params` value split on `/`.
    pub params: Vec<String>,
    /// Every bound parameter.
    pub values: Params,
}

/// An immutable, shareable route table.
#[derive(Debug)]
pub struct Router {
    options: MatchOptions,
    routes: Vec<Route>,
    default_routes: Vec<Route>,
    defaults: DispatchDefaults,
    not_found: Option<Paths>,
    binder: ParameterBinder,
}

impl Router {
    /// Freeze a registry.
    pub fn new(registry: RouteRegistry) -> Self {
        let (options, routes, default_routes) = registry.into_parts();
        tracing::info!(
            routes = routes.len(),
            default_routes = default_routes.len(),
            case_sensitive = options.case_sensitive,
            remove_extra_slashes = options.remove_extra_slashes,
            "router built"
        );
        Self {
            options,
            routes,
            default_routes,
            defaults: DispatchDefaults::default(),
            not_found: None,
            binder: ParameterBinder::new(),
        }
    }

    pub fn with_defaults(mut self, defaults: DispatchDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Paths resolved when no route matches.
    pub fn with_not_found(mut self, paths: impl Into<Paths>) -> Self {
        self.not_found = Some(paths.into());
        self
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    pub fn defaults(&self) -> &DispatchDefaults {
        &self.defaults
    }

    /// Explicit routes followed by default routes, in matching order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().chain(self.default_routes.iter())
    }

    pub fn len(&self) -> usize {
        self.routes.len() + self.default_routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn route_by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name() == Some(name))
    }

    pub fn route_by_id(&self, id: RouteId) -> Option<&Route> {
        self.routes().find(|r| r.id() == id)
    }

    /// Find the first route accepting `request`.
    pub fn match_request(&self, request: &Request<'_>) -> Option<MatchResult<'_>> {
        let found = Matcher::new(self.options, &self.routes, &self.default_routes)
            .match_request(request);
        match &found {
            Some(m) => {
                tracing::debug!(
                    method = request.method,
                    path = request.path,
                    route_id = m.route.id().0,
                    route = m.route.label(),
                    "route matched"
                );
                metrics::record_match(m.route.label());
            }
            None => {
                tracing::debug!(method = request.method, path = request.path, "no route matched");
                metrics::record_miss();
            }
        }
        found
    }

    /// Bind the parameters of a match.
    pub fn bind(&self, matched: &MatchResult<'_>) -> Result<Params, RouterError> {
        self.binder.bind(matched)
    }

    /// Match, bind and resolve the dispatch keys for `request`.
    ///
    /// `Ok(None)` means nothing matched and no not-found paths are set.
    pub fn handle(&self, request: &Request<'_>) -> Result<Option<Resolution>, RouterError> {
        if let Some(matched) = self.match_request(request) {
            let values = self.bind(&matched)?;
            let route = matched.route;
            return Ok(Some(self.resolve(
                true,
                Some(route.id()),
                route.name().map(str::to_string),
                values,
            )));
        }

        Ok(self.not_found.as_ref().map(|paths| {
            let values = static_values(paths)
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect();
            self.resolve(false, None, None, values)
        }))
    }

    fn resolve(
        &self,
        matched: bool,
        route_id: Option<RouteId>,
        route_name: Option<String>,
        values: Params,
    ) -> Resolution {
        let pick = |key: &str, fallback: &Option<String>| {
            values.get(key).and_then(value_to_string).or_else(|| fallback.clone())
        };
        Resolution {
            matched,
            route_id,
            route_name,
            namespace: pick("namespace", &self.defaults.namespace),
            module: pick("module", &self.defaults.module),
            controller: pick("controller", &self.defaults.controller),
            action: pick("action", &self.defaults.action),
            params: values.get("params").map(split_params).unwrap_or_default(),
            values,
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn split_params(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items.iter().filter_map(value_to_string).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// A router handle that can be swapped atomically while readers keep
/// using the table they loaded.
#[derive(Debug)]
pub struct SharedRouter {
    inner: ArcSwap<Router>,
}

impl SharedRouter {
    pub fn new(router: Router) -> Self {
        Self {
            inner: ArcSwap::from_pointee(router),
        }
    }

    /// Snapshot of the current router.
    pub fn load(&self) -> Arc<Router> {
        self.inner.load_full()
    }

    /// Publish a new router. In-flight matches finish on the old one.
    pub fn replace(&self, router: Router) {
        let routes = router.len();
        self.inner.store(Arc::new(router));
        tracing::info!(routes, "router replaced");
    }

    pub fn handle(&self, request: &Request<'_>) -> Result<Option<Resolution>, RouterError> {
        self.inner.load().handle(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::method::Method;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn router(configure: impl FnOnce(&mut RouteRegistry)) -> Router {
        let mut registry = RouteRegistry::new(MatchOptions::default());
        configure(&mut registry);
        Router::new(registry)
    }

    #[test]
    fn test_handle_resolves_dispatch_keys() {
        let r = router(|reg| {
            reg.add_patch("/docs/index", "documentation4::index").unwrap();
        });
        let res = r.handle(&Request::new("PATCH", "/docs/index")).unwrap().unwrap();
        assert!(res.matched);
        assert_eq!(res.controller.as_deref(), Some("documentation4"));
        assert_eq!(res.action.as_deref(), Some("index"));
        assert!(res.params.is_empty());
    }

    #[test]
    fn test_default_route_params_split() {
        let r = router(|_| {});
        let res = r.handle(&Request::new("GET", "/posts/show/2019/hello")).unwrap().unwrap();
        assert_eq!(res.controller.as_deref(), Some("posts"));
        assert_eq!(res.action.as_deref(), Some("show"));
        assert_eq!(res.params, vec!["2019".to_string(), "hello".to_string()]);
        assert_eq!(res.values["params"], json!("2019/hello"));
    }

    #[test]
    fn test_dispatch_defaults_fill_gaps() {
        let r = router(|reg| {
            reg.add("/", Paths::new()).unwrap();
        })
        .with_defaults(DispatchDefaults {
            controller: Some("index".into()),
            action: Some("index".into()),
            ..DispatchDefaults::default()
        });
        let res = r.handle(&Request::new("GET", "/")).unwrap().unwrap();
        assert_eq!(res.controller.as_deref(), Some("index"));
        assert_eq!(res.module, None);
    }

    #[test]
    fn test_no_match_and_not_found() {
        let r = router(|reg| {
            reg.add_get("/only", Paths::new()).unwrap();
        });
        assert!(r.handle(&Request::new("GET", "/nope")).unwrap().is_none());

        let r = r.with_not_found("errors::show404");
        let res = r.handle(&Request::new("GET", "/nope")).unwrap().unwrap();
        assert!(!res.matched);
        assert_eq!(res.route_id, None);
        assert_eq!(res.controller.as_deref(), Some("errors"));
        assert_eq!(res.action.as_deref(), Some("show404"));
    }

    #[test]
    fn test_conversion_error_surfaces_from_handle() {
        let r = router(|reg| {
            reg.add("/fail/{x}", Paths::new())
                .unwrap()
                .convert("x", |_| Err("nope".into()));
        });
        assert!(matches!(
            r.handle(&Request::new("GET", "/fail/1")),
            Err(RouterError::Conversion { .. })
        ));
    }

    #[test]
    fn test_lookup_after_freeze() {
        let r = router(|reg| {
            reg.add_via("/a", Paths::new(), Method::Get).unwrap().named("a");
        });
        let id = r.route_by_name("a").unwrap().id();
        assert_eq!(r.route_by_id(id).unwrap().name(), Some("a"));
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn test_shared_router_swap() {
        let shared = SharedRouter::new(router(|reg| {
            reg.add("/v1", "v1::index").unwrap();
        }));
        let old = shared.load();
        shared.replace(router(|reg| {
            reg.add("/v2", "v2::index").unwrap();
        }));

        // the snapshot taken before the swap is unaffected
        assert!(old.match_request(&Request::new("GET", "/v1")).is_some());

        let res = shared.handle(&Request::new("GET", "/v2")).unwrap().unwrap();
        assert_eq!(res.controller.as_deref(), Some("v2"));
        let res = shared.handle(&Request::new("GET", "/v1")).unwrap();
        // falls through to nothing: "/v1" has one segment, defaults need two
        assert!(res.is_none());
    }
}
