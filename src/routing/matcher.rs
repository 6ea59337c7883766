//! Route matching logic.
//!
//! # Responsibilities
//! - Check method constraints (case-insensitive, fixed method set)
//! - Check hostname constraints (literal or regex, case-insensitive)
//! - Run the route's before-match hook
//! - Match the normalized path and collect captures
//! - Combine the checks with AND semantics, cheapest first
//!
//! # Design Decisions
//! - Routes are tried strictly in registration order, default routes last
//! - First route satisfying every condition wins; no specificity scoring
//! - A miss is `None`, never an error

use crate::routing::pattern::{normalize_path, MatchOptions};
use crate::routing::route::Route;

/// The request fields the router looks at. Paths arrive already
/// percent-decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub method: &'a str,
    pub hostname: Option<&'a str>,
    pub path: &'a str,
}

impl<'a> Request<'a> {
    pub fn new(method: &'a str, path: &'a str) -> Self {
        Self {
            method,
            hostname: None,
            path,
        }
    }

    pub fn with_hostname(mut self, hostname: &'a str) -> Self {
        self.hostname = Some(hostname);
        self
    }
}

/// A successful match.
#[derive(Debug, Clone)]
pub struct MatchResult<'r> {
    pub route: &'r Route,
    /// Path captures in pattern order.
    pub raw_captures: Vec<String>,
    /// Hostname captures in pattern order.
    pub hostname_captures: Vec<String>,
}

/// Walks a route list in order and returns the first match.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'r> {
    options: MatchOptions,
    routes: &'r [Route],
    default_routes: &'r [Route],
}

impl<'r> Matcher<'r> {
    pub fn new(options: MatchOptions, routes: &'r [Route], default_routes: &'r [Route]) -> Self {
        Self {
            options,
            routes,
            default_routes,
        }
    }

    /// Find the first route accepting `request`.
    pub fn match_request(&self, request: &Request<'_>) -> Option<MatchResult<'r>> {
        let path = normalize_path(request.path, &self.options);
        self.routes
            .iter()
            .chain(self.default_routes.iter())
            .find_map(|route| try_route(route, request, path))
    }
}

/// Evaluate one route: method, hostname, before-match, then path.
pub fn try_route<'r>(route: &'r Route, request: &Request<'_>, path: &str) -> Option<MatchResult<'r>> {
    if !method_allowed(route, request) {
        return None;
    }
    let hostname_captures = hostname_captures(route, request)?;
    if !before_match_passes(route, request) {
        tracing::trace!(route_id = route.id().0, "rejected by before-match hook");
        return None;
    }
    let raw_captures = route.pattern().captures(path)?;
    Some(MatchResult {
        route,
        raw_captures,
        hostname_captures,
    })
}

fn method_allowed(route: &Route, request: &Request<'_>) -> bool {
    route
        .methods()
        .map(|methods| methods.allows(request.method))
        .unwrap_or(true)
}

/// `None` when the route wants a hostname the request does not satisfy.
fn hostname_captures(route: &Route, request: &Request<'_>) -> Option<Vec<String>> {
    match route.hostname() {
        Some(pattern) => pattern.captures(request.hostname?),
        None => Some(Vec::new()),
    }
}

fn before_match_passes(route: &Route, request: &Request<'_>) -> bool {
    route
        .before_match_hook()
        .map(|hook| hook.check(request))
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::method::Method;
    use crate::routing::registry::RouteRegistry;
    use crate::routing::route::Paths;

    fn registry() -> RouteRegistry {
        RouteRegistry::with_default_routes(MatchOptions::default(), false)
    }

    fn find<'r>(r: &'r RouteRegistry, req: Request<'_>) -> Option<MatchResult<'r>> {
        Matcher::new(*r.options(), r.routes(), r.default_routes()).match_request(&req)
    }

    #[test]
    fn test_literal_match_has_no_captures() {
        let mut r = registry();
        r.add("/docs/index", Paths::new()).unwrap();
        let m = find(&r, Request::new("GET", "/docs/index/")).unwrap();
        assert!(m.raw_captures.is_empty());
        assert!(find(&r, Request::new("GET", "/docs")).is_none());
    }

    #[test]
    fn test_method_filter() {
        let mut r = registry();
        r.add_patch("/docs/index", Paths::new()).unwrap();
        assert!(find(&r, Request::new("patch", "/docs/index")).is_some());
        assert!(find(&r, Request::new("GET", "/docs/index")).is_none());
        assert!(find(&r, Request::new("BREW", "/docs/index")).is_none());
    }

    #[test]
    fn test_unconstrained_route_accepts_any_method() {
        let mut r = registry();
        r.add("/any", Paths::new()).unwrap();
        assert!(find(&r, Request::new("BREW", "/any")).is_some());
    }

    #[test]
    fn test_registration_order_wins() {
        let mut r = registry();
        let first = r.add("/items/{id}", Paths::new()).unwrap().id();
        r.add("/items/{slug}", Paths::new()).unwrap();
        assert_eq!(find(&r, Request::new("GET", "/items/x")).unwrap().route.id(), first);
    }

    #[test]
    fn test_hostname_constraint() {
        let mut r = registry();
        r.add("/docs", Paths::new())
            .unwrap()
            .set_hostname(r"([a-z]+)\.example\.com")
            .unwrap();
        let fallback = r.add("/docs", Paths::new()).unwrap().id();

        let m = find(&r, Request::new("GET", "/docs").with_hostname("docs.example.com")).unwrap();
        assert_eq!(m.hostname_captures, vec!["docs".to_string()]);

        let m = find(&r, Request::new("GET", "/docs").with_hostname("example.com")).unwrap();
        assert_eq!(m.route.id(), fallback);

        // no hostname at all cannot satisfy a hostname constraint
        let m = find(&r, Request::new("GET", "/docs")).unwrap();
        assert_eq!(m.route.id(), fallback);
    }

    #[test]
    fn test_before_match_rejects() {
        let mut r = registry();
        r.add("/secret", Paths::new())
            .unwrap()
            .before_match(|req| req.hostname == Some("internal"));
        assert!(find(&r, Request::new("GET", "/secret")).is_none());
        assert!(find(&r, Request::new("GET", "/secret").with_hostname("internal")).is_some());
    }

    #[test]
    fn test_hostname_checked_before_hook() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut r = registry();
        r.add_get("/hooked", Paths::new())
            .unwrap()
            .before_match(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                true
            })
            .set_hostname("api.example.com")
            .unwrap();

        assert!(find(&r, Request::new("POST", "/hooked").with_hostname("api.example.com")).is_none());
        assert!(find(&r, Request::new("GET", "/hooked").with_hostname("www.example.com")).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(find(&r, Request::new("GET", "/hooked").with_hostname("api.example.com")).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_routes_tried_last() {
        let mut r = RouteRegistry::new(MatchOptions::default());
        let explicit = r.add_get("/{a}/{b}", Paths::new()).unwrap().id();

        let m = find(&r, Request::new("GET", "/posts/show")).unwrap();
        assert_eq!(m.route.id(), explicit);

        let m = find(&r, Request::new("POST", "/posts/show")).unwrap();
        assert_eq!(m.route.pattern().raw(), "/{controller}/{action}");

        let m = find(&r, Request::new("POST", "/posts/show/1/2")).unwrap();
        assert_eq!(m.route.pattern().raw(), "/{controller}/{action}/{params:.*}");
        assert_eq!(m.raw_captures[2], "1/2");
    }

    #[test]
    fn test_method_set_condition() {
        let mut r = registry();
        r.add_via("/form", Paths::new(), [Method::Get, Method::Post]).unwrap();
        assert!(find(&r, Request::new("post", "/form")).is_some());
        assert!(find(&r, Request::new("PUT", "/form")).is_none());
    }
}
