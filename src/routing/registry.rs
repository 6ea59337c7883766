//! Route registration.
//!
//! # Responsibilities
//! - Compile and store routes in priority (registration) order
//! - Reorder relative to named routes (prepend, before, after)
//! - Apply the active group's prefix, paths and hostname to new routes
//! - Own the conventional default routes, always tried last
//!
//! # Design Decisions
//! - Mutable only during startup; [`Router::new`](crate::routing::Router::new)
//!   consumes the registry and freezes it
//! - Ids are allocated sequentially, independent of list position
//! - A pattern that fails to compile never enters the registry

use crate::routing::error::RouterError;
use crate::routing::method::{Method, MethodSet};
use crate::routing::pattern::{MatchOptions, PatternCompiler, RoutePattern};
use crate::routing::route::{PathValue, Paths, Route, RouteId};

/// The conventional catch-all routes and their capture names.
pub const DEFAULT_ROUTE_PATTERNS: [&str; 2] = [
    "/{controller}/{action}/{params:.*}",
    "/{controller}/{action}",
];

/// Defaults shared by every route added inside a group.
#[derive(Debug, Clone, Default)]
pub struct Group {
    prefix: String,
    paths: Paths,
    hostname: Option<String>,
}

impl Group {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn with_paths(mut self, paths: impl Into<Paths>) -> Self {
        self.paths = paths.into();
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Where a new route goes in the list.
enum Placement<'a> {
    Append,
    Prepend,
    Before(&'a str),
    After(&'a str),
}

/// Ordered, mutable collection of routes.
#[derive(Debug)]
pub struct RouteRegistry {
    compiler: PatternCompiler,
    routes: Vec<Route>,
    default_routes: Vec<Route>,
    groups: Vec<(Group, Option<RoutePattern>)>,
    next_id: u64,
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new(MatchOptions::default())
    }
}

impl RouteRegistry {
    /// Create a registry with the default routes installed.
    pub fn new(options: MatchOptions) -> Self {
        Self::with_default_routes(options, true)
    }

    /// Create a registry, optionally without the default routes.
    pub fn with_default_routes(options: MatchOptions, enabled: bool) -> Self {
        let mut registry = Self {
            compiler: PatternCompiler::new(options),
            routes: Vec::new(),
            default_routes: Vec::new(),
            groups: Vec::new(),
            next_id: 0,
        };
        if enabled {
            for pattern in DEFAULT_ROUTE_PATTERNS {
                let id = registry.allocate_id();
                match Route::new(id, registry.compiler, "", pattern, Paths::new()) {
                    Ok(route) => registry.default_routes.push(route),
                    Err(e) => tracing::error!(error = %e, "default route failed to compile"),
                }
            }
        }
        registry
    }

    pub fn options(&self) -> &MatchOptions {
        self.compiler.options()
    }

    pub fn compiler(&self) -> &PatternCompiler {
        &self.compiler
    }

    fn allocate_id(&mut self) -> RouteId {
        let id = RouteId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a route matching any method.
    pub fn add(&mut self, pattern: &str, paths: impl Into<Paths>) -> Result<&mut Route, RouterError> {
        self.place(Placement::Append, pattern, paths.into())
    }

    /// Append a route restricted to `methods`.
    pub fn add_via(
        &mut self,
        pattern: &str,
        paths: impl Into<Paths>,
        methods: impl Into<MethodSet>,
    ) -> Result<&mut Route, RouterError> {
        let route = self.place(Placement::Append, pattern, paths.into())?;
        Ok(route.via(methods))
    }

    pub fn add_get(&mut self, pattern: &str, paths: impl Into<Paths>) -> Result<&mut Route, RouterError> {
        self.add_via(pattern, paths, Method::Get)
    }

    pub fn add_post(&mut self, pattern: &str, paths: impl Into<Paths>) -> Result<&mut Route, RouterError> {
        self.add_via(pattern, paths, Method::Post)
    }

    pub fn add_put(&mut self, pattern: &str, paths: impl Into<Paths>) -> Result<&mut Route, RouterError> {
        self.add_via(pattern, paths, Method::Put)
    }

    pub fn add_patch(&mut self, pattern: &str, paths: impl Into<Paths>) -> Result<&mut Route, RouterError> {
        self.add_via(pattern, paths, Method::Patch)
    }

    pub fn add_delete(&mut self, pattern: &str, paths: impl Into<Paths>) -> Result<&mut Route, RouterError> {
        self.add_via(pattern, paths, Method::Delete)
    }

    pub fn add_head(&mut self, pattern: &str, paths: impl Into<Paths>) -> Result<&mut Route, RouterError> {
        self.add_via(pattern, paths, Method::Head)
    }

    pub fn add_options(&mut self, pattern: &str, paths: impl Into<Paths>) -> Result<&mut Route, RouterError> {
        self.add_via(pattern, paths, Method::Options)
    }

    pub fn add_connect(&mut self, pattern: &str, paths: impl Into<Paths>) -> Result<&mut Route, RouterError> {
        self.add_via(pattern, paths, Method::Connect)
    }

    pub fn add_trace(&mut self, pattern: &str, paths: impl Into<Paths>) -> Result<&mut Route, RouterError> {
        self.add_via(pattern, paths, Method::Trace)
    }

    pub fn add_purge(&mut self, pattern: &str, paths: impl Into<Paths>) -> Result<&mut Route, RouterError> {
        self.add_via(pattern, paths, Method::Purge)
    }

    /// Insert a route ahead of every other explicit route.
    pub fn prepend(&mut self, pattern: &str, paths: impl Into<Paths>) -> Result<&mut Route, RouterError> {
        self.place(Placement::Prepend, pattern, paths.into())
    }

    /// Insert a route directly before the route named `target`.
    pub fn insert_before_name(
        &mut self,
        target: &str,
        pattern: &str,
        paths: impl Into<Paths>,
    ) -> Result<&mut Route, RouterError> {
        self.place(Placement::Before(target), pattern, paths.into())
    }

    /// Insert a route directly after the route named `target`.
    pub fn insert_after_name(
        &mut self,
        target: &str,
        pattern: &str,
        paths: impl Into<Paths>,
    ) -> Result<&mut Route, RouterError> {
        self.place(Placement::After(target), pattern, paths.into())
    }

    /// Run `configure` with `group` active. Groups nest: prefixes
    /// concatenate, paths merge (inner wins), the innermost hostname wins.
    pub fn begin_group<F>(&mut self, group: Group, configure: F) -> Result<(), RouterError>
    where
        F: FnOnce(&mut Self) -> Result<(), RouterError>,
    {
        let hostname = match &group.hostname {
            Some(h) => Some(self.compiler.compile_hostname(h)?),
            None => None,
        };
        tracing::debug!(prefix = %group.prefix, "entering route group");
        self.groups.push((group, hostname));
        let result = configure(self);
        self.groups.pop();
        result
    }

    fn position_of(&self, name: &str) -> Result<usize, RouterError> {
        self.routes
            .iter()
            .position(|r| r.name() == Some(name))
            .ok_or_else(|| RouterError::RouteNotFound(name.to_string()))
    }

    fn place(
        &mut self,
        placement: Placement<'_>,
        pattern: &str,
        paths: Paths,
    ) -> Result<&mut Route, RouterError> {
        // resolve the target first so a bad name never consumes an id
        let index = match placement {
            Placement::Append => self.routes.len(),
            Placement::Prepend => 0,
            Placement::Before(target) => self.position_of(target)?,
            Placement::After(target) => self.position_of(target)? + 1,
        };

        let mut prefix = String::new();
        let mut group_paths = Paths::new();
        let mut hostname = None;
        for (group, compiled_host) in &self.groups {
            prefix.push_str(&group.prefix);
            group_paths = group.paths.merged_over(&group_paths);
            if compiled_host.is_some() {
                hostname = compiled_host.clone();
            }
        }
        let paths = paths.merged_over(&group_paths);

        // compile before allocating so failures leave no trace
        let mut route = Route::new(RouteId(self.next_id), self.compiler, &prefix, pattern, paths)?;
        route.set_compiled_hostname(hostname);
        self.allocate_id();

        tracing::debug!(
            route_id = route.id().0,
            pattern = %route.pattern().raw(),
            regex = route.pattern().is_regex(),
            index,
            "route registered"
        );
        self.routes.insert(index, route);
        Ok(&mut self.routes[index])
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn default_routes(&self) -> &[Route] {
        &self.default_routes
    }

    pub fn route_by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name() == Some(name))
    }

    pub fn route_by_name_mut(&mut self, name: &str) -> Option<&mut Route> {
        self.routes.iter_mut().find(|r| r.name() == Some(name))
    }

    pub fn route_by_id(&self, id: RouteId) -> Option<&Route> {
        self.routes
            .iter()
            .chain(self.default_routes.iter())
            .find(|r| r.id() == id)
    }

    /// Remove the explicit route named `name` and hand it back.
    pub fn remove_by_name(&mut self, name: &str) -> Result<Route, RouterError> {
        let index = self.position_of(name)?;
        let route = self.routes.remove(index);
        tracing::debug!(route_id = route.id().0, name, "route removed");
        Ok(route)
    }

    /// Remove all explicit routes. Default routes are kept.
    pub fn clear(&mut self) {
        self.routes.clear();
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn into_parts(self) -> (MatchOptions, Vec<Route>, Vec<Route>) {
        (*self.compiler.options(), self.routes, self.default_routes)
    }
}

/// Paths whose values are all static (positions dropped).
pub(crate) fn static_values(paths: &Paths) -> impl Iterator<Item = (&str, &serde_json::Value)> {
    paths.iter().filter_map(|(k, v)| match v {
        PathValue::Value(value) => Some((k, value)),
        PathValue::Position(_) => None,
    })
}
