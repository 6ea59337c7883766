//! Compiled routes.
//!
//! # Responsibilities
//! - Hold one compiled path pattern plus its constraints (methods,
//!   hostname, before-match hook)
//! - Hold the route's paths (static defaults and capture positions) and
//!   its named converters
//! - Offer chained setters used right after registration
//!
//! # Design Decisions
//! - Routes are only created by the registry, which assigns the id and
//!   the active group prefix
//! - The path pattern is compiled once in the constructor and never again
//! - Setters take `&mut self` and return `&mut Self` so a freshly added
//!   route can be configured in one expression

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::routing::error::{BoxError, RouterError};
use crate::routing::matcher::Request;
use crate::routing::method::{Method, MethodSet};
use crate::routing::pattern::{PatternCompiler, RoutePattern};

/// Insertion-order identifier of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteId(pub u64);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A paths entry: either a static value or a 1-based capture position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathValue {
    Position(usize),
    Value(Value),
}

/// Target parameters declared for a route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Paths(BTreeMap<String, PathValue>);

impl Paths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `"controller"`, `"controller::action"` or
    /// `"module::controller::action"`.
    pub fn parse(shorthand: &str) -> Self {
        let parts: Vec<&str> = shorthand.split("::").filter(|p| !p.is_empty()).collect();
        let keys: &[&str] = match parts.len() {
            0 => &[],
            1 => &["controller"],
            2 => &["controller", "action"],
            _ => &["module", "controller", "action"],
        };
        let mut paths = Paths::new();
        for (key, part) in keys.iter().zip(parts.iter().rev().take(keys.len()).rev()) {
            paths.insert(*key, PathValue::Value(Value::String((*part).to_string())));
        }
        paths
    }

    /// Add a static value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), PathValue::Value(value.into()));
        self
    }

    /// Bind capture `index` (1-based) to `name`.
    pub fn position(mut self, name: impl Into<String>, index: usize) -> Self {
        self.0.insert(name.into(), PathValue::Position(index));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: PathValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&PathValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PathValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names bound to capture `index`.
    pub fn names_for_position(&self, index: usize) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(move |(k, v)| match v {
            PathValue::Position(i) if *i == index => Some(k.as_str()),
            _ => None,
        })
    }

    /// `self` layered on top of `base`; entries in `self` win.
    pub fn merged_over(&self, base: &Paths) -> Paths {
        let mut merged = base.clone();
        merged.0.extend(self.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}

impl From<&str> for Paths {
    fn from(shorthand: &str) -> Self {
        Paths::parse(shorthand)
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Paths {
    fn from(entries: [(K, V); N]) -> Self {
        entries
            .into_iter()
            .fold(Paths::new(), |paths, (k, v)| paths.with(k, v))
    }
}

type ConvertFn = dyn Fn(Value) -> Result<Value, BoxError> + Send + Sync;

/// A named value converter.
#[derive(Clone)]
pub struct Converter {
    func: Arc<ConvertFn>,
    unconditional: bool,
}

impl Converter {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            unconditional: false,
        }
    }

    /// A converter that also runs when no value was bound (receives `null`).
    pub fn always<F>(func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            unconditional: true,
        }
    }

    pub fn is_unconditional(&self) -> bool {
        self.unconditional
    }

    pub fn apply(&self, value: Value) -> Result<Value, BoxError> {
        (self.func)(value)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("unconditional", &self.unconditional)
            .finish_non_exhaustive()
    }
}

type BeforeMatchFn = dyn Fn(&Request<'_>) -> bool + Send + Sync;

/// Last-chance predicate evaluated before the path is matched.
#[derive(Clone)]
pub struct BeforeMatch(Arc<BeforeMatchFn>);

impl BeforeMatch {
    pub fn check(&self, request: &Request<'_>) -> bool {
        (self.0)(request)
    }
}

impl fmt::Debug for BeforeMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BeforeMatch(..)")
    }
}

/// One registered route.
#[derive(Debug, Clone)]
pub struct Route {
    id: RouteId,
    pattern: RoutePattern,
    methods: Option<MethodSet>,
    hostname: Option<RoutePattern>,
    paths: Paths,
    converters: Vec<(String, Converter)>,
    name: Option<String>,
    group_prefix: String,
    before_match: Option<BeforeMatch>,
    compiler: PatternCompiler,
}

impl Route {
    /// Compile `group_prefix + pattern` into a new route.
    pub(crate) fn new(
        id: RouteId,
        compiler: PatternCompiler,
        group_prefix: &str,
        pattern: &str,
        paths: Paths,
    ) -> Result<Self, RouterError> {
        let full = format!("{}{}", group_prefix, pattern);
        let compiled = compiler.compile(&full)?;
        Ok(Self {
            id,
            pattern: compiled,
            methods: None,
            hostname: None,
            paths,
            converters: Vec::new(),
            name: None,
            group_prefix: group_prefix.to_string(),
            before_match: None,
            compiler,
        })
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// `None` means any method.
    pub fn methods(&self) -> Option<&MethodSet> {
        self.methods.as_ref()
    }

    pub fn hostname(&self) -> Option<&RoutePattern> {
        self.hostname.as_ref()
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn converters(&self) -> impl Iterator<Item = (&str, &Converter)> {
        self.converters.iter().map(|(k, c)| (k.as_str(), c))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn group_prefix(&self) -> &str {
        &self.group_prefix
    }

    pub fn before_match_hook(&self) -> Option<&BeforeMatch> {
        self.before_match.as_ref()
    }

    /// Label used in logs and metrics.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.pattern.raw())
    }

    /// Restrict the route to `methods`.
    pub fn via(&mut self, methods: impl Into<MethodSet>) -> &mut Self {
        let methods = methods.into();
        self.methods = (!methods.is_empty()).then_some(methods);
        self
    }

    /// Add one more allowed method.
    pub fn allow(&mut self, method: Method) -> &mut Self {
        self.methods.get_or_insert_with(MethodSet::new).insert(method);
        self
    }

    pub fn named(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Constrain the route to hostnames matching `pattern`.
    pub fn set_hostname(&mut self, pattern: &str) -> Result<&mut Self, RouterError> {
        self.hostname = Some(self.compiler.compile_hostname(pattern)?);
        Ok(self)
    }

    pub(crate) fn set_compiled_hostname(&mut self, hostname: Option<RoutePattern>) {
        self.hostname = hostname;
    }

    /// Register `converter` for `name`, replacing any earlier one.
    pub fn set_converter(&mut self, name: impl Into<String>, converter: Converter) -> &mut Self {
        let name = name.into();
        match self.converters.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = converter,
            None => self.converters.push((name, converter)),
        }
        self
    }

    /// Shorthand for [`Route::set_converter`] with a conditional converter.
    pub fn convert<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.set_converter(name, Converter::new(func))
    }

    /// Shorthand for [`Route::set_converter`] with an unconditional converter.
    pub fn convert_always<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.set_converter(name, Converter::always(func))
    }

    pub fn before_match<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&Request<'_>) -> bool + Send + Sync + 'static,
    {
        self.before_match = Some(BeforeMatch(Arc::new(predicate)));
        self
    }
}
