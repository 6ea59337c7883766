//! End-to-end routing scenarios through the public API.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use route_engine::routing::{
    MatchOptions, Method, PathValue, Paths, Request, RouteRegistry, Router, RouterError,
};

mod common;

#[test]
fn test_first_registered_route_wins() {
    let mut registry = common::bare_registry();
    registry
        .add("/users/{id:int}", "users::show")
        .unwrap()
        .named("user-show");
    registry
        .add("/users/{slug}", "users::profile")
        .unwrap()
        .named("user-profile");
    let router = Router::new(registry);

    let res = common::resolve(&router, "GET", "/users/42").unwrap();
    assert_eq!(res.route_name.as_deref(), Some("user-show"));
    assert_eq!(res.action.as_deref(), Some("show"));
    assert_eq!(res.values["id"], json!("42"));

    let res = common::resolve(&router, "GET", "/users/bob").unwrap();
    assert_eq!(res.route_name.as_deref(), Some("user-profile"));
    assert_eq!(res.values["slug"], json!("bob"));
    assert!(!res.values.contains_key("id"));
}

#[test]
fn test_hostname_constraint_and_captures() {
    let mut registry = common::bare_registry();
    registry
        .add("/docs", "docs::index")
        .unwrap()
        .set_hostname("{tenant}.example.com")
        .unwrap();
    let router = Router::new(registry);

    let res = common::resolve_on_host(&router, "GET", "Acme.Example.com:8080", "/docs").unwrap();
    assert_eq!(res.controller.as_deref(), Some("docs"));
    assert_eq!(res.values["tenant"], json!("Acme"));

    assert!(common::resolve_on_host(&router, "GET", "example.org", "/docs").is_none());
    assert!(common::resolve(&router, "GET", "/docs").is_none());
}

#[test]
fn test_path_captures_override_hostname_and_static_paths() {
    let mut registry = common::bare_registry();
    registry
        .add(
            "/{lang}/about",
            Paths::from([("controller", "pages"), ("lang", "en")]),
        )
        .unwrap()
        .set_hostname("{lang}.example.com")
        .unwrap();
    let router = Router::new(registry);

    let res = common::resolve_on_host(&router, "GET", "fr.example.com", "/de/about").unwrap();
    assert_eq!(res.values["lang"], json!("de"));
    assert_eq!(res.controller.as_deref(), Some("pages"));
}

#[test]
fn test_unnamed_capture_binds_by_position() {
    let mut registry = common::bare_registry();
    registry.add("/user/([0-9]+)", Paths::new()).unwrap();
    let router = Router::new(registry);

    let res = common::resolve(&router, "GET", "/user/123").unwrap();
    assert_eq!(res.values.get("1"), Some(&json!("123")));
    assert!(common::resolve(&router, "GET", "/user/abc").is_none());
}

#[test]
fn test_positional_paths_name_captures() {
    let mut registry = common::bare_registry();
    registry
        .add(
            "/([a-z]+)/([0-9]{4})/([0-9]{2})",
            Paths::new()
                .with("controller", "archive")
                .position("section", 1)
                .position("year", 2)
                .position("month", 3),
        )
        .unwrap();
    let router = Router::new(registry);

    let res = common::resolve(&router, "GET", "/news/2024/05").unwrap();
    assert_eq!(res.values["section"], json!("news"));
    assert_eq!(res.values["year"], json!("2024"));
    assert_eq!(res.values["month"], json!("05"));
    assert!(!res.values.contains_key("1"));
}

#[test]
fn test_malformed_pattern_is_rejected() {
    let mut registry = common::bare_registry();
    let err = registry.add("/{name:(", Paths::new()).unwrap_err();
    assert!(matches!(err, RouterError::InvalidPattern { .. }));
    assert!(registry.is_empty());
}

#[test]
fn test_default_routes_are_tried_last() {
    let mut registry = RouteRegistry::new(MatchOptions::default());
    registry
        .add("/blog/{slug}", "blog::read")
        .unwrap()
        .named("blog-read");
    let router = Router::new(registry);

    let res = common::resolve(&router, "GET", "/blog/hello").unwrap();
    assert_eq!(res.route_name.as_deref(), Some("blog-read"));
    assert_eq!(res.action.as_deref(), Some("read"));

    let res = common::resolve(&router, "GET", "/products/list/a/b").unwrap();
    assert!(res.matched);
    assert_eq!(res.controller.as_deref(), Some("products"));
    assert_eq!(res.action.as_deref(), Some("list"));
    assert_eq!(res.params, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_method_constraints_are_exclusive() {
    let mut registry = common::bare_registry();
    registry.add_get("/items", "items::index").unwrap();
    registry.add_post("/items", "items::create").unwrap();
    registry
        .add_via("/items", "items::modify", [Method::Put, Method::Patch])
        .unwrap();
    let router = Router::new(registry);

    let action = |method: &str| common::resolve(&router, method, "/items").and_then(|r| r.action);
    assert_eq!(action("GET").as_deref(), Some("index"));
    assert_eq!(action("post").as_deref(), Some("create"));
    assert_eq!(action("PATCH").as_deref(), Some("modify"));
    assert_eq!(action("DELETE"), None);
    assert_eq!(action("BREW"), None);
}

#[test]
fn test_literal_route_has_no_captures() {
    let mut registry = common::bare_registry();
    registry.add("/about/", "pages::about").unwrap();
    let router = Router::new(registry);

    let matched = router.match_request(&Request::new("GET", "/about//")).unwrap();
    assert!(matched.raw_captures.is_empty());
    assert!(!matched.route.pattern().is_regex());

    let res = common::resolve(&router, "GET", "/about").unwrap();
    assert_eq!(res.values.len(), 2);
}

#[test]
fn test_reordering_by_name() {
    let mut registry = common::bare_registry();
    registry.add("/{page}", "pages::show").unwrap().named("page");
    registry
        .insert_before_name("page", "/login", "auth::login")
        .unwrap();
    registry.prepend("/{any:.*}", "maintenance::index").unwrap();
    assert!(matches!(
        registry.insert_after_name("missing", "/x", Paths::new()),
        Err(RouterError::RouteNotFound(_))
    ));
    let router = Router::new(registry);

    let res = common::resolve(&router, "GET", "/login").unwrap();
    assert_eq!(res.controller.as_deref(), Some("maintenance"));
    let order: Vec<&str> = router.routes().map(|r| r.pattern().raw()).collect();
    assert_eq!(order, vec!["/{any:.*}", "/login", "/{page}"]);
}

#[test]
fn test_conversion_failure_surfaces_as_error() {
    let mut registry = common::bare_registry();
    registry
        .add("/orders/{id:int}", "orders::show")
        .unwrap()
        .convert("id", |value: Value| {
            let text = value.as_str().unwrap_or_default();
            let id: u32 = text.parse()?;
            Ok(json!(id))
        });
    let router = Router::new(registry);

    let res = common::resolve(&router, "GET", "/orders/12").unwrap();
    assert_eq!(res.values["id"], json!(12));

    let err = router
        .handle(&Request::new("GET", "/orders/99999999999"))
        .unwrap_err();
    assert!(matches!(err, RouterError::Conversion { ref param, .. } if param == "id"));
}

#[test]
fn test_not_found_and_defaults() {
    let mut registry = common::bare_registry();
    registry.add("/", "index::index").unwrap();
    let router = Router::new(registry)
        .with_defaults(route_engine::routing::DispatchDefaults {
            namespace: Some("App".into()),
            ..Default::default()
        })
        .with_not_found("errors::show404");

    let res = common::resolve(&router, "GET", "").unwrap();
    assert!(res.matched);
    assert_eq!(res.namespace.as_deref(), Some("App"));

    let res = common::resolve(&router, "GET", "/nope").unwrap();
    assert!(!res.matched);
    assert_eq!(res.route_id, None);
    assert_eq!(res.controller.as_deref(), Some("errors"));
    assert_eq!(res.action.as_deref(), Some("show404"));
}

#[test]
fn test_unmatched_hostname_falls_through() {
    let mut registry = common::bare_registry();
    registry
        .add("/docs", "docs::index")
        .unwrap()
        .set_hostname(r"([a-z]+)\.example\.com")
        .unwrap();
    registry.add("/docs", "docs::fallback").unwrap();
    let router = Router::new(registry);

    let matched = router
        .match_request(&Request::new("GET", "/docs").with_hostname("docs.example.com"))
        .unwrap();
    assert_eq!(matched.hostname_captures, vec!["docs".to_string()]);
    assert_eq!(matched.route.paths().get("action"), Some(&PathValue::Value(json!("index"))));

    let res = common::resolve_on_host(&router, "GET", "example.com", "/docs").unwrap();
    assert_eq!(res.action.as_deref(), Some("fallback"));
}

#[test]
fn test_bind_precedence() {
    let mut registry = common::bare_registry();
    registry.add("/{controller}/{action}", "index::index").unwrap();
    registry
        .add("/x/{controller}/{action}", "index::index")
        .unwrap()
        .convert("action", |value: Value| {
            Ok(json!(format!("{}Action", value.as_str().unwrap_or_default())))
        });
    let router = Router::new(registry);

    let res = common::resolve(&router, "GET", "/shop/list").unwrap();
    assert_eq!(res.controller.as_deref(), Some("shop"));
    assert_eq!(res.action.as_deref(), Some("list"));

    let res = common::resolve(&router, "GET", "/x/shop/list").unwrap();
    assert_eq!(res.action.as_deref(), Some("listAction"));
}

#[test]
fn test_optional_group_and_named_regex_group() {
    let mut registry = common::bare_registry();
    registry.add("/blog(/[a-z]+)?", "blog::index").unwrap();
    registry
        .add("/user/(?P<id>[0-9]+)", "users::show")
        .unwrap();
    let router = Router::new(registry);

    let res = common::resolve(&router, "GET", "/blog").unwrap();
    assert_eq!(res.values.get("1"), Some(&json!("")));
    let res = common::resolve(&router, "GET", "/blog/rust").unwrap();
    assert_eq!(res.values.get("1"), Some(&json!("/rust")));
    assert!(common::resolve(&router, "GET", "/blog/rust?").is_none());

    let res = common::resolve(&router, "GET", "/user/5").unwrap();
    assert_eq!(res.values.get("id"), Some(&json!("5")));
    assert!(!res.values.contains_key("1"));
}
