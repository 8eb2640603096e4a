use super::{RouteError, Router, RoutingContext};
use crate::ids::RequestId;
use crate::message::{Request, Response};
use crate::model::{MethodBuilder, ModelBuilder, ResourceBuilder, ResourceModel};
use http::Method;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn verb(verb: Method, name: &str) -> MethodBuilder {
    MethodBuilder::new(verb, name).handles(|_inv| Ok(Response::no_content().into()))
}

fn router(model: ResourceModel) -> Router {
    Router::new(Arc::new(model))
}

fn ctx() -> RoutingContext {
    RoutingContext::new(RequestId::new())
}

#[test]
fn literal_template_wins_over_parameter() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/items")
                .child(ResourceBuilder::new("/{id}").method(verb(Method::GET, "by_id")))
                .child(ResourceBuilder::new("/special").method(verb(Method::GET, "special"))),
        )
        .build()
        .unwrap();
    let router = router(model);

    let req = Request::new(Method::GET, "/items/special");
    let sel = router.route(&req, &mut ctx()).unwrap();
    assert_eq!(sel.method.name, "special");

    let req = Request::new(Method::GET, "/items/42");
    let mut c = ctx();
    let sel = router.route(&req, &mut c).unwrap();
    assert_eq!(sel.method.name, "by_id");
    assert_eq!(c.path_param("id"), Some("42"));
}

#[test]
fn backtracks_past_negotiation_dead_end() {
    // The literal sibling only accepts POST; a GET must fall through to the
    // parameterized sibling instead of stopping at the 405.
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/a")
                .child(ResourceBuilder::new("/b").method(verb(Method::POST, "literal_post")))
                .child(ResourceBuilder::new("/{x}").method(verb(Method::GET, "param_get"))),
        )
        .build()
        .unwrap();
    let router = router(model);

    let req = Request::new(Method::GET, "/a/b");
    let mut c = ctx();
    let sel = router.route(&req, &mut c).unwrap();
    assert_eq!(sel.method.name, "param_get");
    assert_eq!(c.path_param("x"), Some("b"));
}

#[test]
fn method_not_allowed_reports_sorted_allow_set() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/x")
                .method(verb(Method::POST, "create"))
                .method(verb(Method::GET, "read")),
        )
        .build()
        .unwrap();
    let router = router(model);

    let req = Request::new(Method::DELETE, "/x");
    match router.route(&req, &mut ctx()) {
        Err(RouteError::MethodNotAllowed { allow }) => {
            assert_eq!(allow, vec!["GET".to_string(), "POST".to_string()]);
        }
        other => panic!("expected 405, got {other:?}"),
    }
}

#[test]
fn unmatched_path_is_not_found() {
    let model = ModelBuilder::new()
        .resource(ResourceBuilder::new("/items").method(verb(Method::GET, "list")))
        .build()
        .unwrap();
    let router = router(model);

    let req = Request::new(Method::GET, "/nothing/here");
    assert!(matches!(
        router.route(&req, &mut ctx()),
        Err(RouteError::NotFound)
    ));
}

#[test]
fn parameters_accumulate_across_the_chain() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/users/{user_id}").child(
                ResourceBuilder::new("/posts/{post_id}").method(verb(Method::GET, "get_post")),
            ),
        )
        .build()
        .unwrap();
    let router = router(model);

    let req = Request::new(Method::GET, "/users/7/posts/99");
    let mut c = ctx();
    router.route(&req, &mut c).unwrap();
    assert_eq!(c.path_param("user_id"), Some("7"));
    assert_eq!(c.path_param("post_id"), Some("99"));
    assert_eq!(c.matched_templates.len(), 2);
}

#[test]
fn routing_is_deterministic() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/items")
                .child(ResourceBuilder::new("/{id}").method(verb(Method::GET, "by_id")))
                .child(ResourceBuilder::new("/{id: \\d+}").method(verb(Method::GET, "numeric"))),
        )
        .build()
        .unwrap();
    let router = router(model);

    let req = Request::new(Method::GET, "/items/42");
    let first = router.route(&req, &mut ctx()).unwrap().method.name.clone();
    for _ in 0..10 {
        let again = router.route(&req, &mut ctx()).unwrap().method.name.clone();
        assert_eq!(first, again);
    }
    // The regex-constrained template is more specific.
    assert_eq!(first, "numeric");
}

#[test]
fn locator_runs_once_per_request_and_not_across_requests() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    let model = ModelBuilder::new()
        .resource(ResourceBuilder::new("/api").locator(
            "/sub",
            "sub_locator",
            move |_args| {
                counter.fetch_add(1, Ordering::SeqCst);
                ResourceBuilder::new("/")
                    .method(verb(Method::GET, "sub_get"))
                    .build_standalone()
                    .map_err(Into::into)
            },
        ))
        .build()
        .unwrap();
    let router = router(model);

    let req = Request::new(Method::GET, "/api/sub");
    let mut first_request = ctx();
    assert_eq!(
        router.route(&req, &mut first_request).unwrap().method.name,
        "sub_get"
    );
    // Re-entering the locator within the same request hits the cache.
    let _ = router.route(&req, &mut first_request);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    // A separate request invokes the locator independently.
    let _ = router.route(&req, &mut ctx());
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[test]
fn locator_chain_overrides_duplicate_parameter() {
    let model = ModelBuilder::new()
        .resource(ResourceBuilder::new("/outer/{id}").locator(
            "/inner",
            "inner_locator",
            |_args| {
                ResourceBuilder::new("/")
                    .child(
                        ResourceBuilder::new("/{id}").method(verb(Method::GET, "inner_get")),
                    )
                    .build_standalone()
                    .map_err(Into::into)
            },
        ))
        .build()
        .unwrap();
    let router = router(model);

    let req = Request::new(Method::GET, "/outer/first/inner/second");
    let mut c = ctx();
    router.route(&req, &mut c).unwrap();
    // Last write wins: the re-match in the locator subtree overrides.
    assert_eq!(c.path_param("id"), Some("second"));
}

#[test]
fn matrix_parameters_do_not_break_matching() {
    let model = ModelBuilder::new()
        .resource(ResourceBuilder::new("/cars/{year}").method(verb(Method::GET, "cars")))
        .build()
        .unwrap();
    let router = router(model);

    let req = Request::new(Method::GET, "/cars;color=red/2024");
    let mut c = ctx();
    router.route(&req, &mut c).unwrap();
    assert_eq!(c.path_param("year"), Some("2024"));
    assert_eq!(c.matrix_param("color"), Some("red"));
}
