mod common;

use common::simple_method;
use http::Method;
use restcore::ids::RequestId;
use restcore::message::Request;
use restcore::model::{ModelBuilder, ResourceBuilder};
use restcore::router::{RouteError, Router, RoutingContext};
use std::sync::Arc;

fn route(
    model: restcore::model::ResourceModel,
    request: &Request,
) -> Result<restcore::selector::Selection, RouteError> {
    let router = Router::new(Arc::new(model));
    let mut ctx = RoutingContext::new(RequestId::new());
    router.route(request, &mut ctx)
}

#[test]
fn server_quality_weights_steer_selection() {
    // The JSON variant is declared first but carries qs=0.5; with the client
    // preferring JSON outright, qs only breaks ties so JSON still wins.
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/doc").method(
                simple_method(Method::GET, "get_doc")
                    .produces("application/json;qs=0.5")
                    .produces("text/plain"),
            ),
        )
        .build()
        .expect("model is valid");

    let request = Request::new(Method::GET, "/doc")
        .with_header("accept", "application/json, text/plain;q=0.8");
    let selection = route(model, &request).expect("negotiation succeeds");
    assert_eq!(selection.negotiated.to_string(), "application/json");
}

#[test]
fn equal_client_quality_falls_back_to_server_weight() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/doc").method(
                simple_method(Method::GET, "get_doc")
                    .produces("application/json;qs=0.5")
                    .produces("text/plain"),
            ),
        )
        .build()
        .expect("model is valid");

    // The client is indifferent, so the text variant's full server weight
    // beats the down-weighted JSON one.
    let request = Request::new(Method::GET, "/doc").with_header("accept", "*/*");
    let selection = route(model, &request).expect("negotiation succeeds");
    assert_eq!(selection.negotiated.to_string(), "text/plain");
}

#[test]
fn missing_accept_header_matches_anything() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/doc")
                .method(simple_method(Method::GET, "get_doc").produces("application/xml")),
        )
        .build()
        .expect("model is valid");

    let request = Request::new(Method::GET, "/doc");
    let selection = route(model, &request).expect("negotiation succeeds");
    assert_eq!(selection.negotiated.to_string(), "application/xml");
}

#[test]
fn wildcard_produces_negotiates_to_json() {
    let model = ModelBuilder::new()
        .resource(ResourceBuilder::new("/doc").method(simple_method(Method::GET, "get_doc")))
        .build()
        .expect("model is valid");

    let request = Request::new(Method::GET, "/doc");
    let selection = route(model, &request).expect("negotiation succeeds");
    // Neither side named a concrete type; the default representation is JSON.
    assert_eq!(selection.negotiated.to_string(), "application/json");
}

#[test]
fn unconsumable_content_type_is_415() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/doc")
                .method(simple_method(Method::POST, "put_doc").consumes("application/json")),
        )
        .build()
        .expect("model is valid");

    let request =
        Request::new(Method::POST, "/doc").with_header("content-type", "application/xml");
    assert!(matches!(
        route(model, &request),
        Err(RouteError::UnsupportedMediaType)
    ));
}

#[test]
fn absent_content_type_is_always_consumable() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/doc")
                .method(simple_method(Method::POST, "put_doc").consumes("application/json")),
        )
        .build()
        .expect("model is valid");

    let request = Request::new(Method::POST, "/doc");
    assert!(route(model, &request).is_ok());
}

#[test]
fn no_acceptable_representation_is_406() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/doc")
                .method(simple_method(Method::GET, "get_doc").produces("application/json")),
        )
        .build()
        .expect("model is valid");

    let request = Request::new(Method::GET, "/doc").with_header("accept", "text/html");
    assert!(matches!(route(model, &request), Err(RouteError::NotAcceptable)));
}

#[test]
fn invalid_accept_entries_are_skipped() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/doc")
                .method(simple_method(Method::GET, "get_doc").produces("application/json")),
        )
        .build()
        .expect("model is valid");

    let request =
        Request::new(Method::GET, "/doc").with_header("accept", "garbage;;, application/json");
    assert!(route(model, &request).is_ok());
}

#[test]
fn head_falls_back_to_get() {
    let model = ModelBuilder::new()
        .resource(ResourceBuilder::new("/doc").method(simple_method(Method::GET, "get_doc")))
        .build()
        .expect("model is valid");

    let request = Request::new(Method::HEAD, "/doc");
    let selection = route(model, &request).expect("HEAD reuses the GET method");
    assert_eq!(selection.method.name, "get_doc");
}

#[test]
fn explicit_head_wins_over_fallback() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/doc")
                .method(simple_method(Method::GET, "get_doc"))
                .method(simple_method(Method::HEAD, "head_doc")),
        )
        .build()
        .expect("model is valid");

    let request = Request::new(Method::HEAD, "/doc");
    let selection = route(model, &request).expect("explicit HEAD method exists");
    assert_eq!(selection.method.name, "head_doc");
}

#[test]
fn more_specific_accept_entry_wins() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/doc").method(
                simple_method(Method::GET, "get_doc")
                    .produces("application/json")
                    .produces("text/plain"),
            ),
        )
        .build()
        .expect("model is valid");

    // text/plain is concrete in the accept list; application/* is not.
    let request =
        Request::new(Method::GET, "/doc").with_header("accept", "application/*, text/plain");
    let selection = route(model, &request).expect("negotiation succeeds");
    assert_eq!(selection.negotiated.to_string(), "text/plain");
}
