mod common;

use common::simple_method;
use http::Method;
use restcore::model::{MethodBuilder, ModelBuilder, ModelError, ResourceBuilder};
use restcore::template::TemplateError;

#[test]
fn duplicate_verb_and_media_triple_is_rejected() {
    let result = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/items")
                .method(simple_method(Method::GET, "first"))
                .method(simple_method(Method::GET, "second")),
        )
        .build();
    match result {
        Err(ModelError::AmbiguousMethod { path, verb }) => {
            assert_eq!(path, "/items");
            assert_eq!(verb, Method::GET);
        }
        other => panic!("expected ambiguity error, got {other:?}"),
    }
}

#[test]
fn same_verb_with_distinct_produces_is_allowed() {
    let result = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/items")
                .method(simple_method(Method::GET, "as_json").produces("application/json"))
                .method(simple_method(Method::GET, "as_text").produces("text/plain")),
        )
        .build();
    assert!(result.is_ok());
}

#[test]
fn ambiguity_spans_siblings_with_identical_templates() {
    let result = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/api")
                .child(ResourceBuilder::new("/{id}").method(simple_method(Method::GET, "a")))
                .child(ResourceBuilder::new("/{id}").method(simple_method(Method::GET, "b"))),
        )
        .build();
    assert!(matches!(result, Err(ModelError::AmbiguousMethod { .. })));
}

#[test]
fn path_binding_must_reference_a_captured_parameter() {
    let result = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/items/{id}").method(
                simple_method(Method::GET, "get_item").param(
                    restcore::params::ParamBinding::new(
                        "item_id",
                        restcore::params::ParamSource::Path,
                        restcore::params::ParamType::String,
                    ),
                ),
            ),
        )
        .build();
    match result {
        Err(ModelError::UnknownPathParameter { param, .. }) => assert_eq!(param, "item_id"),
        other => panic!("expected unknown parameter error, got {other:?}"),
    }
}

#[test]
fn path_binding_sees_ancestor_captures() {
    let result = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/users/{user_id}").child(
                ResourceBuilder::new("/posts").method(
                    simple_method(Method::GET, "list_posts").param(
                        restcore::params::ParamBinding::new(
                            "user_id",
                            restcore::params::ParamSource::Path,
                            restcore::params::ParamType::I64,
                        ),
                    ),
                ),
            ),
        )
        .build();
    assert!(result.is_ok());
}

#[test]
fn method_without_handler_is_rejected() {
    let result = ModelBuilder::new()
        .resource(ResourceBuilder::new("/items").method(MethodBuilder::new(Method::GET, "list")))
        .build();
    match result {
        Err(ModelError::MissingHandler { name, .. }) => assert_eq!(name, "list"),
        other => panic!("expected missing handler error, got {other:?}"),
    }
}

#[test]
fn invalid_template_fails_the_build() {
    let result = ModelBuilder::new()
        .resource(ResourceBuilder::new("/items/{id").method(simple_method(Method::GET, "get")))
        .build();
    assert!(matches!(
        result,
        Err(ModelError::Template(TemplateError::UnbalancedBraces { .. }))
    ));
}

#[test]
fn invalid_media_type_fails_the_build() {
    let result = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/items")
                .method(simple_method(Method::GET, "get").produces("not a media type")),
        )
        .build();
    assert!(matches!(result, Err(ModelError::InvalidMediaType(_))));
}

#[test]
fn locked_model_is_debug_printable() {
    let model = ModelBuilder::new()
        .resource(ResourceBuilder::new("/items/{id}").method(simple_method(Method::GET, "get")))
        .build()
        .expect("model is valid");
    let dump = format!("{model:?}");
    assert!(dump.contains("ResourceModel"));
    assert!(dump.contains("BinderTable"));
}

#[test]
fn allowed_verbs_are_sorted_and_deduplicated() {
    let model = ModelBuilder::new()
        .resource(
            ResourceBuilder::new("/items")
                .method(simple_method(Method::POST, "create"))
                .method(simple_method(Method::GET, "as_json").produces("application/json"))
                .method(simple_method(Method::GET, "as_text").produces("text/plain")),
        )
        .build()
        .expect("model is valid");
    assert_eq!(model.roots()[0].allowed_verbs(), vec!["GET", "POST"]);
}
