#![allow(dead_code)]

use http::Method;
use restcore::message::Response;
use restcore::model::{MethodBuilder, ModelBuilder, ResourceBuilder, ResourceModel};
use restcore::pipeline::Pipeline;
use restcore::router::Router;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Install a test subscriber once per binary; honors `RUST_LOG`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A method builder with a trivial 204 handler, for tests that only care
/// about matching and negotiation.
pub fn simple_method(verb: Method, name: &str) -> MethodBuilder {
    MethodBuilder::new(verb, name).handles(|_inv| Ok(Response::no_content().into()))
}

/// A single-resource model rooted at `path`.
pub fn single_resource(path: &str, method: MethodBuilder) -> ResourceModel {
    init_tracing();
    ModelBuilder::new()
        .resource(ResourceBuilder::new(path).method(method))
        .build()
        .expect("test model is valid")
}

pub fn pipeline(model: ResourceModel) -> Pipeline {
    init_tracing();
    Pipeline::builder(Router::new(Arc::new(model))).build()
}
