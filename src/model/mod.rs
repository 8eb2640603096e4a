//! # Resource Model Module
//!
//! The immutable tree of resources the router matches against. A
//! [`ResourceModel`] is built once at application start from programmatic
//! builders (the descriptor equivalent of `@Path`/`@GET`/`@Produces`
//! annotations in annotation-driven frameworks), validated, locked, and then
//! shared read-only across all concurrently processed requests.
//!
//! ## Building a model
//!
//! ```rust
//! use restcore::model::{MethodBuilder, ModelBuilder, ResourceBuilder};
//! use restcore::message::Response;
//! use http::Method;
//!
//! let model = ModelBuilder::new()
//!     .resource(
//!         ResourceBuilder::new("/items")
//!             .method(
//!                 MethodBuilder::new(Method::GET, "list_items")
//!                     .produces("application/json")
//!                     .handles(|_inv| Ok(Response::ok_json(serde_json::json!([])).into())),
//!             )
//!             .child(
//!                 ResourceBuilder::new("/{id}").method(
//!                     MethodBuilder::new(Method::GET, "get_item")
//!                         .handles(|_inv| Ok(Response::no_content().into())),
//!                 ),
//!             ),
//!     )
//!     .build()
//!     .unwrap();
//! assert_eq!(model.roots().len(), 1);
//! ```
//!
//! ## Validation
//!
//! `build()` fails (fatal, before the model locks) on invalid templates,
//! sibling methods that declare the same (verb, consumes, produces) triple on
//! the same effective path, path bindings that reference a parameter no
//! ancestor template captures, and methods without an invocation handle.
//!
//! ## Sub-resource locators
//!
//! A locator owns a template but no verb; when routing reaches it, its
//! factory is invoked (once per request, cached in the request's routing
//! context) to produce a transient resource subtree that routing continues
//! against. Locator results are never cached across requests because the
//! produced subtree may depend on request state.

mod builder;
mod core;

pub use builder::{MethodBuilder, ModelBuilder, ResourceBuilder};
pub use core::{
    Locator, LocatorArgs, LocatorFactory, LocatorId, ModelError, Resource, ResourceMethod,
    ResourceModel,
};
