//! # restcore
//!
//! **restcore** is a coroutine-friendly request routing and dispatch core for
//! annotation-style REST services: hierarchical URI templates, server-side
//! content negotiation, filter chains, exception mapping and suspendable
//! (asynchronous) responses, with no I/O of its own.
//!
//! ## Overview
//!
//! restcore sits between a container adapter (the thing that owns sockets and
//! parses HTTP) and application resource methods. The adapter turns each raw
//! exchange into a [`message::Request`], hands it to a [`pipeline::Pipeline`],
//! and writes the resulting [`message::Response`] back to the wire. Everything
//! in between is this crate's job:
//!
//! - **[`template`]** - URI template compilation (`/items/{id: \d+}`) into
//!   anchored regexes with deterministic specificity ordering
//! - **[`model`]** - the immutable resource model: resources, methods,
//!   sub-resource locators, built and validated once at startup
//! - **[`router`]** - backtracking depth-first matcher over the model,
//!   with ranked failures (404 < 405 < 415 < 406)
//! - **[`selector`]** - verb filtering and media type negotiation
//!   (`consumes`/`produces` vs `Content-Type`/`Accept`, quality-aware)
//! - **[`params`]** - typed parameter binding from path, query, header,
//!   cookie, matrix, form, entity and context sources
//! - **[`pipeline`]** - the request lifecycle: filters, routing, binding,
//!   invocation, exception mapping, response filters
//! - **[`suspend`]** - suspend/resume for asynchronous responses with
//!   exactly-once completion and timeout handling
//! - **[`media`]** - media type parsing, compatibility and the combined
//!   quality ordering used during negotiation
//! - **[`message`]** - the in-process request/response types
//! - **[`ids`]** - ULID request correlation ids
//! - **[`runtime_config`]** - environment-variable runtime knobs
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use restcore::message::{Request, Response};
//! use restcore::model::{MethodBuilder, ModelBuilder, ResourceBuilder};
//! use restcore::pipeline::{Dispatch, Pipeline};
//! use restcore::router::Router;
//! use std::sync::Arc;
//!
//! let model = ModelBuilder::new()
//!     .resource(
//!         ResourceBuilder::new("/items").child(
//!             ResourceBuilder::new("/{id}").method(
//!                 MethodBuilder::new(Method::GET, "get_item").handles(|inv| {
//!                     let id = inv.path_param("id").unwrap_or("").to_string();
//!                     Ok(Response::ok_json(serde_json::json!({ "id": id })).into())
//!                 }),
//!             ),
//!         ),
//!     )
//!     .build()
//!     .expect("model is valid");
//!
//! let pipeline = Pipeline::builder(Router::new(Arc::new(model))).build();
//! match pipeline.process(Request::new(Method::GET, "/items/42")) {
//!     Dispatch::Complete(response) => assert_eq!(response.status, 200),
//!     Dispatch::Suspended(_) => unreachable!("handler did not suspend"),
//! }
//! ```
//!
//! ## Runtime Considerations
//!
//! restcore uses the `may` coroutine runtime for its suspend timers and
//! completion channels, not tokio or async-std. Handlers run on whatever
//! thread or coroutine the container adapter dispatches them on; a suspended
//! response may be completed from any thread. Timer stack size is
//! configurable via the `RESTCORE_STACK_SIZE` environment variable and the
//! default suspension timeout via `RESTCORE_SUSPEND_TIMEOUT_MS`.

pub mod ids;
pub mod invoke;
pub mod media;
pub mod message;
pub mod model;
pub mod params;
pub mod pipeline;
pub mod router;
pub mod runtime_config;
pub mod selector;
pub mod suspend;
pub mod template;

pub use ids::RequestId;
pub use invoke::{Handler, HandlerError, Invocation, Outcome};
pub use message::{Request, Response};
pub use model::{MethodBuilder, ModelBuilder, ResourceBuilder, ResourceModel};
pub use pipeline::{Dispatch, Pipeline, PipelineBuilder};
pub use router::{RouteError, Router, RoutingContext};
pub use runtime_config::RuntimeConfig;
pub use suspend::{AsyncResponse, CompletionReceiver, SuspendError, SuspendState};
