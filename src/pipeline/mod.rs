//! # Request Processing Pipeline
//!
//! Drives one request through its lifecycle: pre-match filters, routing,
//! post-match filters, parameter binding, handler invocation, exception
//! mapping and response filters.
//!
//! ## Lifecycle
//!
//! [`Pipeline::process`] consumes a [`Request`](crate::message::Request) and
//! always yields a [`Dispatch`]: either a finished response, or a
//! [`CompletionReceiver`](crate::suspend::CompletionReceiver) when the
//! handler suspended. Errors never escape as panics; handler and filter
//! panics are caught and answered with a 500, handler errors are resolved
//! through the [`ExceptionMappers`] registry, and routing failures map to
//! their HTTP statuses (404, 405 with `Allow`, 415, 406).
//!
//! Resumed (asynchronous) responses pass through the same exception mapping
//! and response filters as synchronous ones before reaching the container.

mod core;
mod filters;
mod mappers;

pub use core::{Dispatch, Pipeline, PipelineBuilder, RequestContext, RequestInfo, Stage};
pub use filters::{FilterAction, RequestFilter, ResponseFilter, DEFAULT_PRIORITY};
pub use mappers::ExceptionMappers;
