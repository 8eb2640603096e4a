//! Handler invocation surface.
//!
//! An [`Invocation`] is the per-request view handed to a resource method:
//! bound arguments, matched path parameters, the negotiated media type and
//! the suspend hook. It is created by the pipeline for exactly one request
//! and passed by explicit reference, never through ambient state.

use crate::ids::RequestId;
use crate::media::MediaType;
use crate::message::{HeaderVec, Response};
use crate::params::BoundArgs;
use crate::suspend::{AsyncResponse, CompletionReceiver, SuspendError};
use crate::template::CaptureVec;
use http::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Error surfaced by application code during invocation; resolved through
/// the pipeline's exception-mapper registry.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// What a resource method produced.
pub enum Outcome {
    /// A response, written after response filters run.
    Response(Response),
    /// The method suspended via [`Invocation::suspend`]; completion happens
    /// later through the returned [`AsyncResponse`] handle.
    Suspended,
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        Outcome::Response(response)
    }
}

/// Invocation function bound to a resource method.
pub type Handler = Arc<dyn Fn(&mut Invocation) -> Result<Outcome, HandlerError> + Send + Sync>;

pub(crate) type Suspender =
    Box<dyn FnOnce(Option<Duration>) -> (AsyncResponse, CompletionReceiver) + Send>;

/// Per-request state passed to a resource method.
pub struct Invocation {
    /// Correlation id for this request.
    pub request_id: RequestId,
    /// HTTP method of the request.
    pub method: Method,
    /// Matched request path.
    pub path: String,
    /// Arguments bound from the method's parameter declarations, in
    /// declaration order.
    pub args: BoundArgs,
    /// Raw path parameters captured during matching (last write wins on
    /// duplicate names).
    pub path_params: CaptureVec,
    /// Request headers.
    pub headers: HeaderVec,
    /// JSON entity body, if any.
    pub body: Option<Value>,
    /// Media type selected by content negotiation; the response will be
    /// labelled with it unless the handler sets its own content type.
    pub negotiated: MediaType,
    pub(crate) suspender: Option<Suspender>,
    pub(crate) completion: Option<CompletionReceiver>,
}

impl Invocation {
    /// Look up a bound argument by name.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v)
    }

    /// Look up a raw path parameter by name (last occurrence wins).
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Suspend this request instead of returning a response.
    ///
    /// The handler must return [`Outcome::Suspended`] afterwards; the
    /// returned handle may be completed from any thread. Suspending twice is
    /// a protocol error.
    pub fn suspend(&mut self, timeout: Option<Duration>) -> Result<AsyncResponse, SuspendError> {
        let Some(suspender) = self.suspender.take() else {
            return Err(SuspendError::AlreadySuspended);
        };
        let (handle, receiver) = suspender(timeout);
        self.completion = Some(receiver);
        Ok(handle)
    }
}
