use super::core::{RequestContext, RequestInfo};
use crate::message::Response;

/// Default filter priority; lower values run earlier.
pub const DEFAULT_PRIORITY: i32 = 5000;

/// What a request filter decided.
pub enum FilterAction {
    /// Proceed to the next filter / stage.
    Continue,
    /// Short-circuit the pipeline with this response (e.g. an auth
    /// rejection). Response filters still run on the aborted response.
    Abort(Response),
}

/// A filter running before routing (pre-match) or before invocation
/// (post-match), in priority order. Filters may mutate the request, abort
/// the chain, or pass through unchanged.
pub trait RequestFilter: Send + Sync {
    /// Priority of this filter; lower runs earlier. Registration order
    /// breaks ties.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn filter(&self, ctx: &mut RequestContext) -> FilterAction;
}

/// A filter running over every produced response, including aborted, error
/// and resumed (asynchronous) responses.
pub trait ResponseFilter: Send + Sync {
    /// Priority of this filter; lower runs earlier. Registration order
    /// breaks ties.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn filter(&self, info: &RequestInfo, response: &mut Response);
}
