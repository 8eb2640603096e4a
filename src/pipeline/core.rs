use super::filters::{FilterAction, RequestFilter, ResponseFilter};
use super::mappers::ExceptionMappers;
use crate::ids::RequestId;
use crate::invoke::{Invocation, Outcome, Suspender};
use crate::message::{Request, Response};
use crate::params::{self, BindInput};
use crate::router::{RouteError, Router, RoutingContext};
use crate::runtime_config::RuntimeConfig;
use crate::suspend::{AsyncResponse, CompletionFinisher, CompletionReceiver};
use crate::template::CaptureVec;
use http::Method;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Where a request currently is in its lifecycle. Advances monotonically;
/// `Aborted` is terminal from any earlier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    PreMatchFiltered,
    Routed,
    MethodSelected,
    RequestFiltered,
    Invoking,
    ResponseFiltered,
    /// The response left the pipeline; writing it is the adapter's job.
    Writing,
    Completed,
    /// A filter short-circuited the request.
    Aborted,
}

/// Mutable view handed to request filters. Pre-match filters see an empty
/// parameter set; post-match filters see the captures of the matched chain.
pub struct RequestContext {
    pub request_id: RequestId,
    /// The request; filters may rewrite the path, headers or body.
    pub request: Request,
    /// Path parameters captured during matching; empty before routing.
    pub path_params: CaptureVec,
    pub stage: Stage,
}

/// Immutable request summary for response filters and completion logging.
/// Resumed responses outlive the request context, so this owns its data.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub request_id: RequestId,
    pub method: Method,
    pub path: String,
    /// Name of the selected resource method, once routing succeeded.
    pub handler_name: Option<String>,
}

/// Result of [`Pipeline::process`].
pub enum Dispatch {
    /// The response is ready to write.
    Complete(Response),
    /// The handler suspended; the container must park the connection and
    /// block on the receiver for the eventual response.
    Suspended(CompletionReceiver),
}

struct PipelineShared {
    pre_match_filters: Vec<Arc<dyn RequestFilter>>,
    request_filters: Vec<Arc<dyn RequestFilter>>,
    response_filters: Vec<Arc<dyn ResponseFilter>>,
    mappers: ExceptionMappers,
}

/// Assembles a [`Pipeline`]. Filters are ordered by priority (lower first);
/// registration order breaks ties.
pub struct PipelineBuilder {
    router: Router,
    config: RuntimeConfig,
    pre_match_filters: Vec<Arc<dyn RequestFilter>>,
    request_filters: Vec<Arc<dyn RequestFilter>>,
    response_filters: Vec<Arc<dyn ResponseFilter>>,
    mappers: ExceptionMappers,
}

impl PipelineBuilder {
    #[must_use]
    pub fn new(router: Router) -> Self {
        PipelineBuilder {
            router,
            config: RuntimeConfig::default(),
            pre_match_filters: Vec::new(),
            request_filters: Vec::new(),
            response_filters: Vec::new(),
            mappers: ExceptionMappers::new(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a filter that runs before routing.
    #[must_use]
    pub fn pre_match_filter(mut self, filter: impl RequestFilter + 'static) -> Self {
        self.pre_match_filters.push(Arc::new(filter));
        self
    }

    /// Register a filter that runs after routing, before invocation.
    #[must_use]
    pub fn request_filter(mut self, filter: impl RequestFilter + 'static) -> Self {
        self.request_filters.push(Arc::new(filter));
        self
    }

    /// Register a filter that runs over every produced response.
    #[must_use]
    pub fn response_filter(mut self, filter: impl ResponseFilter + 'static) -> Self {
        self.response_filters.push(Arc::new(filter));
        self
    }

    /// Register an exception mapper for the concrete error type `E`.
    #[must_use]
    pub fn map_exception<E, F>(mut self, map: F) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
        F: Fn(&E) -> Response + Send + Sync + 'static,
    {
        self.mappers.register::<E, F>(map);
        self
    }

    #[must_use]
    pub fn build(mut self) -> Pipeline {
        self.pre_match_filters.sort_by_key(|f| f.priority());
        self.request_filters.sort_by_key(|f| f.priority());
        self.response_filters.sort_by_key(|f| f.priority());
        Pipeline {
            router: self.router,
            config: self.config,
            shared: Arc::new(PipelineShared {
                pre_match_filters: self.pre_match_filters,
                request_filters: self.request_filters,
                response_filters: self.response_filters,
                mappers: self.mappers,
            }),
        }
    }
}

/// Drives one request through filtering, routing, binding, invocation and
/// response filtering. Stateless across requests; clone freely, one instance
/// serves any number of concurrent requests.
#[derive(Clone)]
pub struct Pipeline {
    router: Router,
    config: RuntimeConfig,
    shared: Arc<PipelineShared>,
}

impl Pipeline {
    #[must_use]
    pub fn builder(router: Router) -> PipelineBuilder {
        PipelineBuilder::new(router)
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Process one request to a terminal dispatch. Every path out of this
    /// function yields a response (or a receiver that will); panics in
    /// filters and handlers are caught and converted to 500s.
    #[must_use]
    pub fn process(&self, request: Request) -> Dispatch {
        let start = Instant::now();
        let request_id = RequestId::from_header_or_new(request.get_header("x-request-id"));
        let mut info = RequestInfo {
            request_id,
            method: request.method.clone(),
            path: request.path.clone(),
            handler_name: None,
        };
        debug!(
            request_id = %request_id,
            method = %info.method,
            path = %info.path,
            "request received"
        );

        let mut ctx = RequestContext {
            request_id,
            request,
            path_params: CaptureVec::new(),
            stage: Stage::Received,
        };

        if let Some(aborted) =
            self.run_request_filters(&self.shared.pre_match_filters, &mut ctx)
        {
            ctx.stage = Stage::Aborted;
            return Dispatch::Complete(self.finish(&info, aborted, start));
        }
        ctx.stage = Stage::PreMatchFiltered;

        let mut routing = RoutingContext::new(request_id);
        let selection = match self.router.route(&ctx.request, &mut routing) {
            Ok(selection) => selection,
            Err(e) => {
                let response = self.route_error_response(&ctx.request, e);
                return Dispatch::Complete(self.finish(&info, response, start));
            }
        };
        ctx.stage = Stage::Routed;
        ctx.path_params = routing.path_params.clone();
        info.handler_name = Some(selection.method.name.clone());
        ctx.stage = Stage::MethodSelected;

        if let Some(aborted) = self.run_request_filters(&self.shared.request_filters, &mut ctx)
        {
            ctx.stage = Stage::Aborted;
            return Dispatch::Complete(self.finish(&info, aborted, start));
        }
        ctx.stage = Stage::RequestFiltered;

        let input = BindInput {
            request: &ctx.request,
            path_params: &routing.path_params,
            matrix_params: &routing.matrix_params,
            request_id,
        };
        let args = match params::bind(
            &selection.method.bindings,
            self.router.model().binder(),
            &input,
        ) {
            Ok(args) => args,
            Err(e) => {
                debug!(request_id = %request_id, error = %e, "parameter binding failed");
                let response = Response::error(400, &e.to_string());
                return Dispatch::Complete(self.finish(&info, response, start));
            }
        };

        ctx.stage = Stage::Invoking;
        let finisher = self.completion_finisher(info.clone(), start);
        let default_timeout = self.config.suspend_timeout;
        let stack_size = self.config.stack_size;
        let suspender: Suspender = Box::new(move |timeout| {
            AsyncResponse::create(finisher, Some(timeout.unwrap_or(default_timeout)), stack_size)
        });
        let mut invocation = Invocation {
            request_id,
            method: ctx.request.method.clone(),
            path: ctx.request.path.clone(),
            args,
            path_params: routing.path_params.clone(),
            headers: ctx.request.headers.clone(),
            body: ctx.request.body.clone(),
            negotiated: selection.negotiated.clone(),
            suspender: Some(suspender),
            completion: None,
        };

        let handler = Arc::clone(&selection.method.handler);
        let outcome =
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&mut invocation))) {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!(
                        request_id = %request_id,
                        handler_name = %selection.method.name,
                        "handler panicked"
                    );
                    let response = Response::error(500, "internal server error");
                    return Dispatch::Complete(self.finish(&info, response, start));
                }
            };

        match outcome {
            Ok(Outcome::Response(mut response)) => {
                if response.get_header("content-type").is_none() && response.status != 204 {
                    response.set_header("content-type", selection.negotiated.to_string());
                }
                Dispatch::Complete(self.finish(&info, response, start))
            }
            Ok(Outcome::Suspended) => match invocation.completion.take() {
                Some(receiver) => {
                    debug!(
                        request_id = %request_id,
                        handler_name = %selection.method.name,
                        "request suspended"
                    );
                    Dispatch::Suspended(receiver)
                }
                None => {
                    error!(
                        request_id = %request_id,
                        handler_name = %selection.method.name,
                        "handler reported suspension without suspending"
                    );
                    let response = Response::error(500, "internal server error");
                    Dispatch::Complete(self.finish(&info, response, start))
                }
            },
            Err(e) => {
                let response = self.shared.mappers.resolve(&e);
                Dispatch::Complete(self.finish(&info, response, start))
            }
        }
    }

    /// Run one ordered filter chain; `Some` carries the aborting response.
    fn run_request_filters(
        &self,
        filters: &[Arc<dyn RequestFilter>],
        ctx: &mut RequestContext,
    ) -> Option<Response> {
        for filter in filters {
            match panic::catch_unwind(AssertUnwindSafe(|| filter.filter(ctx))) {
                Ok(FilterAction::Continue) => {}
                Ok(FilterAction::Abort(response)) => {
                    debug!(request_id = %ctx.request_id, status = response.status, "filter aborted request");
                    return Some(response);
                }
                Err(_) => {
                    error!(request_id = %ctx.request_id, "request filter panicked");
                    return Some(Response::error(500, "internal server error"));
                }
            }
        }
        None
    }

    /// Convert a routing failure into a client response. An `OPTIONS` request
    /// hitting a 405 is answered automatically; its `Allow` set also lists
    /// the implicit verbs (`OPTIONS` itself, `HEAD` via the GET fallback),
    /// while a plain 405 reports only the declared verbs.
    fn route_error_response(&self, request: &Request, error: RouteError) -> Response {
        match error {
            RouteError::NotFound => Response::error(404, "not found"),
            RouteError::MethodNotAllowed { allow } => {
                if request.method == Method::OPTIONS {
                    let mut allow = allow;
                    if allow.iter().any(|v| v == "GET") && !allow.iter().any(|v| v == "HEAD") {
                        allow.push("HEAD".to_string());
                    }
                    allow.push("OPTIONS".to_string());
                    allow.sort();
                    allow.dedup();
                    let mut response = Response::no_content();
                    response.set_header("allow", allow.join(", "));
                    response
                } else {
                    let mut response = Response::error(405, "method not allowed");
                    response.set_header("allow", allow.join(", "));
                    response
                }
            }
            RouteError::UnsupportedMediaType => Response::error(415, "unsupported media type"),
            RouteError::NotAcceptable => Response::error(406, "not acceptable"),
            RouteError::LocatorFailure(e) => self.shared.mappers.resolve(&e),
        }
    }

    /// Finishing step shared by synchronous completion and resumed
    /// responses: response filters, then the terminal access log line.
    fn finish(&self, info: &RequestInfo, response: Response, start: Instant) -> Response {
        finish_response(&self.shared, info, response, start)
    }

    /// Build the finisher a suspension carries: resumed errors go through
    /// the same mapper registry and resumed responses through the same
    /// response filters as synchronous ones.
    fn completion_finisher(&self, info: RequestInfo, start: Instant) -> CompletionFinisher {
        let shared = Arc::clone(&self.shared);
        Arc::new(move |outcome| {
            let response = match outcome {
                Ok(response) => response,
                Err(e) => shared.mappers.resolve(&e),
            };
            finish_response(&shared, &info, response, start)
        })
    }
}

fn finish_response(
    shared: &PipelineShared,
    info: &RequestInfo,
    mut response: Response,
    start: Instant,
) -> Response {
    for filter in &shared.response_filters {
        if panic::catch_unwind(AssertUnwindSafe(|| filter.filter(info, &mut response))).is_err() {
            error!(request_id = %info.request_id, "response filter panicked");
            response = Response::error(500, "internal server error");
        }
    }
    debug!(request_id = %info.request_id, stage = ?Stage::ResponseFiltered, "response filters done");
    info!(
        request_id = %info.request_id,
        method = %info.method,
        path = %info.path,
        handler_name = info.handler_name.as_deref().unwrap_or("-"),
        status = response.status,
        latency_ms = start.elapsed().as_millis() as u64,
        stage = ?Stage::Completed,
        "request completed"
    );
    response
}
