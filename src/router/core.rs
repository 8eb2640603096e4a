use crate::ids::RequestId;
use crate::invoke::HandlerError;
use crate::message::Request;
use crate::model::{Locator, LocatorArgs, LocatorId, Resource, ResourceModel};
use crate::params;
use crate::selector::{self, SelectError, Selection};
use crate::template::{CaptureVec, TemplateMatch};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Routing failure for one request.
///
/// `NotFound` through `NotAcceptable` are ranked: when several branches of
/// the matching tree fail differently, the most specific failure wins, so a
/// path that matched but refused the verb reports 405 rather than 404.
#[derive(Debug)]
pub enum RouteError {
    /// No template consumed the whole path (404).
    NotFound,
    /// A path matched but no method matches the verb (405); carries the
    /// union of allowed verbs across all matching branches, sorted.
    MethodNotAllowed { allow: Vec<String> },
    /// The request entity's media type is consumed by no method (415).
    UnsupportedMediaType,
    /// No produced representation satisfies the `Accept` header (406).
    NotAcceptable,
    /// A sub-resource locator factory failed; resolved through the
    /// exception-mapper registry like any invocation error.
    LocatorFailure(HandlerError),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::NotFound => write!(f, "no matching route"),
            RouteError::MethodNotAllowed { allow } => {
                write!(f, "method not allowed; allowed: {}", allow.join(", "))
            }
            RouteError::UnsupportedMediaType => write!(f, "unsupported media type"),
            RouteError::NotAcceptable => write!(f, "no acceptable representation"),
            RouteError::LocatorFailure(e) => write!(f, "sub-resource locator failed: {e}"),
        }
    }
}

impl std::error::Error for RouteError {}

impl From<SelectError> for RouteError {
    fn from(e: SelectError) -> Self {
        match e {
            SelectError::MethodNotAllowed { allow } => RouteError::MethodNotAllowed { allow },
            SelectError::UnsupportedMediaType => RouteError::UnsupportedMediaType,
            SelectError::NotAcceptable => RouteError::NotAcceptable,
        }
    }
}

fn rank(error: &RouteError) -> u8 {
    match error {
        RouteError::NotFound => 0,
        RouteError::MethodNotAllowed { .. } => 1,
        RouteError::UnsupportedMediaType => 2,
        RouteError::NotAcceptable => 3,
        RouteError::LocatorFailure(_) => 4,
    }
}

/// Mutable, request-scoped routing state. Created at the start of request
/// processing, owned by that request's thread of execution, never shared.
pub struct RoutingContext {
    pub request_id: RequestId,
    /// Path parameters accumulated across the routing chain. Duplicate names
    /// resolve last-write-wins, so a sub-resource locator re-match overrides
    /// an ancestor's capture.
    pub path_params: CaptureVec,
    /// Matrix parameters split off the path before matching.
    pub matrix_params: CaptureVec,
    /// Raw templates matched along the winning chain, for introspection.
    pub matched_templates: Vec<String>,
    /// Resources matched along the winning chain.
    pub matched_resources: Vec<Arc<Resource>>,
    /// Selection made at the endpoint, populated by [`Router::route`].
    pub selected: Option<Selection>,
    /// Sub-resource locator results, cached for this request only.
    locator_cache: HashMap<LocatorId, Arc<Resource>>,
}

impl RoutingContext {
    #[must_use]
    pub fn new(request_id: RequestId) -> Self {
        RoutingContext {
            request_id,
            path_params: CaptureVec::new(),
            matrix_params: CaptureVec::new(),
            matched_templates: Vec::new(),
            matched_resources: Vec::new(),
            selected: None,
            locator_cache: HashMap::new(),
        }
    }

    /// Get a captured path parameter by name (last write wins).
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a matrix parameter by name (last write wins).
    #[must_use]
    pub fn matrix_param(&self, name: &str) -> Option<&str> {
        self.matrix_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    fn checkpoint(&self) -> (usize, usize, usize) {
        (
            self.path_params.len(),
            self.matched_templates.len(),
            self.matched_resources.len(),
        )
    }

    fn rewind(&mut self, checkpoint: (usize, usize, usize)) {
        self.path_params.truncate(checkpoint.0);
        self.matched_templates.truncate(checkpoint.1);
        self.matched_resources.truncate(checkpoint.2);
    }

    fn push_match(&mut self, resource: &Arc<Resource>, matched: &TemplateMatch) {
        for (name, value) in &matched.params {
            self.path_params.push((Arc::clone(name), value.clone()));
        }
        self.matched_templates
            .push(resource.template.raw().to_string());
        self.matched_resources.push(Arc::clone(resource));
    }
}

/// Matches requests against a locked [`ResourceModel`].
///
/// The router holds only the shared immutable model; all per-request state
/// lives in the caller's [`RoutingContext`], so one router serves any number
/// of concurrent requests without locking.
#[derive(Clone)]
pub struct Router {
    model: Arc<ResourceModel>,
}

impl Router {
    #[must_use]
    pub fn new(model: Arc<ResourceModel>) -> Self {
        Router { model }
    }

    #[must_use]
    pub fn model(&self) -> &Arc<ResourceModel> {
        &self.model
    }

    /// Route a request to exactly one resource method.
    ///
    /// On success the selection is also recorded on `ctx`; on failure the
    /// most specific error seen across all attempted branches is returned.
    pub fn route(
        &self,
        request: &Request,
        ctx: &mut RoutingContext,
    ) -> Result<Selection, RouteError> {
        debug!(
            request_id = %ctx.request_id,
            method = %request.method,
            path = %request.path,
            "route match attempt"
        );

        let (path, matrix_params) = params::split_matrix(&request.path);
        ctx.matrix_params = matrix_params;

        let mut failure: Option<RouteError> = None;
        for root in self.model.roots() {
            let Some(matched) = root.template.match_prefix(&path) else {
                continue;
            };
            let checkpoint = ctx.checkpoint();
            ctx.push_match(root, &matched);
            match self.descend(root, &matched.remainder, request, ctx, &mut failure) {
                Ok(Some(selection)) => {
                    info!(
                        request_id = %ctx.request_id,
                        method = %request.method,
                        path = %request.path,
                        handler_name = %selection.method.name,
                        matched_templates = ?ctx.matched_templates,
                        "route matched"
                    );
                    ctx.selected = Some(selection.clone());
                    return Ok(selection);
                }
                Ok(None) => ctx.rewind(checkpoint),
                Err(e) => return Err(e),
            }
        }

        let error = failure.unwrap_or(RouteError::NotFound);
        warn!(
            request_id = %ctx.request_id,
            method = %request.method,
            path = %request.path,
            error = %error,
            "no route matched"
        );
        Err(error)
    }

    /// Depth-first walk of one subtree. `Ok(None)` is a dead end (failure
    /// recorded, caller backtracks); `Err` aborts routing outright and is
    /// only produced by locator failures.
    fn descend(
        &self,
        node: &Arc<Resource>,
        remainder: &str,
        request: &Request,
        ctx: &mut RoutingContext,
        failure: &mut Option<RouteError>,
    ) -> Result<Option<Selection>, RouteError> {
        let at_end = remainder.is_empty() || remainder == "/";

        if at_end && !node.methods.is_empty() {
            match selector::select(&node.methods, request) {
                Ok(selection) => return Ok(Some(selection)),
                // Negotiation dead end: remember why and let the caller try
                // the next-best sibling.
                Err(e) => record_failure(failure, e.into()),
            }
        }

        for child in &node.children {
            let Some(matched) = child.template.match_prefix(remainder) else {
                continue;
            };
            let checkpoint = ctx.checkpoint();
            ctx.push_match(child, &matched);
            if let Some(selection) =
                self.descend(child, &matched.remainder, request, ctx, failure)?
            {
                return Ok(Some(selection));
            }
            ctx.rewind(checkpoint);
        }

        for locator in &node.locators {
            let Some(matched) = locator.template.match_prefix(remainder) else {
                continue;
            };
            let checkpoint = ctx.checkpoint();
            for (name, value) in &matched.params {
                ctx.path_params.push((Arc::clone(name), value.clone()));
            }
            ctx.matched_templates
                .push(locator.template.raw().to_string());
            let produced = self.invoke_locator(locator, request, ctx)?;
            ctx.matched_resources.push(Arc::clone(&produced));
            if let Some(selection) =
                self.descend(&produced, &matched.remainder, request, ctx, failure)?
            {
                return Ok(Some(selection));
            }
            ctx.rewind(checkpoint);
        }

        Ok(None)
    }

    /// Run a locator factory, at most once per request. The produced subtree
    /// is cached in the routing context, never across requests: the result
    /// may depend on request state.
    fn invoke_locator(
        &self,
        locator: &Locator,
        request: &Request,
        ctx: &mut RoutingContext,
    ) -> Result<Arc<Resource>, RouteError> {
        if let Some(cached) = ctx.locator_cache.get(&locator.id) {
            return Ok(Arc::clone(cached));
        }
        debug!(
            request_id = %ctx.request_id,
            locator = %locator.name,
            "invoking sub-resource locator"
        );
        let produced = {
            let args = LocatorArgs {
                request,
                path_params: &ctx.path_params,
                request_id: ctx.request_id,
            };
            (locator.factory)(&args).map_err(RouteError::LocatorFailure)?
        };
        let produced = Arc::new(produced);
        ctx.locator_cache
            .insert(locator.id, Arc::clone(&produced));
        Ok(produced)
    }
}

fn record_failure(slot: &mut Option<RouteError>, new: RouteError) {
    match slot {
        None => *slot = Some(new),
        Some(RouteError::MethodNotAllowed { allow }) => {
            // Merge allow sets from sibling branches so the 405 is complete.
            if let RouteError::MethodNotAllowed { allow: more } = new {
                allow.extend(more);
                allow.sort();
                allow.dedup();
            } else if rank(&new) > 1 {
                *slot = Some(new);
            }
        }
        Some(current) => {
            if rank(&new) > rank(current) {
                *slot = Some(new);
            }
        }
    }
}
