use crate::ids::RequestId;
use crate::invoke::{Handler, HandlerError};
use crate::media::{MediaType, MediaTypeError};
use crate::message::Request;
use crate::params::{BinderTable, ParamBinding};
use crate::template::{CaptureVec, TemplateError, UriTemplate};
use http::Method;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Error raised while building a resource model. All variants are fatal:
/// the model never locks and application startup aborts.
#[derive(Debug)]
pub enum ModelError {
    Template(TemplateError),
    InvalidMediaType(MediaTypeError),
    /// Two sibling methods declare the same (verb, consumes, produces)
    /// triple on the same effective path.
    AmbiguousMethod { path: String, verb: Method },
    /// A path binding references a parameter no ancestor template captures.
    UnknownPathParameter {
        path: String,
        method: String,
        param: String,
    },
    /// A method was declared without an invocation handle.
    MissingHandler { path: String, name: String },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Template(e) => write!(f, "{e}"),
            ModelError::InvalidMediaType(e) => write!(f, "{e}"),
            ModelError::AmbiguousMethod { path, verb } => {
                write!(
                    f,
                    "ambiguous resource methods: duplicate {verb} declaration on '{path}'"
                )
            }
            ModelError::UnknownPathParameter {
                path,
                method,
                param,
            } => {
                write!(
                    f,
                    "method '{method}' on '{path}' binds path parameter '{param}' \
                     which no ancestor template captures"
                )
            }
            ModelError::MissingHandler { path, name } => {
                write!(f, "method '{name}' on '{path}' has no invocation handle")
            }
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Template(e) => Some(e),
            ModelError::InvalidMediaType(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TemplateError> for ModelError {
    fn from(e: TemplateError) -> Self {
        ModelError::Template(e)
    }
}

impl From<MediaTypeError> for ModelError {
    fn from(e: MediaTypeError) -> Self {
        ModelError::InvalidMediaType(e)
    }
}

/// A resource method: one HTTP verb bound to declared media types, parameter
/// bindings and an invocation handle. Owned exclusively by its resource.
#[derive(Clone)]
pub struct ResourceMethod {
    pub verb: Method,
    /// Handler name used in logs and diagnostics.
    pub name: String,
    /// Consumed media types, ordered; defaults to `*/*`.
    pub consumes: Vec<MediaType>,
    /// Produced media types, ordered; defaults to `*/*`.
    pub produces: Vec<MediaType>,
    /// Parameter bindings in declaration order.
    pub bindings: Vec<ParamBinding>,
    pub handler: Handler,
}

impl fmt::Debug for ResourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceMethod")
            .field("verb", &self.verb)
            .field("name", &self.name)
            .field("consumes", &self.consumes)
            .field("produces", &self.produces)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

/// Identity of a locator instance, used as the per-request cache key for its
/// produced subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocatorId(u64);

static NEXT_LOCATOR_ID: AtomicU64 = AtomicU64::new(1);

impl LocatorId {
    pub(crate) fn next() -> Self {
        LocatorId(NEXT_LOCATOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Request state available to a locator factory.
pub struct LocatorArgs<'a> {
    pub request: &'a Request,
    /// Path parameters captured so far, including those of the locator's own
    /// template.
    pub path_params: &'a CaptureVec,
    pub request_id: RequestId,
}

/// Factory producing the transient resource subtree a locator delegates to.
pub type LocatorFactory =
    Arc<dyn for<'a> Fn(&LocatorArgs<'a>) -> Result<Resource, HandlerError> + Send + Sync>;

/// A sub-resource locator: consumes a path prefix and delegates the rest of
/// the matching to a lazily produced resource.
#[derive(Clone)]
pub struct Locator {
    pub id: LocatorId,
    pub name: String,
    pub template: UriTemplate,
    pub factory: LocatorFactory,
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// One node of the resource tree: a path template plus resource methods,
/// child resources (sub-resource methods) and sub-resource locators.
/// Immutable once the model is locked.
#[derive(Debug, Clone)]
pub struct Resource {
    pub template: UriTemplate,
    pub methods: Vec<Arc<ResourceMethod>>,
    /// Child resources, sorted by template specificity.
    pub children: Vec<Arc<Resource>>,
    /// Locators, sorted by template specificity.
    pub locators: Vec<Arc<Locator>>,
}

impl Resource {
    /// Distinct verbs declared on this node, sorted for a stable `Allow`
    /// header.
    #[must_use]
    pub fn allowed_verbs(&self) -> Vec<String> {
        let mut verbs: Vec<String> = self
            .methods
            .iter()
            .map(|m| m.verb.as_str().to_string())
            .collect();
        verbs.sort();
        verbs.dedup();
        verbs
    }
}

/// The locked resource model: roots sorted by template specificity, shared
/// read-only across all requests. The only process-wide routing state.
#[derive(Debug)]
pub struct ResourceModel {
    roots: Vec<Arc<Resource>>,
    binder: BinderTable,
}

impl ResourceModel {
    pub(crate) fn new(roots: Vec<Arc<Resource>>, binder: BinderTable) -> Self {
        ResourceModel { roots, binder }
    }

    #[must_use]
    pub fn roots(&self) -> &[Arc<Resource>] {
        &self.roots
    }

    #[must_use]
    pub fn binder(&self) -> &BinderTable {
        &self.binder
    }

    /// Print every routable endpoint to stdout. Useful when verifying what a
    /// model resolved to.
    pub fn dump(&self) {
        fn walk(resource: &Resource, prefix: &str) {
            let base = if resource.template.raw() == "/" {
                prefix.to_string()
            } else {
                format!("{prefix}{}", resource.template.raw())
            };
            for method in &resource.methods {
                let path = if base.is_empty() { "/" } else { base.as_str() };
                println!("[route] {} {} -> {}", method.verb, path, method.name);
            }
            for locator in &resource.locators {
                println!("[locator] {base}{} -> {}", locator.template.raw(), locator.name);
            }
            for child in &resource.children {
                walk(child, &base);
            }
        }
        for root in &self.roots {
            walk(root, "");
        }
    }
}
