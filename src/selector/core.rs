use crate::media::{CombinedMediaType, MediaType};
use crate::message::Request;
use crate::model::ResourceMethod;
use http::Method;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Negotiation failure for a set of candidate methods at one matched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// No candidate declares the request verb; carries the allowed verb set
    /// (sorted, deduplicated) for the `Allow` header.
    MethodNotAllowed { allow: Vec<String> },
    /// Candidates exist for the verb but none consumes the request's
    /// `Content-Type` (415).
    UnsupportedMediaType,
    /// No produced type is acceptable to the client (406).
    NotAcceptable,
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectError::MethodNotAllowed { allow } => {
                write!(f, "method not allowed; allowed: {}", allow.join(", "))
            }
            SelectError::UnsupportedMediaType => write!(f, "unsupported media type"),
            SelectError::NotAcceptable => write!(f, "no acceptable representation"),
        }
    }
}

impl std::error::Error for SelectError {}

/// The outcome of a successful selection.
#[derive(Debug, Clone)]
pub struct Selection {
    pub method: Arc<ResourceMethod>,
    /// Concrete media type the response will be labelled with unless the
    /// handler overrides it.
    pub negotiated: MediaType,
}

/// Select the single best method among `candidates` for this request.
pub fn select(
    candidates: &[Arc<ResourceMethod>],
    request: &Request,
) -> Result<Selection, SelectError> {
    // Step 1: verb equality, with HEAD falling back to GET when no explicit
    // HEAD method is declared.
    let mut by_verb: Vec<&Arc<ResourceMethod>> = candidates
        .iter()
        .filter(|m| m.verb == request.method)
        .collect();
    if by_verb.is_empty() && request.method == Method::HEAD {
        by_verb = candidates.iter().filter(|m| m.verb == Method::GET).collect();
    }
    if by_verb.is_empty() {
        let mut allow: Vec<String> = candidates
            .iter()
            .map(|m| m.verb.as_str().to_string())
            .collect();
        allow.sort();
        allow.dedup();
        return Err(SelectError::MethodNotAllowed { allow });
    }

    // Step 2: consumes filter. An absent Content-Type is compatible with
    // every candidate (no entity to read).
    let content_type = request.content_type();
    let consumable: Vec<&Arc<ResourceMethod>> = by_verb
        .into_iter()
        .filter(|m| match &content_type {
            Some(ct) => m.consumes.iter().any(|c| c.is_compatible(ct)),
            None => true,
        })
        .collect();
    if consumable.is_empty() {
        return Err(SelectError::UnsupportedMediaType);
    }

    // Step 3: produces ranking. For every (accept entry, produced type) pair
    // compute the combined score; the candidate with the best combination
    // wins, earlier declaration winning ties.
    let accepted = request.accepted_types();
    let mut best: Option<(&Arc<ResourceMethod>, CombinedMediaType)> = None;
    for method in consumable {
        let Some(combined) = best_combination(&accepted, &method.produces) else {
            continue;
        };
        let better = match &best {
            Some((_, current)) => combined.cmp_preference(current) == Ordering::Greater,
            None => true,
        };
        if better {
            best = Some((method, combined));
        }
    }

    let Some((method, combined)) = best else {
        return Err(SelectError::NotAcceptable);
    };

    let negotiated = combined.concrete_type();
    debug!(
        handler_name = %method.name,
        verb = %method.verb,
        negotiated = %negotiated,
        "resource method selected"
    );
    Ok(Selection {
        method: Arc::clone(method),
        negotiated,
    })
}

/// Best combined score for one candidate across all accept/produces pairs,
/// or `None` when nothing is compatible.
fn best_combination(
    accepted: &[MediaType],
    produces: &[MediaType],
) -> Option<CombinedMediaType> {
    let mut best: Option<CombinedMediaType> = None;
    for client in accepted {
        for server in produces {
            let Some(combined) = CombinedMediaType::create(client, server) else {
                continue;
            };
            let better = match &best {
                Some(current) => combined.cmp_preference(current) == Ordering::Greater,
                None => true,
            };
            if better {
                best = Some(combined);
            }
        }
    }
    best
}
