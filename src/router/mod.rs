//! # Router Module
//!
//! Matches an inbound request path against the locked resource model and
//! hands back the selected resource method together with every path
//! parameter captured along the way.
//!
//! ## Matching algorithm
//!
//! 1. Root templates are tried most-specific first; a prefix match consumes
//!    part of the path and recursion continues into the remainder.
//! 2. An empty remainder at a node with resource methods is a candidate
//!    endpoint: the method selector runs content negotiation there.
//! 3. Nodes without a direct match delegate to sub-resource locators, whose
//!    factories run at most once per request (cached in the
//!    [`RoutingContext`]) and produce a transient subtree to keep matching
//!    against.
//! 4. **Backtracking**: when a chosen branch dead-ends in negotiation (405,
//!    415, 406), the router unwinds to the next-best sibling template before
//!    giving up. This is what makes `/items/special` win over `/items/{id}`
//!    even when both carry methods for the same verb; a plain
//!    first-match-wins router gets overloaded paths wrong.
//!
//! When every branch fails, the error reported is the most specific failure
//! seen anywhere in the walk: 406 over 415 over 405 (with the union of
//! allowed verbs) over 404.

mod core;
#[cfg(test)]
mod tests;

pub use core::{RouteError, Router, RoutingContext};
