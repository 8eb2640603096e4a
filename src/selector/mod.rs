//! # Method Selector Module
//!
//! Given the resource methods living at a matched path, selects the one
//! whose verb, consumed and produced media types best satisfy the request,
//! in the fixed precedence order content negotiation requires:
//!
//! 1. verb equality (with a HEAD → GET fallback when no HEAD method exists);
//! 2. `consumes` compatibility against the request `Content-Type`
//!    (an absent body is compatible with anything); failure is a 415;
//! 3. `produces` ranking against the parsed `Accept` header, combining
//!    wildcard specificity with client `q` and server `qs` quality values;
//!    no surviving candidate is a 406;
//!
//! ties are broken by declaration order, so selection is deterministic.

mod core;

pub use core::{select, SelectError, Selection};
