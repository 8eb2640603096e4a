//! # URI Template Module
//!
//! Parses path template strings (e.g. `/items/{id}` or `/files/{path: .+}`)
//! into matchable patterns with named capture groups and a deterministic
//! specificity order.
//!
//! ## Overview
//!
//! Templates are compiled once at model-build time:
//!
//! 1. **Compilation**: the template string is translated into an anchored
//!    regex. `{name}` captures one or more non-`/` characters; `{name: regex}`
//!    embeds a custom regex, which may itself span `/` (this is what enables
//!    sub-resource locator catch-alls).
//!
//! 2. **Matching**: [`UriTemplate::match_prefix`] matches from the left and
//!    returns the captured parameters together with the unconsumed remainder
//!    of the path, which the router hands down the matching chain.
//!
//! ## Ordering
//!
//! Templates order by specificity: more literal characters first, then more
//! capture groups, then more groups with explicit regexes, with the raw
//! template string as the final lexical tie-break. Sorting a set of templates
//! therefore produces the same result regardless of registration order.
//!
//! ## Example
//!
//! ```rust
//! use restcore::template::UriTemplate;
//!
//! let tpl = UriTemplate::compile("/items/{id: \\d+}").unwrap();
//! let m = tpl.match_prefix("/items/42/history").unwrap();
//! assert_eq!(m.get("id"), Some("42"));
//! assert_eq!(m.remainder, "/history");
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use core::{CaptureVec, TemplateError, TemplateMatch, UriTemplate, MAX_INLINE_PARAMS};
