//! # Message Module
//!
//! The in-process request/response abstraction handed across the container
//! adapter boundary. The dispatch core never touches sockets: a container
//! adapter parses the raw HTTP exchange into a [`Request`], runs it through
//! the pipeline, and writes the resulting [`Response`] (status, headers,
//! JSON body) back to the wire.

mod request;
mod response;

pub use request::{Request, HeaderVec, MAX_INLINE_HEADERS};
pub use response::Response;
