use crate::invoke::HandlerError;
use crate::message::Response;
use std::sync::Arc;
use tracing::{debug, error};

type Mapper =
    Arc<dyn Fn(&(dyn std::error::Error + Send + Sync + 'static)) -> Option<Response> + Send + Sync>;

/// Ordered registry resolving handler errors to responses.
///
/// Each registered mapper is keyed by a concrete error type; lookup walks
/// the registry in registration order and the first mapper whose type
/// matches wins, so register more specific types first. Unmapped errors
/// escalate to a generic 500.
#[derive(Clone, Default)]
pub struct ExceptionMappers {
    mappers: Vec<Mapper>,
}

impl ExceptionMappers {
    #[must_use]
    pub fn new() -> Self {
        ExceptionMappers {
            mappers: Vec::new(),
        }
    }

    /// Register a mapper for the concrete error type `E`.
    pub fn register<E, F>(&mut self, map: F)
    where
        E: std::error::Error + Send + Sync + 'static,
        F: Fn(&E) -> Response + Send + Sync + 'static,
    {
        self.mappers
            .push(Arc::new(move |err| err.downcast_ref::<E>().map(&map)));
    }

    /// Resolve an error to a response; the pipeline guarantees a response is
    /// always produced, so this never fails.
    #[must_use]
    pub fn resolve(&self, error: &HandlerError) -> Response {
        for mapper in &self.mappers {
            if let Some(response) = mapper(error.as_ref()) {
                debug!(error = %error, status = response.status, "exception mapped");
                return response;
            }
        }
        error!(error = %error, "unmapped handler error, returning 500");
        Response::error(500, "internal server error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct TeapotError;

    impl fmt::Display for TeapotError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "I'm a teapot")
        }
    }

    impl std::error::Error for TeapotError {}

    #[test]
    fn mapped_error_resolves_to_registered_response() {
        let mut mappers = ExceptionMappers::new();
        mappers.register::<TeapotError, _>(|_| Response::error(418, "teapot"));
        let err: HandlerError = Box::new(TeapotError);
        assert_eq!(mappers.resolve(&err).status, 418);
    }

    #[test]
    fn unmapped_error_defaults_to_500() {
        let mappers = ExceptionMappers::new();
        let err: HandlerError = Box::new(TeapotError);
        assert_eq!(mappers.resolve(&err).status, 500);
    }
}
