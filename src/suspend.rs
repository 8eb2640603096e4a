//! Cooperative suspend/resume for asynchronous responses.
//!
//! A resource method may, instead of returning a response, suspend the
//! request: the pipeline hands a [`CompletionReceiver`] to the container
//! (which keeps the connection open) and an [`AsyncResponse`] handle to the
//! application. Any thread may later resume with a value, resume with an
//! error, or cancel; on timeout a registered handler may extend the
//! suspension or complete it, otherwise a default 503 is produced.
//!
//! Exactly one resume/cancel/timeout transition is honored. The guard is a
//! single atomic compare-and-set on the state byte, so completion is
//! exactly-once without any external locking; late callers get a
//! [`SuspendError`] and the already-produced response is untouched.

use crate::message::Response;
use may::sync::mpsc;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Finishing step applied to every completion before it reaches the
/// container: the pipeline supplies this to run exception mapping and
/// response filters on resumed responses exactly as on synchronous ones.
pub type CompletionFinisher = Arc<
    dyn Fn(Result<Response, Box<dyn std::error::Error + Send + Sync>>) -> Response + Send + Sync,
>;

/// Handler invoked when a suspension times out; it may extend the timeout or
/// complete the response. If it does neither, a default 503 is produced.
pub type TimeoutHandler = Arc<dyn Fn(&AsyncResponse) + Send + Sync>;

const SUSPENDED: u8 = 1;
const RESUMING: u8 = 2;
const TIMED_OUT: u8 = 3;
const CANCELLED: u8 = 4;
const COMPLETED: u8 = 5;

/// Observable lifecycle states of a suspended response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendState {
    /// Request is executing normally; no suspension handle exists yet.
    Active,
    Suspended,
    /// A completion transition won the CAS and is writing the response.
    Resuming,
    TimedOut,
    Cancelled,
    Completed,
}

/// Protocol violation on a suspended response. Logged, never fatal: by the
/// time a late transition arrives a response may already be in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendError {
    /// Resume/cancel called before the request was suspended.
    NotSuspended,
    /// A resume/cancel/timeout transition already completed this response.
    AlreadyCompleted,
    /// `suspend` called twice on the same invocation.
    AlreadySuspended,
}

impl fmt::Display for SuspendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspendError::NotSuspended => write!(f, "response is not suspended"),
            SuspendError::AlreadyCompleted => write!(f, "response was already completed"),
            SuspendError::AlreadySuspended => write!(f, "request is already suspended"),
        }
    }
}

impl std::error::Error for SuspendError {}

struct Shared {
    state: AtomicU8,
    /// Bumped by every `set_timeout`; a timer only fires if its generation
    /// is still current, so re-arming cancels stale timers.
    generation: AtomicU64,
    tx: mpsc::Sender<Response>,
    finisher: CompletionFinisher,
    timeout_handler: Mutex<Option<TimeoutHandler>>,
    timer_stack_size: usize,
}

/// Cross-thread handle used to complete a suspended response.
///
/// Clone freely; all clones share one state machine and at most one
/// completion wins.
#[derive(Clone)]
pub struct AsyncResponse {
    shared: Arc<Shared>,
}

impl fmt::Debug for AsyncResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResponse")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Container side of a suspension: blocks until the response is completed.
pub struct CompletionReceiver {
    rx: mpsc::Receiver<Response>,
}

impl CompletionReceiver {
    /// Wait for the suspended response to complete.
    ///
    /// If every `AsyncResponse` handle is dropped without completing, a 500
    /// is synthesized so the connection never leaks.
    #[must_use]
    pub fn wait(self) -> Response {
        match self.rx.recv() {
            Ok(response) => response,
            Err(_) => {
                error!("suspended response abandoned without completion");
                Response::error(500, "suspended response was abandoned")
            }
        }
    }
}

impl AsyncResponse {
    /// Create a suspended response pair. Called by the pipeline when a
    /// handler suspends; `timeout` arms the initial timer.
    #[must_use]
    pub fn create(
        finisher: CompletionFinisher,
        timeout: Option<Duration>,
        timer_stack_size: usize,
    ) -> (AsyncResponse, CompletionReceiver) {
        let (tx, rx) = mpsc::channel();
        let handle = AsyncResponse {
            shared: Arc::new(Shared {
                state: AtomicU8::new(SUSPENDED),
                generation: AtomicU64::new(0),
                tx,
                finisher,
                timeout_handler: Mutex::new(None),
                timer_stack_size,
            }),
        };
        if let Some(timeout) = timeout {
            // Errors here can only mean the state already left SUSPENDED,
            // which cannot happen before `create` returns.
            let _ = handle.set_timeout(timeout);
        }
        (handle, CompletionReceiver { rx })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SuspendState {
        match self.shared.state.load(Ordering::Acquire) {
            SUSPENDED => SuspendState::Suspended,
            RESUMING => SuspendState::Resuming,
            TIMED_OUT => SuspendState::TimedOut,
            CANCELLED => SuspendState::Cancelled,
            COMPLETED => SuspendState::Completed,
            _ => SuspendState::Active,
        }
    }

    /// Resume with a response value. Exactly one resume/cancel/timeout wins.
    pub fn resume(&self, response: Response) -> Result<(), SuspendError> {
        self.complete(Ok(response), COMPLETED)
    }

    /// Resume with an error; it is resolved through the pipeline's exception
    /// mappers like an error thrown from a synchronous handler.
    pub fn resume_err(
        &self,
        error: Box<dyn std::error::Error + Send + Sync>,
    ) -> Result<(), SuspendError> {
        self.complete(Err(error), COMPLETED)
    }

    /// Cancel the suspension with a 503. `retry_after_secs` is surfaced to
    /// the client via the `Retry-After` header.
    pub fn cancel(&self, retry_after_secs: Option<u64>) -> Result<(), SuspendError> {
        let mut response = Response::error(503, "request processing was cancelled");
        if let Some(secs) = retry_after_secs {
            response.set_header("retry-after", secs.to_string());
        }
        self.complete(Ok(response), CANCELLED)
    }

    /// Register the handler consulted when the suspension times out.
    pub fn set_timeout_handler(&self, handler: impl Fn(&AsyncResponse) + Send + Sync + 'static) {
        if let Ok(mut slot) = self.shared.timeout_handler.lock() {
            *slot = Some(Arc::new(handler));
        }
    }

    /// Arm (or re-arm) the suspension timeout. Re-arming invalidates any
    /// previously scheduled timer via the generation counter.
    pub fn set_timeout(&self, timeout: Duration) -> Result<(), SuspendError> {
        if self.shared.state.load(Ordering::Acquire) != SUSPENDED {
            return Err(self.completion_error());
        }
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let handle = self.clone();

        // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the
        // may runtime. The closure owns everything it touches (a cloned
        // handle) and is Send + 'static; completion goes through the CAS
        // guard like any other transition.
        let spawn_result = unsafe {
            may::coroutine::Builder::new()
                .stack_size(self.shared.timer_stack_size)
                .spawn(move || {
                    may::coroutine::sleep(timeout);
                    handle.on_timeout(generation);
                })
        };
        if let Err(e) = spawn_result {
            error!(error = %e, "failed to spawn suspend timeout timer");
        }
        Ok(())
    }

    fn on_timeout(&self, generation: u64) {
        if self.shared.generation.load(Ordering::Acquire) != generation {
            // A newer timer superseded this one.
            return;
        }
        if self.shared.state.load(Ordering::Acquire) != SUSPENDED {
            return;
        }
        let handler = self
            .shared
            .timeout_handler
            .lock()
            .ok()
            .and_then(|slot| slot.clone());
        if let Some(handler) = handler {
            debug!("suspend timeout reached, invoking timeout handler");
            handler(self);
            // The handler may have extended the timeout or completed the
            // response; in either case this timer is done.
            if self.shared.generation.load(Ordering::Acquire) != generation
                || self.shared.state.load(Ordering::Acquire) != SUSPENDED
            {
                return;
            }
        }
        let response = Response::error(503, "suspended request timed out");
        if let Err(e) = self.complete(Ok(response), TIMED_OUT) {
            debug!(error = %e, "timeout lost the completion race");
        }
    }

    fn complete(
        &self,
        outcome: Result<Response, Box<dyn std::error::Error + Send + Sync>>,
        final_state: u8,
    ) -> Result<(), SuspendError> {
        if self
            .shared
            .state
            .compare_exchange(SUSPENDED, RESUMING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let err = self.completion_error();
            warn!(error = %err, "rejected late suspend transition");
            return Err(err);
        }
        let response = (self.shared.finisher)(outcome);
        // Final state must be visible before the response is delivered, so a
        // caller returning from `wait()` never observes `Resuming`.
        self.shared.state.store(final_state, Ordering::Release);
        if self.shared.tx.send(response).is_err() {
            warn!("completion receiver dropped before response was delivered");
        }
        Ok(())
    }

    fn completion_error(&self) -> SuspendError {
        match self.shared.state.load(Ordering::Acquire) {
            RESUMING | TIMED_OUT | CANCELLED | COMPLETED => SuspendError::AlreadyCompleted,
            _ => SuspendError::NotSuspended,
        }
    }
}
