//! Environment variable based runtime configuration.
//!
//! Two knobs affect request processing:
//!
//! - `RESTCORE_STACK_SIZE` - stack size for the coroutines the suspend
//!   machinery spawns (timeout timers). Accepts decimal (`16384`) or
//!   hexadecimal (`0x4000`) values; default `0x4000` (16 KB).
//! - `RESTCORE_SUSPEND_TIMEOUT_MS` - default timeout applied to a
//!   suspension when the resource method does not specify one. Without it a
//!   forgotten resume would leak the connection indefinitely; default
//!   30000 ms.

use std::env;
use std::time::Duration;

const DEFAULT_STACK_SIZE: usize = 0x4000;
const DEFAULT_SUSPEND_TIMEOUT_MS: u64 = 30_000;

/// Runtime configuration loaded from environment variables.
///
/// Load once at startup with [`RuntimeConfig::from_env()`] and hand to the
/// pipeline builder.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stack size in bytes for suspend timer coroutines.
    pub stack_size: usize,
    /// Default suspension timeout when a handler suspends without one.
    pub suspend_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            stack_size: DEFAULT_STACK_SIZE,
            suspend_timeout: Duration::from_millis(DEFAULT_SUSPEND_TIMEOUT_MS),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for unset or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = match env::var("RESTCORE_STACK_SIZE") {
            Ok(val) => {
                if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).unwrap_or(DEFAULT_STACK_SIZE)
                } else {
                    val.parse().unwrap_or(DEFAULT_STACK_SIZE)
                }
            }
            Err(_) => DEFAULT_STACK_SIZE,
        };
        let suspend_timeout_ms = env::var("RESTCORE_SUSPEND_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SUSPEND_TIMEOUT_MS);
        RuntimeConfig {
            stack_size,
            suspend_timeout: Duration::from_millis(suspend_timeout_ms),
        }
    }
}
