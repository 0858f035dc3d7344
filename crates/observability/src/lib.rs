//! Log output for the credit service.
//!
//! Events go to stdout as JSON lines unless `LOG_FORMAT=pretty`; `RUST_LOG`
//! picks the levels (`info` when unset). Request spans come from the API
//! middleware, so every line carries the request id.

pub mod tracing;

pub use self::tracing::{LOG_FORMAT_ENV, LogFormat, UnknownLogFormat, init_with};

/// Installs the global subscriber using `LOG_FORMAT` from the environment.
///
/// Later calls keep the first subscriber.
pub fn init() {
    tracing::init();
}
