//! Elapsed-time logging for the profiled evaluation path.

use std::time::Instant;

use tracing::debug;

/// Run `f`, logging how long it took at debug level.
pub fn timed<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    debug!(label, elapsed_s = start.elapsed().as_secs_f64(), "stage timing");
    result
}
