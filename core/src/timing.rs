//! Lightweight pass timing.
//!
//! A guard is created on entry to an expensive pass and logs the elapsed
//! wall time at `trace` level when it is dropped, regardless of which
//! `return` path was taken. There is no aggregation across a whole run;
//! this is a debugging aid for a single invocation, not a profiler.

use std::time::Instant;

/// RAII guard returned by [`scope`]; logs elapsed time on drop.
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        log::trace!("{} took {:?}", self.name, self.start.elapsed());
    }
}

/// Start timing a named pass. Drop the returned guard (or let it go out of
/// scope) to log the elapsed time.
pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}
