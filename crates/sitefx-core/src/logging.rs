#![forbid(unsafe_code)]

//! Logging shim.
//!
//! With the `tracing` feature the engine's log macros are the `tracing`
//! macros. Without it they expand to nothing, so a page embedding the engine
//! pays no cost for diagnostics it never collects.
//!
//! Engine code always logs through `crate::debug!` and friends, never
//! through `tracing::` directly.

#[cfg(feature = "tracing")]
pub use tracing::{debug, debug_span, error, info, trace, warn};

#[cfg(not(feature = "tracing"))]
mod disabled {
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    /// Evaluates to a [`DisabledSpan`](crate::logging::DisabledSpan).
    #[macro_export]
    macro_rules! debug_span {
        ($($arg:tt)*) => {
            $crate::logging::DisabledSpan
        };
    }
}

/// What `debug_span!` yields without the `tracing` feature. Entering it
/// returns itself so `let _span = debug_span!(..).entered();` compiles
/// either way.
#[cfg(not(feature = "tracing"))]
#[derive(Debug, Clone, Copy)]
pub struct DisabledSpan;

#[cfg(not(feature = "tracing"))]
impl DisabledSpan {
    #[must_use]
    pub fn entered(self) -> Self {
        self
    }
}
