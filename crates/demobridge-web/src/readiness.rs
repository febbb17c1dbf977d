#![forbid(unsafe_code)]

//! Document readiness decision.
//!
//! The readiness notification must fire exactly once per page load: either
//! immediately (document already parsed) or deferred to `DOMContentLoaded`.
//! The decision is a pure function over `document.readyState` so it can be
//! tested natively.

/// How to deliver the one-shot readiness notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyDispatch {
    /// The document is already interactive or complete; notify now.
    NotifyNow,
    /// Still parsing; notify when `DOMContentLoaded` fires.
    DeferUntilContentLoaded,
}

/// Decide dispatch from a raw `document.readyState` value.
///
/// Only `"loading"` defers. Unknown values are treated as ready, matching
/// the browser contract that `readyState` only moves forward from
/// `"loading"`.
#[must_use]
pub fn ready_dispatch(ready_state: &str) -> ReadyDispatch {
    if ready_state == "loading" {
        ReadyDispatch::DeferUntilContentLoaded
    } else {
        ReadyDispatch::NotifyNow
    }
}
