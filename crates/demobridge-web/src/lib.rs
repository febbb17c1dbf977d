#![forbid(unsafe_code)]

//! `demobridge-web` binds the portable bridge controller from
//! `demobridge-core` to a real browser document.
//!
//! The JS-facing entry point is [`init_demo_integration`], exported as
//! `initDemoIntegration`. It wires the document per the integration
//! lifecycle: clear guide storage on load, listen for parent commands,
//! announce readiness, and forward tour-completion events. It returns a
//! [`DemoIntegration`] handle exposing `clearState`, `triggerTour`, and
//! `notifyParentReady` for manual invocation — the embedding page decides
//! where (if anywhere) to stash it.
//!
//! Only the readiness decision logic compiles on native targets; the host
//! adapter and exports are `wasm32`-only.

pub mod readiness;

#[cfg(target_arch = "wasm32")]
mod host;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{DemoIntegration, init_demo_integration};
