#![forbid(unsafe_code)]

//! `demobridge-core` provides the portable logic for the demo-page ⇄
//! parent-window bridge.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment (a browser document, or a
//!   stub in tests) supplies storage, navigation, and parent messaging through
//!   the [`DemoHost`] trait. Nothing here touches JS types.
//! - **Silent degradation**: every failure path (storage inaccessible, SDK
//!   missing, SDK capability missing, malformed message) is a logged no-op.
//!   Nothing is fatal, retried, or surfaced to the end user.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! The `demobridge-web` crate wraps this with a stable JS API.

pub mod bridge;
pub mod message;

pub use bridge::{BridgeConfig, DemoBridge, DemoHost, GuideSdk, HostError, OriginPolicy};
pub use message::{
    GuideTarget, InboundCommand, MessageParseError, OutboundNotification, parse_inbound,
};

/// Storage keys written by the embedded guide SDK and deleted by the bridge.
///
/// In order: interaction/frequency state, active-guide state, anonymous id.
/// The bridge only ever removes these; it never reads or writes their values.
pub const GUIDE_STORAGE_KEYS: [&str; 3] =
    ["escourtly_state", "escourtly_active_guide", "escourtly_aid"];

/// `guideId` sentinel meaning "let the SDK pick the guide for this page".
pub const AUTO_GUIDE_ID: &str = "auto";

/// Same-window custom event the guide SDK dispatches when a tour finishes.
pub const TOUR_COMPLETED_EVENT: &str = "escourtly:tour:completed";

/// Global property name under which the guide SDK exposes its handle.
pub const SDK_GLOBAL: &str = "EscourtlySDK";
