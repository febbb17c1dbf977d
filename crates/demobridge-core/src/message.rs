#![forbid(unsafe_code)]

//! JSON message protocol between the hosting page and the embedded demo.
//!
//! This module provides [`parse_inbound`], which accepts the JSON-encoded
//! `data` payload of a cross-window message and returns the corresponding
//! [`InboundCommand`]. Payloads whose `type` is absent or unrecognized return
//! `Ok(None)`; only malformed JSON is an error, and the dispatcher drops both
//! without acting on them.
//!
//! Outbound lifecycle notifications are the [`OutboundNotification`] enum,
//! serialized as `{"type": "..."}` objects.

use serde::Deserialize;

use crate::AUTO_GUIDE_ID;

/// Inbound message type requesting a tour start.
pub const START_DEMO_TOUR: &str = "START_DEMO_TOUR";
/// Inbound message type requesting a storage reset.
pub const CLEAR_DEMO_STATE: &str = "CLEAR_DEMO_STATE";

/// Which guide a tour-start command targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuideTarget {
    /// Let the SDK pick the guide matching the current page.
    Auto,
    /// A specific guide id.
    Guide(String),
}

impl GuideTarget {
    /// Build a target from a raw `guideId` field.
    ///
    /// Absent, empty, and `"auto"` values all mean [`GuideTarget::Auto`].
    #[must_use]
    pub fn from_guide_id(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") => Self::Auto,
            Some(id) if id == AUTO_GUIDE_ID => Self::Auto,
            Some(id) => Self::Guide(id.to_string()),
        }
    }

    /// The wire `guideId` value for this target.
    #[must_use]
    pub fn as_guide_id(&self) -> &str {
        match self {
            Self::Auto => AUTO_GUIDE_ID,
            Self::Guide(id) => id,
        }
    }
}

/// A recognized command received from the hosting window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    /// Clear guide state, then reload (auto) or restart the named guide.
    StartTour { target: GuideTarget },
    /// Clear guide state only.
    ClearState,
}

/// Errors from parsing an inbound message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageParseError {
    /// Malformed JSON, or a payload that is not a JSON object.
    Json(String),
}

impl core::fmt::Display for MessageParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
        }
    }
}

impl std::error::Error for MessageParseError {}

/// Internal deserialization target matching the hosting page's JSON schema.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(rename = "guideId", default)]
    guide_id: Option<String>,
}

/// Parse a JSON-encoded cross-window message payload into an
/// [`InboundCommand`].
///
/// Returns `Ok(None)` for payloads with a missing or unrecognized `type` —
/// the hosting page may broadcast messages this component does not care
/// about. Unknown extra fields are tolerated.
///
/// Returns `Err` only for payloads that are not valid JSON objects.
pub fn parse_inbound(json: &str) -> Result<Option<InboundCommand>, MessageParseError> {
    let raw: RawMessage =
        serde_json::from_str(json).map_err(|e| MessageParseError::Json(e.to_string()))?;

    match raw.kind.as_deref() {
        Some(START_DEMO_TOUR) => Ok(Some(InboundCommand::StartTour {
            target: GuideTarget::from_guide_id(raw.guide_id.as_deref()),
        })),
        Some(CLEAR_DEMO_STATE) => Ok(Some(InboundCommand::ClearState)),
        // Unknown and missing types are ignored, not errors.
        _ => Ok(None),
    }
}

/// A lifecycle notification posted to the hosting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundNotification {
    /// The demo document is ready to receive commands.
    DemoReady,
    /// The embedded SDK finished a tour.
    TourCompleted,
}

impl OutboundNotification {
    /// The wire `type` tag for this notification.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::DemoReady => "DEMO_READY",
            Self::TourCompleted => "TOUR_COMPLETED",
        }
    }

    /// Serialize as the `{"type": "..."}` wire object.
    #[must_use]
    pub fn to_json_string(self) -> String {
        format!("{{\"type\":\"{}\"}}", self.kind())
    }
}
