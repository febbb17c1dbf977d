#![forbid(unsafe_code)]

//! Host-driven bridge controller.
//!
//! [`DemoBridge`] owns the behavior: reset guide storage, dispatch inbound
//! cross-window commands, and post lifecycle notifications to the hosting
//! window. It is generic over [`DemoHost`], the capability surface the
//! embedding environment must provide. The real host lives in
//! `demobridge-web`; tests drive the bridge through a recording stub.
//!
//! Every operation is an independent, idempotent action triggered by an
//! external event; the bridge keeps no internal mode state.

use tracing::{debug, warn};

use crate::GUIDE_STORAGE_KEYS;
use crate::message::{GuideTarget, InboundCommand, OutboundNotification, parse_inbound};

/// Failure reported by a host capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Storage is unavailable or denied access (quota, security restriction).
    Storage(String),
}

impl core::fmt::Display for HostError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for HostError {}

/// Narrow capability surface of the embedded guide SDK.
///
/// Satisfied by a real SDK adapter in `demobridge-web` or a stub in tests.
pub trait GuideSdk {
    /// Whether the SDK build exposes a guide-restart entry point.
    fn supports_restart(&self) -> bool;

    /// Restart the named guide. Best effort; failures stay inside the SDK.
    fn restart_guide(&mut self, guide_id: &str);
}

/// What the embedding environment must provide to the bridge.
pub trait DemoHost {
    /// Remove one storage key. The bridge never reads or writes values.
    fn remove_storage_key(&mut self, key: &str) -> Result<(), HostError>;

    /// Force a full page reload. Irreversible hand-off to navigation.
    fn reload_page(&mut self);

    /// Whether this document is framed by a distinct parent window.
    fn is_embedded(&self) -> bool;

    /// Post a notification to the parent window.
    ///
    /// Only called when [`is_embedded`](Self::is_embedded) is true.
    fn post_to_parent(&mut self, notification: OutboundNotification);

    /// The guide SDK handle, if one is reachable right now.
    fn sdk(&mut self) -> Option<&mut dyn GuideSdk>;
}

/// Which message origins the bridge will dispatch commands from.
///
/// Checked before any parsing or side effect; disallowed origins are dropped
/// silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Accept commands from any origin. Intended for local demos only.
    AllowAny,
    /// Accept commands only from these exact origins.
    AllowList(Vec<String>),
}

impl OriginPolicy {
    /// Whether `origin` may issue commands under this policy.
    #[must_use]
    pub fn allows(&self, origin: &str) -> bool {
        match self {
            Self::AllowAny => true,
            Self::AllowList(origins) => origins.iter().any(|allowed| allowed == origin),
        }
    }
}

/// Bridge construction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Origin filter applied to inbound messages.
    pub origin_policy: OriginPolicy,
    /// Storage keys deleted by [`DemoBridge::clear_state`].
    pub storage_keys: Vec<String>,
}

impl BridgeConfig {
    /// Config with the deployed SDK's storage keys and the given policy.
    #[must_use]
    pub fn new(origin_policy: OriginPolicy) -> Self {
        Self {
            origin_policy,
            storage_keys: GUIDE_STORAGE_KEYS.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    /// Override the storage key set.
    #[must_use]
    pub fn with_storage_keys(mut self, keys: Vec<String>) -> Self {
        self.storage_keys = keys;
        self
    }
}

/// The bridge controller. See the module docs.
pub struct DemoBridge<H: DemoHost> {
    host: H,
    config: BridgeConfig,
}

impl<H: DemoHost> DemoBridge<H> {
    /// Create a bridge over `host` with an explicit `config`.
    pub fn new(host: H, config: BridgeConfig) -> Self {
        Self { host, config }
    }

    /// Borrow the host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutably borrow the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Remove every configured storage key, each independently.
    ///
    /// A failure on one key is logged and does not stop the remaining keys
    /// from being attempted. Never propagates.
    pub fn clear_state(&mut self) {
        for key in &self.config.storage_keys {
            if let Err(err) = self.host.remove_storage_key(key) {
                debug!(key = %key, error = %err, "failed to clear storage key");
            }
        }
    }

    /// Clear guide state, then start a tour.
    ///
    /// State is always cleared first so the experience is fresh. If no SDK
    /// handle is reachable the trigger step is skipped. For
    /// [`GuideTarget::Auto`] the reload is the trigger mechanism: the SDK's
    /// own page-matching logic runs on the fresh load, and there is no direct
    /// start call. A named guide uses the SDK's restart entry point when the
    /// build exposes one.
    pub fn trigger_tour(&mut self, target: &GuideTarget) {
        self.clear_state();

        let Some(sdk) = self.host.sdk() else {
            warn!("guide SDK not loaded yet; skipping tour trigger");
            return;
        };

        match target {
            GuideTarget::Auto => {
                debug!("triggering automatic guide via page reload");
                self.host.reload_page();
            }
            GuideTarget::Guide(guide_id) => {
                if sdk.supports_restart() {
                    debug!(guide_id = %guide_id, "restarting guide");
                    sdk.restart_guide(guide_id);
                } else {
                    warn!(guide_id = %guide_id, "SDK restart entry point not available");
                }
            }
        }
    }

    /// Dispatch one inbound cross-window message.
    ///
    /// The origin is checked against the configured policy before the payload
    /// is even parsed. Disallowed origins, unrecognized types, and malformed
    /// payloads are all dropped without side effects.
    pub fn handle_parent_message(&mut self, origin: &str, payload: &str) {
        if !self.config.origin_policy.allows(origin) {
            debug!(origin = %origin, "dropping message from disallowed origin");
            return;
        }

        match parse_inbound(payload) {
            Ok(Some(InboundCommand::StartTour { target })) => self.trigger_tour(&target),
            Ok(Some(InboundCommand::ClearState)) => self.clear_state(),
            Ok(None) => {}
            Err(err) => debug!(error = %err, "dropping malformed parent message"),
        }
    }

    /// Tell the hosting window the demo is ready. No-op when not embedded.
    pub fn notify_parent_ready(&mut self) {
        self.notify(OutboundNotification::DemoReady);
    }

    /// Tell the hosting window a tour finished. No-op when not embedded.
    pub fn notify_tour_completed(&mut self) {
        self.notify(OutboundNotification::TourCompleted);
    }

    fn notify(&mut self, notification: OutboundNotification) {
        if !self.host.is_embedded() {
            debug!(kind = notification.kind(), "not embedded; skipping parent notification");
            return;
        }
        self.host.post_to_parent(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    struct StubSdk {
        supports_restart: bool,
        restarted: Vec<String>,
    }

    struct StubHost {
        storage: BTreeSet<String>,
        failing_keys: BTreeSet<String>,
        reloads: usize,
        posted: Vec<OutboundNotification>,
        embedded: bool,
        sdk: Option<StubSdk>,
        log: Vec<String>,
    }

    impl StubHost {
        fn new() -> Self {
            Self {
                storage: BTreeSet::new(),
                failing_keys: BTreeSet::new(),
                reloads: 0,
                posted: Vec::new(),
                embedded: true,
                sdk: None,
                log: Vec::new(),
            }
        }

        fn with_guide_keys(mut self) -> Self {
            for key in GUIDE_STORAGE_KEYS {
                self.storage.insert(key.to_string());
            }
            self
        }

        fn with_sdk(mut self, supports_restart: bool) -> Self {
            self.sdk = Some(StubSdk {
                supports_restart,
                restarted: Vec::new(),
            });
            self
        }

        fn guide_keys_present(&self) -> Vec<&str> {
            GUIDE_STORAGE_KEYS
                .iter()
                .copied()
                .filter(|key| self.storage.contains(*key))
                .collect()
        }
    }

    impl GuideSdk for StubSdk {
        fn supports_restart(&self) -> bool {
            self.supports_restart
        }

        fn restart_guide(&mut self, guide_id: &str) {
            self.restarted.push(guide_id.to_string());
        }
    }

    impl DemoHost for StubHost {
        fn remove_storage_key(&mut self, key: &str) -> Result<(), HostError> {
            self.log.push(format!("remove:{key}"));
            if self.failing_keys.contains(key) {
                return Err(HostError::Storage("access denied".to_string()));
            }
            self.storage.remove(key);
            Ok(())
        }

        fn reload_page(&mut self) {
            self.log.push("reload".to_string());
            self.reloads += 1;
        }

        fn is_embedded(&self) -> bool {
            self.embedded
        }

        fn post_to_parent(&mut self, notification: OutboundNotification) {
            self.posted.push(notification);
        }

        fn sdk(&mut self) -> Option<&mut dyn GuideSdk> {
            self.sdk.as_mut().map(|sdk| sdk as &mut dyn GuideSdk)
        }
    }

    fn bridge(host: StubHost) -> DemoBridge<StubHost> {
        DemoBridge::new(host, BridgeConfig::new(OriginPolicy::AllowAny))
    }

    #[test]
    fn clear_state_removes_all_guide_keys() {
        let mut host = StubHost::new().with_guide_keys();
        host.storage.insert("unrelated_key".to_string());
        let mut bridge = bridge(host);

        bridge.clear_state();

        assert_eq!(bridge.host().guide_keys_present(), Vec::<&str>::new());
        assert!(bridge.host().storage.contains("unrelated_key"));
    }

    #[test]
    fn clear_state_with_absent_keys_is_a_no_op() {
        let mut bridge = bridge(StubHost::new());
        bridge.clear_state();
        assert!(bridge.host().storage.is_empty());
    }

    #[test]
    fn clear_state_continues_past_a_failing_key() {
        let mut host = StubHost::new().with_guide_keys();
        host.failing_keys.insert(GUIDE_STORAGE_KEYS[0].to_string());
        let mut bridge = bridge(host);

        bridge.clear_state();

        // The failing key stays; the remaining keys were still attempted.
        assert_eq!(bridge.host().guide_keys_present(), vec![GUIDE_STORAGE_KEYS[0]]);
    }

    #[test]
    fn clear_state_never_raises_even_if_every_key_fails() {
        let mut host = StubHost::new().with_guide_keys();
        for key in GUIDE_STORAGE_KEYS {
            host.failing_keys.insert(key.to_string());
        }
        let mut bridge = bridge(host);

        bridge.clear_state();

        assert_eq!(bridge.host().guide_keys_present().len(), 3);
    }

    #[test]
    fn clear_command_clears_without_navigation_or_sdk_call() {
        let host = StubHost::new().with_guide_keys().with_sdk(true);
        let mut bridge = bridge(host);

        bridge.handle_parent_message("https://landing.test", r#"{"type":"CLEAR_DEMO_STATE"}"#);

        let host = bridge.host();
        assert!(host.guide_keys_present().is_empty());
        assert_eq!(host.reloads, 0);
        assert!(host.sdk.as_ref().unwrap().restarted.is_empty());
    }

    #[test]
    fn start_tour_without_guide_id_clears_then_reloads() {
        let host = StubHost::new().with_guide_keys().with_sdk(true);
        let mut bridge = bridge(host);

        bridge.handle_parent_message("https://landing.test", r#"{"type":"START_DEMO_TOUR"}"#);

        let host = bridge.host();
        assert!(host.guide_keys_present().is_empty());
        assert_eq!(host.reloads, 1);
        // The reload is the trigger; no direct SDK start call.
        assert!(host.sdk.as_ref().unwrap().restarted.is_empty());
    }

    #[test]
    fn state_is_cleared_strictly_before_reload() {
        // The reload path depends on storage being empty when the page
        // re-initializes.
        let host = StubHost::new().with_guide_keys().with_sdk(true);
        let mut bridge = bridge(host);

        bridge.trigger_tour(&GuideTarget::Auto);

        let log = &bridge.host().log;
        let reload_at = log.iter().position(|entry| entry == "reload").unwrap();
        assert_eq!(reload_at, log.len() - 1);
        for key in GUIDE_STORAGE_KEYS {
            let remove_at = log.iter().position(|e| e == &format!("remove:{key}")).unwrap();
            assert!(remove_at < reload_at);
        }
    }

    #[test]
    fn start_tour_named_restarts_exactly_once_without_reload() {
        let host = StubHost::new().with_guide_keys().with_sdk(true);
        let mut bridge = bridge(host);

        bridge.handle_parent_message(
            "https://landing.test",
            r#"{"type":"START_DEMO_TOUR","guideId":"g1"}"#,
        );

        let host = bridge.host();
        assert!(host.guide_keys_present().is_empty());
        assert_eq!(host.reloads, 0);
        assert_eq!(host.sdk.as_ref().unwrap().restarted, vec!["g1".to_string()]);
    }

    #[test]
    fn start_tour_without_sdk_still_clears_but_does_nothing_else() {
        let host = StubHost::new().with_guide_keys();
        let mut bridge = bridge(host);

        bridge.handle_parent_message(
            "https://landing.test",
            r#"{"type":"START_DEMO_TOUR","guideId":"g1"}"#,
        );

        let host = bridge.host();
        assert!(host.guide_keys_present().is_empty());
        assert_eq!(host.reloads, 0);
    }

    #[test]
    fn start_tour_auto_without_sdk_does_not_reload() {
        let host = StubHost::new().with_guide_keys();
        let mut bridge = bridge(host);

        bridge.trigger_tour(&GuideTarget::Auto);

        let host = bridge.host();
        assert!(host.guide_keys_present().is_empty());
        assert_eq!(host.reloads, 0);
    }

    #[test]
    fn start_tour_named_with_sdk_lacking_restart_is_silent() {
        let host = StubHost::new().with_guide_keys().with_sdk(false);
        let mut bridge = bridge(host);

        bridge.trigger_tour(&GuideTarget::Guide("g1".to_string()));

        let host = bridge.host();
        assert!(host.guide_keys_present().is_empty());
        assert_eq!(host.reloads, 0);
        assert!(host.sdk.as_ref().unwrap().restarted.is_empty());
    }

    #[test]
    fn unknown_message_type_has_no_effect() {
        let host = StubHost::new().with_guide_keys().with_sdk(true);
        let mut bridge = bridge(host);

        bridge.handle_parent_message("https://landing.test", r#"{"type":"PING"}"#);

        let host = bridge.host();
        assert_eq!(host.guide_keys_present().len(), 3);
        assert_eq!(host.reloads, 0);
        assert!(host.posted.is_empty());
        assert!(host.sdk.as_ref().unwrap().restarted.is_empty());
    }

    #[test]
    fn malformed_payload_has_no_effect() {
        let host = StubHost::new().with_guide_keys();
        let mut bridge = bridge(host);

        bridge.handle_parent_message("https://landing.test", "not json");

        assert_eq!(bridge.host().guide_keys_present().len(), 3);
    }

    #[test]
    fn allow_list_blocks_unlisted_origin() {
        let host = StubHost::new().with_guide_keys().with_sdk(true);
        let config = BridgeConfig::new(OriginPolicy::AllowList(vec![
            "https://landing.test".to_string(),
        ]));
        let mut bridge = DemoBridge::new(host, config);

        bridge.handle_parent_message("https://evil.test", r#"{"type":"START_DEMO_TOUR"}"#);

        let host = bridge.host();
        assert_eq!(host.guide_keys_present().len(), 3);
        assert_eq!(host.reloads, 0);
        assert!(host.sdk.as_ref().unwrap().restarted.is_empty());
    }

    #[test]
    fn allow_list_dispatches_listed_origin() {
        let host = StubHost::new().with_guide_keys();
        let config = BridgeConfig::new(OriginPolicy::AllowList(vec![
            "https://landing.test".to_string(),
        ]));
        let mut bridge = DemoBridge::new(host, config);

        bridge.handle_parent_message("https://landing.test", r#"{"type":"CLEAR_DEMO_STATE"}"#);

        assert!(bridge.host().guide_keys_present().is_empty());
    }

    #[test]
    fn allow_any_accepts_every_origin() {
        assert!(OriginPolicy::AllowAny.allows("https://anything.test"));
        assert!(OriginPolicy::AllowAny.allows(""));
        let list = OriginPolicy::AllowList(vec!["https://a.test".to_string()]);
        assert!(list.allows("https://a.test"));
        assert!(!list.allows("https://a.test/"));
    }

    #[test]
    fn ready_notification_posted_only_when_embedded() {
        let mut bridge = bridge(StubHost::new());
        bridge.notify_parent_ready();
        assert_eq!(bridge.host().posted, vec![OutboundNotification::DemoReady]);

        let mut host = StubHost::new();
        host.embedded = false;
        let mut top_level = DemoBridge::new(host, BridgeConfig::new(OriginPolicy::AllowAny));
        top_level.notify_parent_ready();
        assert!(top_level.host().posted.is_empty());
    }

    #[test]
    fn tour_completed_notification_posted_once_per_event() {
        let mut bridge = bridge(StubHost::new());
        bridge.notify_tour_completed();
        assert_eq!(bridge.host().posted, vec![OutboundNotification::TourCompleted]);
    }

    #[test]
    fn custom_storage_keys_are_respected() {
        let mut host = StubHost::new();
        host.storage.insert("other_state".to_string());
        host.storage.insert(GUIDE_STORAGE_KEYS[0].to_string());
        let config = BridgeConfig::new(OriginPolicy::AllowAny)
            .with_storage_keys(vec!["other_state".to_string()]);
        let mut bridge = DemoBridge::new(host, config);

        bridge.clear_state();

        assert!(!bridge.host().storage.contains("other_state"));
        assert!(bridge.host().storage.contains(GUIDE_STORAGE_KEYS[0]));
    }
}
