#![forbid(unsafe_code)]

//! `web-sys` implementation of the host capability traits.
//!
//! [`WebHost`] adapts one browser [`web_sys::Window`] to
//! [`demobridge_core::DemoHost`]: local storage removal, page reload,
//! parent-frame detection, `postMessage` delivery, and probing of the guide
//! SDK's global handle. All JS failures degrade to logged no-ops or
//! [`HostError`] values.

use demobridge_core::message::OutboundNotification;
use demobridge_core::{DemoHost, GuideSdk, HostError, SDK_GLOBAL};
use js_sys::Reflect;
use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};

fn describe_js(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// The guide SDK's global handle, probed fresh on each use.
///
/// The SDK loads asynchronously and may replace its handle, so nothing about
/// it is cached across operations.
pub(crate) struct WebSdk {
    handle: JsValue,
}

impl WebSdk {
    fn restart_fn(&self) -> Option<js_sys::Function> {
        let value = Reflect::get(&self.handle, &JsValue::from_str("restartGuide")).ok()?;
        value.dyn_into::<js_sys::Function>().ok()
    }
}

impl GuideSdk for WebSdk {
    fn supports_restart(&self) -> bool {
        self.restart_fn().is_some()
    }

    fn restart_guide(&mut self, guide_id: &str) {
        let Some(restart) = self.restart_fn() else {
            return;
        };
        if let Err(err) = restart.call1(&self.handle, &JsValue::from_str(guide_id)) {
            warn!(guide_id = %guide_id, error = %describe_js(&err), "restartGuide call failed");
        }
    }
}

/// Browser-backed [`DemoHost`].
pub(crate) struct WebHost {
    window: web_sys::Window,
    sdk_slot: Option<WebSdk>,
}

impl WebHost {
    pub(crate) fn new(window: web_sys::Window) -> Self {
        Self {
            window,
            sdk_slot: None,
        }
    }

    fn parent_window(&self) -> Option<web_sys::Window> {
        // parent() errors on cross-origin access restrictions; treat that
        // the same as having no distinct parent.
        self.window.parent().ok().flatten()
    }
}

impl DemoHost for WebHost {
    fn remove_storage_key(&mut self, key: &str) -> Result<(), HostError> {
        let storage = self
            .window
            .local_storage()
            .map_err(|err| HostError::Storage(describe_js(&err)))?
            .ok_or_else(|| HostError::Storage("local storage unavailable".to_string()))?;
        storage
            .remove_item(key)
            .map_err(|err| HostError::Storage(describe_js(&err)))
    }

    fn reload_page(&mut self) {
        if let Err(err) = self.window.location().reload() {
            warn!(error = %describe_js(&err), "page reload failed");
        }
    }

    fn is_embedded(&self) -> bool {
        match self.parent_window() {
            // A top-level window's parent is itself.
            Some(parent) => !js_sys::Object::is(parent.as_ref(), self.window.as_ref()),
            None => false,
        }
    }

    fn post_to_parent(&mut self, notification: OutboundNotification) {
        let Some(parent) = self.parent_window() else {
            return;
        };
        let payload = js_sys::Object::new();
        let _ = Reflect::set(
            &payload,
            &JsValue::from_str("type"),
            &JsValue::from_str(notification.kind()),
        );
        // Wildcard target: the hosting origin is not known at build time.
        if let Err(err) = parent.post_message(payload.as_ref(), "*") {
            warn!(
                kind = notification.kind(),
                error = %describe_js(&err),
                "postMessage to parent failed"
            );
        }
    }

    fn sdk(&mut self) -> Option<&mut dyn GuideSdk> {
        let handle = Reflect::get(self.window.as_ref(), &JsValue::from_str(SDK_GLOBAL)).ok()?;
        if handle.is_undefined() || handle.is_null() {
            return None;
        }
        self.sdk_slot = Some(WebSdk { handle });
        self.sdk_slot.as_mut().map(|sdk| sdk as &mut dyn GuideSdk)
    }
}
