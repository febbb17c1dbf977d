#![forbid(unsafe_code)]

//! `wasm-bindgen` exports for the demo integration.
//!
//! Wraps [`demobridge_core::DemoBridge`] over the [`WebHost`](crate::host)
//! adapter with JS-friendly types. Only compiled on `wasm32` targets.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Reflect;
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::MessageEvent;

use crate::host::WebHost;
use crate::readiness::{ReadyDispatch, ready_dispatch};
use demobridge_core::message::GuideTarget;
use demobridge_core::{BridgeConfig, DemoBridge, OriginPolicy, TOUR_COMPLETED_EVENT};

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<js_sys::Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            // Keep it simple and robust: always print something useful.
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

type SharedBridge = Rc<RefCell<DemoBridge<WebHost>>>;

/// Run `f` against the bridge unless an SDK callback re-entered us
/// synchronously mid-dispatch; dropping the event beats panicking.
fn with_bridge(bridge: &SharedBridge, f: impl FnOnce(&mut DemoBridge<WebHost>)) {
    match bridge.try_borrow_mut() {
        Ok(mut bridge) => f(&mut bridge),
        Err(_) => warn!("bridge busy; dropping re-entrant event"),
    }
}

/// Live demo integration for one page load.
///
/// Returned by [`init_demo_integration`]; keeps the event-listener closures
/// alive and exposes the manual-invocation surface (`clearState`,
/// `triggerTour`, `notifyParentReady`). Dropping it from JS detaches nothing
/// explicitly — listeners live for the page lifetime, matching the
/// integration contract.
#[wasm_bindgen]
pub struct DemoIntegration {
    bridge: SharedBridge,
    _message_listener: Closure<dyn FnMut(MessageEvent)>,
    _ready_listener: Option<Closure<dyn FnMut(web_sys::Event)>>,
    _completed_listener: Closure<dyn FnMut(web_sys::Event)>,
}

/// Wire the current document into the demo integration lifecycle.
///
/// `allowed_origins` is the command origin allow-list; passing nothing (or
/// `null`) accepts commands from any origin and is intended for local demos
/// only. Runs once per page load:
///
/// 1. clears guide storage unconditionally,
/// 2. listens for parent `message` commands,
/// 3. announces `DEMO_READY` once the document is ready (only if embedded),
/// 4. forwards the SDK's tour-completed custom event as `TOUR_COMPLETED`.
#[wasm_bindgen(js_name = initDemoIntegration)]
pub fn init_demo_integration(
    allowed_origins: Option<Vec<String>>,
) -> Result<DemoIntegration, JsValue> {
    install_panic_hook();

    let window =
        web_sys::window().ok_or_else(|| JsValue::from_str("no window in this context"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document in this context"))?;

    let policy = match allowed_origins {
        Some(origins) => OriginPolicy::AllowList(origins),
        None => OriginPolicy::AllowAny,
    };
    let host = WebHost::new(window.clone());
    let bridge: SharedBridge = Rc::new(RefCell::new(DemoBridge::new(
        host,
        BridgeConfig::new(policy),
    )));

    // Stateless demo: guide state is wiped on every load, not only on
    // explicit clear commands, so returning visitors get a fresh guide.
    bridge.borrow_mut().clear_state();

    let message_listener = {
        let bridge = Rc::clone(&bridge);
        Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let origin = event.origin();
            // Route the payload through JSON so the portable parser sees the
            // same schema regardless of what the host page posted.
            let Some(payload) = js_sys::JSON::stringify(&event.data())
                .ok()
                .and_then(|json| json.as_string())
            else {
                return;
            };
            with_bridge(&bridge, |bridge| {
                bridge.handle_parent_message(&origin, &payload);
            });
        })
    };
    window.add_event_listener_with_callback("message", message_listener.as_ref().unchecked_ref())?;

    let ready_listener = match ready_dispatch(&document.ready_state()) {
        ReadyDispatch::NotifyNow => {
            bridge.borrow_mut().notify_parent_ready();
            None
        }
        ReadyDispatch::DeferUntilContentLoaded => {
            let listener = {
                let bridge = Rc::clone(&bridge);
                Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
                    with_bridge(&bridge, DemoBridge::notify_parent_ready);
                })
            };
            // DOMContentLoaded fires at most once, so this delivers exactly
            // one readiness notification.
            document.add_event_listener_with_callback(
                "DOMContentLoaded",
                listener.as_ref().unchecked_ref(),
            )?;
            Some(listener)
        }
    };

    let completed_listener = {
        let bridge = Rc::clone(&bridge);
        Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            with_bridge(&bridge, DemoBridge::notify_tour_completed);
        })
    };
    window.add_event_listener_with_callback(
        TOUR_COMPLETED_EVENT,
        completed_listener.as_ref().unchecked_ref(),
    )?;

    Ok(DemoIntegration {
        bridge,
        _message_listener: message_listener,
        _ready_listener: ready_listener,
        _completed_listener: completed_listener,
    })
}

#[wasm_bindgen]
impl DemoIntegration {
    /// Remove the guide SDK's storage keys.
    #[wasm_bindgen(js_name = clearState)]
    pub fn clear_state(&self) {
        with_bridge(&self.bridge, DemoBridge::clear_state);
    }

    /// Clear state and start a tour. Omitting `guideId` (or passing
    /// `"auto"`) reloads the page and lets the SDK pick the guide.
    #[wasm_bindgen(js_name = triggerTour)]
    pub fn trigger_tour(&self, guide_id: Option<String>) {
        let target = GuideTarget::from_guide_id(guide_id.as_deref());
        with_bridge(&self.bridge, |bridge| bridge.trigger_tour(&target));
    }

    /// Re-announce readiness to the hosting window.
    #[wasm_bindgen(js_name = notifyParentReady)]
    pub fn notify_parent_ready(&self) {
        with_bridge(&self.bridge, DemoBridge::notify_parent_ready);
    }
}
