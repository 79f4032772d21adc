//! RTCPeerConnection instrumentation.
//!
//! Four surfaces are wrapped:
//! - the constructor (and its vendor-prefixed aliases),
//! - `createDataChannel`,
//! - `addIceCandidate`, `setLocalDescription`, `setRemoteDescription`.
//!
//! Each wrapper reports to the [`Observer`] and then forwards the call
//! unchanged. Nothing here can make the page's call fail.

use js_sys::{Array, Object};
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use super::hooks;
use super::observer::Observer;
use crate::config::MonitorConfig;
use crate::record::ObservationKind;

/// One replaced binding, kept so it can be put back.
pub struct Patch {
    owner: JsValue,
    property: String,
    original: JsValue,
}

impl Patch {
    pub fn label(&self) -> &str {
        &self.property
    }

    pub fn restore(&self) -> Result<(), JsValue> {
        js_sys::Reflect::set(&self.owner, &JsValue::from_str(&self.property), &self.original)?;
        Ok(())
    }
}

/// Prototype methods carrying signaling text, with the payload field each one
/// reads from its first argument.
const SIGNALING_METHODS: [(&str, &str, ObservationKind); 3] = [
    ("addIceCandidate", "candidate", ObservationKind::IceCandidate),
    ("setLocalDescription", "sdp", ObservationKind::LocalDescription),
    ("setRemoteDescription", "sdp", ObservationKind::RemoteDescription),
];

fn signaling_enabled(config: &MonitorConfig, kind: ObservationKind) -> bool {
    match kind {
        ObservationKind::IceCandidate => config.ice_candidate,
        ObservationKind::LocalDescription => config.local_description,
        ObservationKind::RemoteDescription => config.remote_description,
        ObservationKind::ConnectionConstruction => config.connection,
        ObservationKind::DataChannelConstruction => config.data_channel,
    }
}

/// Install every enabled hook. Returns the applied patches; an empty list
/// means no peer-connection constructor exists in this context.
pub fn apply(config: &MonitorConfig, observer: &Rc<Observer>) -> Result<Vec<Patch>, JsValue> {
    let mut patches = Vec::new();
    let mut patched_prototypes: Vec<JsValue> = Vec::new();

    for name in &config.constructor_names {
        let ctor = hooks::get_global(name)?;
        if ctor.is_undefined() || ctor.is_null() {
            continue;
        }

        // Aliases share one prototype (webkitRTCPeerConnection ===
        // RTCPeerConnection in Chromium); patch it only once.
        let proto = hooks::prototype_of(&ctor)?;
        if proto.is_object() && !patched_prototypes.iter().any(|p| Object::is(p, &proto)) {
            apply_prototype(config, observer, &proto, &mut patches)?;
            patched_prototypes.push(proto);
        }

        if config.connection {
            let obs = observer.clone();
            let wrapped = hooks::wrap_constructor(&ctor, move |args: &Array| {
                obs.observe_construction(
                    ObservationKind::ConnectionConstruction,
                    hooks::stringify_arguments(args),
                );
            })?;
            hooks::set_global(name, &wrapped)?;
            patches.push(Patch {
                owner: js_sys::global().into(),
                property: name.clone(),
                original: ctor,
            });
            log::debug!("Hooked {} constructor", name);
        }
    }

    Ok(patches)
}

fn apply_prototype(
    config: &MonitorConfig,
    observer: &Rc<Observer>,
    proto: &JsValue,
    patches: &mut Vec<Patch>,
) -> Result<(), JsValue> {
    for (method, field, kind) in SIGNALING_METHODS {
        if !signaling_enabled(config, kind) {
            continue;
        }
        let original = js_sys::Reflect::get(proto, &JsValue::from_str(method))?;
        if !original.is_function() {
            continue;
        }
        let obs = observer.clone();
        let wrapped = hooks::wrap_method(&original, move |_this: &JsValue, args: &Array| {
            let payload = hooks::first_arg_field(args, field);
            obs.observe_signal(kind, payload.as_deref());
        })?;
        let original = hooks::patch_method(proto, method, &wrapped)?;
        patches.push(Patch {
            owner: proto.clone(),
            property: method.to_string(),
            original,
        });
    }

    if config.data_channel {
        let original = js_sys::Reflect::get(proto, &JsValue::from_str("createDataChannel"))?;
        if original.is_function() {
            let obs = observer.clone();
            let wrapped = hooks::wrap_method(&original, move |_this: &JsValue, args: &Array| {
                obs.observe_construction(
                    ObservationKind::DataChannelConstruction,
                    hooks::stringify_arguments(args),
                );
            })?;
            let original = hooks::patch_method(proto, "createDataChannel", &wrapped)?;
            patches.push(Patch {
                owner: proto.clone(),
                property: "createDataChannel".to_string(),
                original,
            });
        }
    }

    Ok(())
}
