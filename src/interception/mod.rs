//! WebRTC interception layer.
//!
//! Wraps the peer-connection constructor and its signaling methods with
//! `Proxy` decorators that observe every call and then forward it unchanged.
//! Instances, return values, promises and exceptions are exactly those of the
//! original API.
//!
//! ## Lifetime
//!
//! Installation normally lasts as long as the page context. It can be undone
//! with [`Installation::uninstall`]: every global and prototype binding is
//! restored, and wrappers the page already captured keep working as plain
//! pass-throughs that no longer emit.

pub mod hooks;
pub mod observer;
pub mod peer_connection;

use std::rc::Rc;

use crate::bridge::RecordSink;
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};

pub use observer::Observer;
pub use peer_connection::Patch;

/// Handle to installed hooks.
pub struct Installation {
    patches: Vec<Patch>,
    observer: Rc<Observer>,
}

/// Install the WebRTC hooks into the current global context, emitting through
/// `sink`.
///
/// Must run before any page script so that every peer connection is created
/// through the wrapped constructor.
pub fn install(config: &MonitorConfig, sink: Rc<dyn RecordSink>) -> Result<Installation> {
    let observer = Rc::new(Observer::new(sink, config.attribution_depth));
    let patches = peer_connection::apply(config, &observer).map_err(|e| MonitorError::from_js(&e))?;

    if patches.is_empty() {
        return Err(MonitorError::ApiUnavailable(config.constructor_names.join(", ")));
    }

    log::info!(
        "Added WebRTC collection ({} hooks: {})",
        patches.len(),
        patches.iter().map(Patch::label).collect::<Vec<_>>().join(", ")
    );
    Ok(Installation { patches, observer })
}

impl Installation {
    /// Names of the replaced bindings, in installation order.
    pub fn applied(&self) -> Vec<String> {
        self.patches.iter().map(|p| p.label().to_string()).collect()
    }

    pub fn is_active(&self) -> bool {
        self.observer.is_active()
    }

    /// Restore every original binding and stop emitting.
    ///
    /// Restoration continues past a failing binding; the first failure is
    /// reported once all others have been attempted.
    pub fn uninstall(self) -> Result<()> {
        self.observer.deactivate();

        let mut first_error = None;
        for patch in self.patches.iter().rev() {
            if let Err(e) = patch.restore() {
                log::warn!("Could not restore {}", patch.label());
                first_error.get_or_insert(MonitorError::from_js(&e));
            }
        }
        log::info!("Removed WebRTC collection");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
