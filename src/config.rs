//! Monitor configuration.
//!
//! Everything is on by default; the host passes a JS object to turn
//! individual surfaces off or to change the bridge name.

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::attribution::AttributionDepth;

/// Name of the host-exposed callback the crawler registers.
pub const DEFAULT_BRIDGE_NAME: &str = "calledWebRTC";

/// Configuration for which surfaces to instrument and where records go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Global function the host exposes to receive records.
    pub bridge_name: String,
    /// `true`: emit through the exposed host function. `false`: keep records
    /// in the in-page collector owned by `WebRtcMonitor`.
    pub emit_to_host: bool,
    /// Leading stack lines owned by the monitor.
    pub attribution_depth: AttributionDepth,
    /// Global constructor names to wrap (vendor-prefixed aliases included).
    pub constructor_names: Vec<String>,
    // Surfaces
    pub connection: bool,
    pub data_channel: bool,
    pub ice_candidate: bool,
    pub local_description: bool,
    pub remote_description: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bridge_name: DEFAULT_BRIDGE_NAME.to_string(),
            emit_to_host: true,
            attribution_depth: AttributionDepth::DEFAULT,
            constructor_names: vec![
                "RTCPeerConnection".to_string(),
                "webkitRTCPeerConnection".to_string(),
            ],
            connection: true,
            data_channel: true,
            ice_candidate: true,
            local_description: true,
            remote_description: true,
        }
    }
}

impl MonitorConfig {
    /// Read options passed from JS. `undefined`/`null` give the defaults, and
    /// so does an object that fails to parse (installation never aborts on a
    /// bad options bag).
    pub fn from_js(options: JsValue) -> Self {
        if options.is_undefined() || options.is_null() {
            return Self::default();
        }
        serde_wasm_bindgen::from_value(options).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable monitor options: {}", e);
            Self::default()
        })
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| crate::MonitorError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.emit_to_host && self.bridge_name.trim().is_empty() {
            return Err(crate::MonitorError::InvalidConfig(
                "bridgeName must not be empty when emitting to the host".into(),
            ));
        }
        let any_surface = self.connection
            || self.data_channel
            || self.ice_candidate
            || self.local_description
            || self.remote_description;
        if !any_surface {
            return Err(crate::MonitorError::InvalidConfig(
                "every surface is disabled; nothing to instrument".into(),
            ));
        }
        Ok(())
    }
}
