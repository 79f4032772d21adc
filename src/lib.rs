//! # RTC Localhost Monitor
//!
//! In-page WebRTC instrumentation compiled to WebAssembly. It reports peer
//! connections and signaling that point at loopback addresses, a common way
//! for scripts to probe services running on the visitor's machine.
//!
//! The host loads this module into the page before any other script runs and
//! either exposes a callback (`calledWebRTC` by default) or reads records back
//! from the in-page collector.
//!
//! ## Architecture
//!
//! ```text
//! page script → RTCPeerConnection / setLocalDescription / …
//!   ↓ (Proxy trap)
//! Interception layer ── extractor (loopback + port)
//!   ↓                 └─ attribution (stack → script URL)
//! Bridge (exposed host function | ordered channel)
//!   ↓
//! Collector buffer → host retrieval
//! ```
//!
//! ## Usage
//!
//! ```javascript
//! import init, { install_webrtc_monitor } from './pkg/rtc_localhost_monitor.js';
//! await init();
//! const monitor = install_webrtc_monitor({ emitToHost: false });
//! // … page runs …
//! monitor.getBuffered();
//! ```
//!
//! The monitor only observes. It never blocks, modifies or fails a WebRTC call.

use std::rc::Rc;
use wasm_bindgen::prelude::*;

// Modules
pub mod analysis;
pub mod attribution;
pub mod bridge;
pub mod clock;
pub mod collector;
pub mod config;
mod error;
pub mod extractor;
pub mod interception;
pub mod record;

pub use analysis::{localhost_hits, ports_by_script_host, AnalysisOptions, LocalhostHit};
pub use attribution::{attribute_source, capture_trace, trim_trace, AttributionDepth, CallSite};
pub use bridge::{ChannelBridge, ExposedFunctionBridge, RecordSink};
pub use collector::{Collector, TargetInfo, TargetType};
pub use config::MonitorConfig;
pub use error::{ErrorCode, ErrorInfo, MonitorError, Result};
pub use extractor::{classify_localhost, extract_port, extract_ports};
pub use interception::Installation;
pub use record::{LocalhostIndicator, ObservationKind, ObservationRecord, Port, PORT_NOT_FOUND, UNKNOWN_SOURCE};

/// Initialize logging when the module is instantiated. Nothing is hooked
/// until [`WebRtcMonitor::install`].
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    // A second instantiation in the same context finds a logger already set.
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Host-facing handle: owns the configuration, the installed hooks and the
/// in-page collector.
#[wasm_bindgen]
pub struct WebRtcMonitor {
    config: MonitorConfig,
    collector: Rc<Collector>,
    installation: Option<Installation>,
    channel: Option<ChannelBridge>,
}

#[wasm_bindgen]
impl WebRtcMonitor {
    /// Create a monitor from a JS options object (see [`MonitorConfig`]).
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> std::result::Result<WebRtcMonitor, JsValue> {
        let config = MonitorConfig::from_js(options);
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Install the hooks. Returns `{ applied: string[], count: number }`.
    pub fn install(&mut self) -> std::result::Result<JsValue, JsValue> {
        if self.installation.is_some() {
            return Err(MonitorError::AlreadyInstalled.into());
        }
        self.config.validate()?;
        log::info!("Starting WebRTC collection");

        let sink: Rc<dyn RecordSink> = if self.config.emit_to_host {
            Rc::new(ExposedFunctionBridge::new(self.config.bridge_name.clone()))
        } else {
            let (channel, rx) = bridge::channel();
            let collector = self.collector.clone();
            wasm_bindgen_futures::spawn_local(async move {
                collector.pump(rx).await;
            });
            self.channel = Some(channel.clone());
            Rc::new(channel)
        };

        let installation = interception::install(&self.config, sink)?;
        let applied = installation.applied();
        self.installation = Some(installation);

        let result = js_sys::Object::new();
        let applied_arr = js_sys::Array::new();
        for name in &applied {
            applied_arr.push(&JsValue::from_str(name));
        }
        js_sys::Reflect::set(&result, &JsValue::from_str("applied"), &applied_arr)?;
        js_sys::Reflect::set(
            &result,
            &JsValue::from_str("count"),
            &JsValue::from_f64(applied.len() as f64),
        )?;
        Ok(result.into())
    }

    /// Restore the original WebRTC bindings. Already buffered records stay
    /// available.
    pub fn uninstall(&mut self) -> std::result::Result<(), JsValue> {
        let installation = self.installation.take().ok_or(MonitorError::NotInstalled)?;
        let restored = installation.uninstall();
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
        restored.map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = isInstalled)]
    pub fn is_installed(&self) -> bool {
        self.installation.as_ref().is_some_and(Installation::is_active)
    }

    /// Whether the host callback is currently reachable.
    #[wasm_bindgen(js_name = isBridgeExposed)]
    pub fn is_bridge_exposed(&self) -> bool {
        ExposedFunctionBridge::new(self.config.bridge_name.clone()).is_available()
    }

    /// Buffered records in emission order; the buffer is left intact.
    #[wasm_bindgen(js_name = getBuffered)]
    pub fn get_buffered(&self) -> std::result::Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.collector.get_buffered()).map_err(MonitorError::from)?)
    }

    /// Buffered records in emission order; the buffer is emptied.
    pub fn drain(&self) -> std::result::Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.collector.drain()).map_err(MonitorError::from)?)
    }

    pub fn reset(&self) {
        self.collector.reset();
    }

    #[wasm_bindgen(getter)]
    pub fn length(&self) -> usize {
        self.collector.len()
    }

    /// Receive one record from another context (e.g. a host that relays
    /// records as JSON strings).
    #[wasm_bindgen(js_name = onObservation)]
    pub fn on_observation(&self, json: &str) -> std::result::Result<(), JsValue> {
        self.collector.on_observation_json(json)?;
        Ok(())
    }

    /// Localhost hits among the buffered records (see [`AnalysisOptions`]).
    #[wasm_bindgen(js_name = localhostHits)]
    pub fn localhost_hits(&self, options: JsValue) -> std::result::Result<JsValue, JsValue> {
        let options: AnalysisOptions = if options.is_undefined() || options.is_null() {
            AnalysisOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options).map_err(MonitorError::from)?
        };
        let hits = analysis::localhost_hits(&self.collector.get_buffered(), &options);
        Ok(serde_wasm_bindgen::to_value(&hits).map_err(MonitorError::from)?)
    }
}

impl WebRtcMonitor {
    pub fn with_config(config: MonitorConfig) -> Self {
        Self {
            config,
            collector: Rc::new(Collector::new()),
            installation: None,
            channel: None,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }
}

/// Create a monitor and install it in one step. This is the entry point the
/// host's injected bootstrap script calls.
#[wasm_bindgen]
pub fn install_webrtc_monitor(options: JsValue) -> std::result::Result<WebRtcMonitor, JsValue> {
    let mut monitor = WebRtcMonitor::new(options)?;
    monitor.install()?;
    Ok(monitor)
}
