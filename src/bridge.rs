//! Cross-context bridge: how records leave the interception layer.
//!
//! Emission is one-way and unacknowledged. Two transports exist:
//!
//! - [`ExposedFunctionBridge`]: calls the function the host exposed on the
//!   page's global object (the crawler's `calledWebRTC`). The host delivers
//!   calls from one context in issue order but asynchronously, so the returned
//!   promise is never awaited by the hook.
//! - [`ChannelBridge`]: an unbounded ordered channel feeding a
//!   [`Collector`](crate::collector::Collector) that lives in the same context.

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::error::{MonitorError, Result};
use crate::record::ObservationRecord;

/// Destination for observation records.
///
/// `emit` must not block. An `Err` means the record was dropped; callers log
/// it and carry on.
pub trait RecordSink {
    fn emit(&self, record: ObservationRecord) -> Result<()>;
}

/// Sender half of the in-context channel.
#[derive(Clone)]
pub struct ChannelBridge {
    tx: UnboundedSender<ObservationRecord>,
}

/// Create a channel bridge and the receiver a collector pumps from.
pub fn channel() -> (ChannelBridge, UnboundedReceiver<ObservationRecord>) {
    let (tx, rx) = mpsc::unbounded();
    (ChannelBridge { tx }, rx)
}

impl ChannelBridge {
    /// Close the channel; the collector's pump finishes once drained.
    pub fn close(&self) {
        self.tx.close_channel();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl RecordSink for ChannelBridge {
    fn emit(&self, record: ObservationRecord) -> Result<()> {
        self.tx
            .unbounded_send(record)
            .map_err(|_| MonitorError::ChannelClosed)
    }
}

/// Emits to a host-exposed global function, looked up on every emission so a
/// function exposed after installation is picked up.
#[derive(Debug, Clone)]
pub struct ExposedFunctionBridge {
    name: String,
}

impl ExposedFunctionBridge {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the host has exposed the callback yet.
    pub fn is_available(&self) -> bool {
        self.callback().is_some()
    }

    fn callback(&self) -> Option<js_sys::Function> {
        js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str(&self.name))
            .ok()
            .and_then(|f| f.dyn_into::<js_sys::Function>().ok())
    }
}

impl RecordSink for ExposedFunctionBridge {
    fn emit(&self, record: ObservationRecord) -> Result<()> {
        let callback = self
            .callback()
            .ok_or_else(|| MonitorError::BridgeUnavailable(self.name.clone()))?;

        let value = serde_wasm_bindgen::to_value(&record)?;
        let returned = callback
            .call1(&JsValue::UNDEFINED, &value)
            .map_err(|e| MonitorError::BridgeRejected(MonitorError::from_js(&e).to_string()))?;

        // Exposed functions answer with a promise. Delivery is fire-and-forget,
        // but a rejection still gets logged instead of surfacing as an
        // unhandled rejection in the page.
        if let Ok(promise) = returned.dyn_into::<js_sys::Promise>() {
            let name = self.name.clone();
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                    log::warn!("{} rejected a record: {}", name, MonitorError::from_js(&e));
                }
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::CallSite;
    use crate::record::ObservationKind;
    use futures::StreamExt;

    fn record(text: &str) -> ObservationRecord {
        ObservationRecord::signaling(
            ObservationKind::RemoteDescription,
            text,
            "2025-03-01T12:00:00.000Z".into(),
            CallSite::unknown(),
        )
    }

    #[test]
    fn test_channel_preserves_order() {
        let (bridge, rx) = channel();
        for i in 0..5 {
            bridge.emit(record(&format!("a=sctp-port:{}", 5000 + i))).unwrap();
        }
        bridge.close();

        let received: Vec<ObservationRecord> = futures::executor::block_on(rx.collect());
        let ports: Vec<&str> = received.iter().map(|r| r.port().as_str()).collect();
        assert_eq!(ports, vec!["5000", "5001", "5002", "5003", "5004"]);
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (bridge, rx) = channel();
        drop(rx);
        let err = bridge.emit(record("v=0")).unwrap_err();
        assert!(matches!(err, MonitorError::ChannelClosed));
        assert!(err.is_recoverable());
    }
}
