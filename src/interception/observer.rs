//! Turns an intercepted call into an emitted record.
//!
//! The hooks in [`peer_connection`](super::peer_connection) only pull the
//! payload out of the JS arguments; everything after that (guarding, trace
//! capture, classification, emission) happens here in plain Rust.

use std::cell::Cell;
use std::rc::Rc;

use crate::attribution::{self, AttributionDepth};
use crate::bridge::RecordSink;
use crate::clock;
use crate::record::{ObservationKind, ObservationRecord};

pub struct Observer {
    sink: Rc<dyn RecordSink>,
    depth: AttributionDepth,
    // Cleared on uninstall; wrappers the page still holds turn into plain
    // pass-throughs.
    active: Cell<bool>,
}

impl Observer {
    pub fn new(sink: Rc<dyn RecordSink>, depth: AttributionDepth) -> Self {
        Self {
            sink,
            depth,
            active: Cell::new(true),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn deactivate(&self) {
        self.active.set(false);
    }

    /// Record a constructor call. `arguments_json` is the serialized argument
    /// list. Returns whether a record was emitted.
    pub fn observe_construction(&self, kind: ObservationKind, arguments_json: String) -> bool {
        if !self.is_active() {
            return false;
        }
        let call_site = attribution::capture_call_site(self.depth);
        self.emit(ObservationRecord::construction(
            kind,
            arguments_json,
            clock::now_iso(),
            call_site,
        ))
    }

    /// Record a signaling payload. Absent or empty payloads emit nothing.
    /// Returns whether a record was emitted.
    pub fn observe_signal(&self, kind: ObservationKind, payload: Option<&str>) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(text) = payload.filter(|t| !t.is_empty()) else {
            return false;
        };
        let call_site = attribution::capture_call_site(self.depth);
        self.emit(ObservationRecord::signaling(kind, text, clock::now_iso(), call_site))
    }

    fn emit(&self, record: ObservationRecord) -> bool {
        match self.sink.emit(record) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }
}
