//! Buffering collector for observation records.
//!
//! Lifecycle: `new` → `on_observation`* (directly or via [`Collector::pump`])
//! → `get_buffered` / `drain` / `reset` → `dispose`. The collector owns its
//! buffer; nothing else reads or writes it. Records are stored as received:
//! no deduplication, no reordering, no mutation.

use futures::channel::mpsc::UnboundedReceiver;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

use crate::error::Result;
use crate::record::ObservationRecord;

/// Execution-context kinds a host may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Page,
    BackgroundPage,
    ServiceWorker,
    SharedWorker,
    Other,
    Browser,
    Webview,
}

/// A newly discovered execution context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetInfo {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: TargetType,
}

/// Ordered, append-only record buffer.
#[derive(Debug, Default)]
pub struct Collector {
    // Single exclusion boundary around append; emission order is preserved by
    // whoever feeds the collector.
    buffer: Mutex<Vec<ObservationRecord>>,
}

impl Collector {
    pub const ID: &'static str = "webRTC";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> &'static str {
        Self::ID
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<ObservationRecord>> {
        // A panic mid-append cannot leave a half-written record behind, so a
        // poisoned lock still guards a consistent Vec.
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append one record.
    pub fn on_observation(&self, record: ObservationRecord) {
        log::debug!(
            "Collected {} record from {}",
            record.kind(),
            record.source_url()
        );
        self.buffer().push(record);
    }

    /// Append one record received as JSON (the form an exposed host function
    /// sees). Legacy crawler field names are accepted.
    pub fn on_observation_json(&self, json: &str) -> Result<()> {
        let record = ObservationRecord::from_json(json)?;
        self.on_observation(record);
        Ok(())
    }

    /// Non-page contexts are not instrumented.
    pub fn add_target(&self, target: &TargetInfo) {
        log::debug!("Ignoring {:?} target {}", target.kind, target.url);
    }

    /// Snapshot of the buffer in insertion order. Does not clear it.
    pub fn get_buffered(&self) -> Vec<ObservationRecord> {
        self.buffer().clone()
    }

    /// Take every buffered record, leaving the buffer empty.
    pub fn drain(&self) -> Vec<ObservationRecord> {
        std::mem::take(&mut *self.buffer())
    }

    /// Discard every buffered record.
    pub fn reset(&self) {
        self.buffer().clear();
    }

    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer().is_empty()
    }

    /// End of life: hand back whatever is still buffered.
    pub fn dispose(self) -> Vec<ObservationRecord> {
        self.buffer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Receive records from a channel bridge until every sender is gone.
    /// Returns how many records were appended.
    pub async fn pump(&self, mut rx: UnboundedReceiver<ObservationRecord>) -> usize {
        let mut received = 0;
        while let Some(record) = rx.next().await {
            self.on_observation(record);
            received += 1;
        }
        log::debug!("Observation channel closed after {} records", received);
        received
    }
}
