//! Observation records.
//!
//! One record is produced per intercepted WebRTC event. Records are plain
//! strings and string lists so they cross the page/host boundary without any
//! custom serialization.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attribution::CallSite;
use crate::extractor;

/// Placeholder stored in `sourceUrl` when no caller frame carries a URL.
pub const UNKNOWN_SOURCE: &str = "UNKNOWN_SOURCE";

/// Placeholder stored in `port` when the payload holds no port.
pub const PORT_NOT_FOUND: &str = "N/A";

/// Which intercepted surface produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObservationKind {
    #[serde(rename = "RTCPeerConnection")]
    ConnectionConstruction,
    #[serde(rename = "RTCDataChannel")]
    DataChannelConstruction,
    #[serde(rename = "ICECandidate")]
    IceCandidate,
    #[serde(rename = "SDP-Local")]
    LocalDescription,
    #[serde(rename = "SDP-Remote")]
    RemoteDescription,
}

impl ObservationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ObservationKind::ConnectionConstruction => "RTCPeerConnection",
            ObservationKind::DataChannelConstruction => "RTCDataChannel",
            ObservationKind::IceCandidate => "ICECandidate",
            ObservationKind::LocalDescription => "SDP-Local",
            ObservationKind::RemoteDescription => "SDP-Remote",
        }
    }

    /// Construction events carry serialized arguments, not signaling text.
    pub const fn is_construction(self) -> bool {
        matches!(
            self,
            ObservationKind::ConnectionConstruction | ObservationKind::DataChannelConstruction
        )
    }
}

impl fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loopback marker found in a signaling payload. Variants are listed in
/// matching precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum LocalhostIndicator {
    #[default]
    #[serde(rename = "None")]
    None,
    #[serde(rename = "127.0.0.1")]
    LoopbackV4,
    #[serde(rename = "::1")]
    LoopbackV6,
    #[serde(rename = "localhost")]
    HostnameLocalhost,
    #[serde(rename = "0.0.0.0")]
    UnspecifiedV4,
}

impl LocalhostIndicator {
    /// Indicators in the order they are searched for. The order is part of the
    /// output contract: a payload containing several markers always reports
    /// the earliest one in this list.
    pub const PRECEDENCE: [LocalhostIndicator; 4] = [
        LocalhostIndicator::LoopbackV4,
        LocalhostIndicator::LoopbackV6,
        LocalhostIndicator::HostnameLocalhost,
        LocalhostIndicator::UnspecifiedV4,
    ];

    /// The literal substring that triggers this indicator.
    pub const fn needle(self) -> &'static str {
        match self {
            LocalhostIndicator::None => "None",
            LocalhostIndicator::LoopbackV4 => "127.0.0.1",
            LocalhostIndicator::LoopbackV6 => "::1",
            LocalhostIndicator::HostnameLocalhost => "localhost",
            LocalhostIndicator::UnspecifiedV4 => "0.0.0.0",
        }
    }

    pub fn is_local(self) -> bool {
        self != LocalhostIndicator::None
    }
}

impl fmt::Display for LocalhostIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.needle())
    }
}

/// A port pulled out of signaling text, or the not-found sentinel.
///
/// Kept as the matched digit string; serialized as a bare string (`"N/A"`
/// when absent).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Port {
    Found(String),
    #[default]
    NotFound,
}

impl Port {
    pub fn as_str(&self) -> &str {
        match self {
            Port::Found(digits) => digits,
            Port::NotFound => PORT_NOT_FOUND,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Port::Found(_))
    }

    /// Numeric value, when the digits fit a TCP/UDP port.
    pub fn number(&self) -> Option<u16> {
        match self {
            Port::Found(digits) => digits.parse().ok(),
            Port::NotFound => None,
        }
    }
}

impl From<&str> for Port {
    fn from(s: &str) -> Self {
        if s == PORT_NOT_FOUND || s.is_empty() {
            Port::NotFound
        } else {
            Port::Found(s.to_string())
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Port {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Port {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Port::from(s.as_str()))
    }
}

/// The unit of data produced per intercepted event.
///
/// Fields are private; a record cannot change after construction. Legacy
/// crawler field names are accepted on input.
///
/// Indicator and port are never read back from serialized input. They are
/// derived again from the candidate text (see [`WireRecord`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireRecord")]
pub struct ObservationRecord {
    #[serde(rename = "type")]
    kind: ObservationKind,
    localhost_indicator: LocalhostIndicator,
    port: Port,
    candidate_text: String,
    timestamp: String,
    source_url: String,
    stack_frames: Vec<String>,
}

/// Serialized form of a record as received from another context. Stored
/// `localhostIndicator` / `port` fields are ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRecord {
    #[serde(rename = "type")]
    kind: ObservationKind,
    #[serde(alias = "candidate")]
    candidate_text: String,
    timestamp: String,
    #[serde(alias = "source", default = "unknown_source")]
    source_url: String,
    #[serde(alias = "stack", default)]
    stack_frames: Vec<String>,
}

fn unknown_source() -> String {
    UNKNOWN_SOURCE.to_string()
}

impl From<WireRecord> for ObservationRecord {
    fn from(wire: WireRecord) -> Self {
        let call_site = CallSite {
            frames: wire.stack_frames,
            source_url: wire.source_url,
        };
        if wire.kind.is_construction() {
            Self::construction(wire.kind, wire.candidate_text, wire.timestamp, call_site)
        } else {
            Self::signaling(wire.kind, &wire.candidate_text, wire.timestamp, call_site)
        }
    }
}

impl ObservationRecord {
    /// Build a record for a signaling payload (ICE candidate or SDP body).
    /// Indicator and port are derived from `text`.
    pub fn signaling(kind: ObservationKind, text: &str, timestamp: String, call_site: CallSite) -> Self {
        Self {
            kind,
            localhost_indicator: extractor::classify_localhost(text),
            port: extractor::extract_port(text),
            candidate_text: text.to_string(),
            timestamp,
            source_url: call_site.source_url,
            stack_frames: call_site.frames,
        }
    }

    /// Build a record for a constructor call. `arguments_json` is the
    /// serialized argument list; no classification is applied to it.
    pub fn construction(
        kind: ObservationKind,
        arguments_json: String,
        timestamp: String,
        call_site: CallSite,
    ) -> Self {
        Self {
            kind,
            localhost_indicator: LocalhostIndicator::None,
            port: Port::NotFound,
            candidate_text: arguments_json,
            timestamp,
            source_url: call_site.source_url,
            stack_frames: call_site.frames,
        }
    }

    pub fn kind(&self) -> ObservationKind {
        self.kind
    }

    pub fn localhost_indicator(&self) -> LocalhostIndicator {
        self.localhost_indicator
    }

    pub fn port(&self) -> &Port {
        &self.port
    }

    pub fn candidate_text(&self) -> &str {
        &self.candidate_text
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn stack_frames(&self) -> &[String] {
        &self.stack_frames
    }

    pub fn has_known_source(&self) -> bool {
        self.source_url != UNKNOWN_SOURCE
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| crate::MonitorError::MalformedRecord(e.to_string()))
    }
}
