//! Post-collection analysis of buffered records.
//!
//! Reduces a page's records to the localhost contacts worth reporting: one
//! hit per distinct port of every signaling record that names a loopback
//! address. Construction records never produce hits, and local descriptions
//! are skipped by default because they describe the browser's own
//! candidates rather than a peer it was told to reach.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::extractor;
use crate::record::{LocalhostIndicator, ObservationKind, ObservationRecord, Port};

/// Script URLs longer than this are cut in reports.
pub const DEFAULT_SCRIPT_URL_CUTOFF: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisOptions {
    pub include_local_descriptions: bool,
    pub script_url_cutoff: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_local_descriptions: false,
            script_url_cutoff: DEFAULT_SCRIPT_URL_CUTOFF,
        }
    }
}

/// One localhost port contacted from one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalhostHit {
    #[serde(rename = "type")]
    pub kind: ObservationKind,
    pub indicator: LocalhostIndicator,
    pub port: Port,
    pub candidate_text: String,
    pub script_url: String,
    pub script_host: Option<String>,
}

fn qualifies(record: &ObservationRecord, options: &AnalysisOptions) -> bool {
    let kind = record.kind();
    if kind.is_construction() {
        return false;
    }
    if kind == ObservationKind::LocalDescription && !options.include_local_descriptions {
        return false;
    }
    record.localhost_indicator().is_local()
}

/// Distinct ports in first-seen order; the not-found sentinel when none.
fn distinct_ports(text: &str) -> Vec<Port> {
    let mut ports: Vec<Port> = Vec::new();
    for port in extractor::extract_ports(text) {
        if !ports.contains(&port) {
            ports.push(port);
        }
    }
    if ports.is_empty() {
        ports.push(Port::NotFound);
    }
    ports
}

/// Host part of an attributed script URL; `None` for the unknown-source
/// sentinel and anything else that does not parse.
pub fn script_host(source_url: &str) -> Option<String> {
    url::Url::parse(source_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Every localhost hit in `records`, in record order.
pub fn localhost_hits(records: &[ObservationRecord], options: &AnalysisOptions) -> Vec<LocalhostHit> {
    records
        .iter()
        .filter(|r| qualifies(r, options))
        .flat_map(|record| {
            let script_url: String = record
                .source_url()
                .chars()
                .take(options.script_url_cutoff)
                .collect();
            let host = script_host(record.source_url());
            distinct_ports(record.candidate_text())
                .into_iter()
                .map(move |port| LocalhostHit {
                    kind: record.kind(),
                    indicator: record.localhost_indicator(),
                    port,
                    candidate_text: record.candidate_text().to_string(),
                    script_url: script_url.clone(),
                    script_host: host.clone(),
                })
        })
        .collect()
}

/// Port → hosts of the scripts that signaled it. Scripts without a known
/// host are grouped under the empty string.
pub fn ports_by_script_host(
    records: &[ObservationRecord],
    options: &AnalysisOptions,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut ports: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for hit in localhost_hits(records, options) {
        ports
            .entry(hit.port.to_string())
            .or_default()
            .insert(hit.script_host.unwrap_or_default());
    }
    ports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::CallSite;

    fn record(kind: ObservationKind, text: &str, source: &str) -> ObservationRecord {
        ObservationRecord::signaling(
            kind,
            text,
            "2025-03-01T12:00:00.000Z".into(),
            CallSite {
                frames: Vec::new(),
                source_url: source.into(),
            },
        )
    }

    fn sample() -> Vec<ObservationRecord> {
        vec![
            ObservationRecord::construction(
                ObservationKind::ConnectionConstruction,
                r#"[{"iceServers":[{"urls":"stun:127.0.0.1:3478"}]}]"#.into(),
                "2025-03-01T12:00:00.000Z".into(),
                CallSite::unknown(),
            ),
            record(
                ObservationKind::RemoteDescription,
                "a=candidate:1 1 udp 1 127.0.0.1 12387 typ host\r\n\
                 a=candidate:2 1 udp 1 127.0.0.1 12388 typ host\r\n\
                 a=candidate:3 1 tcp 1 127.0.0.1 12387 typ host\r\n",
                "https://connect.tracker.example/signals/config.js",
            ),
            record(
                ObservationKind::LocalDescription,
                "c=IN IP4 127.0.0.1\r\na=sctp-port:5000\r\n",
                "https://www.site.example/app.js",
            ),
            record(
                ObservationKind::IceCandidate,
                "candidate:1 1 UDP 2122260223 192.168.1.5 54321 typ host",
                "https://www.site.example/app.js",
            ),
            record(ObservationKind::IceCandidate, "candidate:9 1 udp 1 ::1 typ host", "UNKNOWN_SOURCE"),
        ]
    }

    #[test]
    fn test_hits_skip_construction_local_and_non_loopback() {
        let hits = localhost_hits(&sample(), &AnalysisOptions::default());
        let summary: Vec<(ObservationKind, &str)> =
            hits.iter().map(|h| (h.kind, h.port.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                (ObservationKind::RemoteDescription, "12387"),
                (ObservationKind::RemoteDescription, "12388"),
                (ObservationKind::IceCandidate, "N/A"),
            ]
        );
        assert_eq!(hits[0].script_host.as_deref(), Some("connect.tracker.example"));
        assert_eq!(hits[2].indicator, LocalhostIndicator::LoopbackV6);
        assert_eq!(hits[2].script_host, None);
    }

    #[test]
    fn test_local_descriptions_opt_in() {
        let options = AnalysisOptions {
            include_local_descriptions: true,
            ..Default::default()
        };
        let hits = localhost_hits(&sample(), &options);
        assert!(hits
            .iter()
            .any(|h| h.kind == ObservationKind::LocalDescription && h.port.as_str() == "5000"));
    }

    #[test]
    fn test_script_url_cutoff() {
        let long = format!("https://cdn.example/{}.js", "a".repeat(600));
        let records = vec![record(ObservationKind::IceCandidate, "127.0.0.1 80", &long)];
        let hits = localhost_hits(&records, &AnalysisOptions::default());
        assert_eq!(hits[0].script_url.chars().count(), DEFAULT_SCRIPT_URL_CUTOFF);
        assert_eq!(hits[0].script_host.as_deref(), Some("cdn.example"));
    }

    #[test]
    fn test_ports_by_script_host() {
        let map = ports_by_script_host(&sample(), &AnalysisOptions::default());
        assert_eq!(map.len(), 3);
        assert!(map["12387"].contains("connect.tracker.example"));
        assert!(map["N/A"].contains(""));
    }
}
