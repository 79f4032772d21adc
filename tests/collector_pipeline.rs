//! Collector Pipeline Tests
//!
//! Exercises the channel bridge → collector → analysis path without a
//! browser. Run with: cargo test --test collector_pipeline

#![cfg(not(target_arch = "wasm32"))]

use futures::executor::block_on;
use rtc_localhost_monitor::bridge;
use rtc_localhost_monitor::{
    localhost_hits, AnalysisOptions, CallSite, Collector, LocalhostIndicator, ObservationKind,
    ObservationRecord, RecordSink, UNKNOWN_SOURCE,
};

fn signal(kind: ObservationKind, text: &str, source: &str) -> ObservationRecord {
    ObservationRecord::signaling(
        kind,
        text,
        "2025-03-01T12:00:00.000Z".into(),
        CallSite {
            frames: vec![format!("    at connect ({}:1:1)", source)],
            source_url: source.into(),
        },
    )
}

// ===== Ordering Tests =====

#[test]
fn pump_preserves_emission_order() {
    let (sink, rx) = bridge::channel();
    let collector = Collector::new();

    let texts = [
        "candidate:1 1 udp 1 127.0.0.1 3000 typ host",
        "v=0\r\nc=IN IP4 0.0.0.0\r\n",
        "candidate:2 1 udp 1 ::1 3001 typ host",
    ];
    for text in texts {
        sink.emit(signal(ObservationKind::IceCandidate, text, "https://a.example/x.js"))
            .unwrap();
    }
    sink.close();

    let received = block_on(collector.pump(rx));
    assert_eq!(received, 3);

    let buffered = collector.get_buffered();
    let seen: Vec<&str> = buffered.iter().map(|r| r.candidate_text()).collect();
    assert_eq!(seen, texts.to_vec());
    assert_eq!(buffered[1].localhost_indicator(), LocalhostIndicator::UnspecifiedV4);
    assert_eq!(buffered[2].localhost_indicator(), LocalhostIndicator::LoopbackV6);
}

#[test]
fn identical_records_are_both_buffered() {
    let (sink, rx) = bridge::channel();
    let collector = Collector::new();

    let record = signal(ObservationKind::RemoteDescription, "a=sctp-port:5000", UNKNOWN_SOURCE);
    sink.emit(record.clone()).unwrap();
    sink.emit(record.clone()).unwrap();
    drop(sink);

    assert_eq!(block_on(collector.pump(rx)), 2);
    assert_eq!(collector.get_buffered(), vec![record.clone(), record]);
}

#[test]
fn retrieval_does_not_consume() {
    let (sink, rx) = bridge::channel();
    let collector = Collector::new();
    sink.emit(signal(ObservationKind::IceCandidate, "127.0.0.1 9", UNKNOWN_SOURCE))
        .unwrap();
    sink.close();
    block_on(collector.pump(rx));

    assert_eq!(collector.get_buffered().len(), 1);
    assert_eq!(collector.get_buffered().len(), 1);
    assert_eq!(collector.drain().len(), 1);
    assert!(collector.get_buffered().is_empty());
}

// ===== Shutdown Tests =====

#[test]
fn closed_bridge_drops_late_records() {
    let (sink, rx) = bridge::channel();
    let collector = Collector::new();
    sink.emit(signal(ObservationKind::IceCandidate, "127.0.0.1 1", UNKNOWN_SOURCE))
        .unwrap();
    sink.close();
    assert!(sink.is_closed());
    assert!(sink
        .emit(signal(ObservationKind::IceCandidate, "127.0.0.1 2", UNKNOWN_SOURCE))
        .is_err());

    assert_eq!(block_on(collector.pump(rx)), 1);
}

// ===== Analysis Tests =====

#[test]
fn buffered_records_reduce_to_localhost_hits() {
    let (sink, rx) = bridge::channel();
    let collector = Collector::new();

    sink.emit(ObservationRecord::construction(
        ObservationKind::ConnectionConstruction,
        r#"[{"iceServers":[]}]"#.into(),
        "2025-03-01T12:00:00.000Z".into(),
        CallSite::unknown(),
    ))
    .unwrap();
    sink.emit(signal(
        ObservationKind::RemoteDescription,
        "a=candidate:1 1 udp 1 127.0.0.1 17600 typ host\r\n",
        "https://scan.tracker.example/p.js",
    ))
    .unwrap();
    sink.emit(signal(
        ObservationKind::IceCandidate,
        "candidate:1 1 udp 1 10.0.0.3 4000 typ host",
        "https://www.site.example/app.js",
    ))
    .unwrap();
    sink.close();
    block_on(collector.pump(rx));

    let hits = localhost_hits(&collector.get_buffered(), &AnalysisOptions::default());
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].port.as_str(), "17600");
    assert_eq!(hits[0].script_host.as_deref(), Some("scan.tracker.example"));
}

#[test]
fn relayed_records_are_classified_from_their_text() {
    let collector = Collector::new();
    collector
        .on_observation_json(
            r#"{"type":"ICECandidate",
                "candidateText":"candidate:1 1 udp 1 127.0.0.1 3000 typ host",
                "timestamp":"2025-03-01T12:00:00.000Z",
                "sourceUrl":"https://scan.tracker.example/p.js"}"#,
        )
        .unwrap();
    collector
        .on_observation_json(
            r#"{"type":"SDP-Remote","localhostIndicator":"127.0.0.1","port":"9",
                "candidateText":"10.0.0.1 3000",
                "timestamp":"2025-03-01T12:00:00.000Z"}"#,
        )
        .unwrap();

    let hits = localhost_hits(&collector.get_buffered(), &AnalysisOptions::default());
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].indicator, LocalhostIndicator::LoopbackV4);
    assert_eq!(hits[0].port.as_str(), "3000");
}
