//! Signal extraction from free-form WebRTC signaling text.
//!
//! Pure functions: ICE candidate lines and SDP bodies go in, a loopback
//! classification and a best-effort port come out. Nothing here fails; a miss
//! is reported through the sentinel values of [`LocalhostIndicator::None`] and
//! [`Port::NotFound`].

use regex::Regex;
use std::sync::OnceLock;

use crate::record::{LocalhostIndicator, Port};

/// `<dotted IPv4> <whitespace> <digits>` as found in ICE candidate lines.
fn ip_port_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+\.\d+\.\d+\.\d+)\s+(\d+)").expect("ip-port regex is valid"))
}

/// SDP data-channel port attribute.
fn sctp_port_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"a=sctp-port:(\d+)").expect("sctp-port regex is valid"))
}

/// Classify `text` by the first loopback marker it contains, searched in
/// [`LocalhostIndicator::PRECEDENCE`] order (not by position in the text).
pub fn classify_localhost(text: &str) -> LocalhostIndicator {
    LocalhostIndicator::PRECEDENCE
        .into_iter()
        .find(|indicator| text.contains(indicator.needle()))
        .unwrap_or(LocalhostIndicator::None)
}

/// Extract the first port from `text`.
///
/// The ICE `address port` form is tried first, then `a=sctp-port:`. When
/// neither matches the result is [`Port::NotFound`].
pub fn extract_port(text: &str) -> Port {
    if let Some(caps) = ip_port_regex().captures(text) {
        return Port::Found(caps[2].to_string());
    }
    if let Some(caps) = sctp_port_regex().captures(text) {
        return Port::Found(caps[1].to_string());
    }
    Port::NotFound
}

/// Extract every port in `text`: all ICE `address port` matches in order,
/// followed by all `a=sctp-port:` matches. Empty when nothing matched.
///
/// A full SDP body carries one candidate line per gathered address, so this
/// is what post-processing uses rather than [`extract_port`].
pub fn extract_ports(text: &str) -> Vec<Port> {
    ip_port_regex()
        .captures_iter(text)
        .map(|caps| Port::Found(caps[2].to_string()))
        .chain(
            sctp_port_regex()
                .captures_iter(text)
                .map(|caps| Port::Found(caps[1].to_string())),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_v4_wins_over_everything() {
        let inputs = [
            "candidate:1 1 udp 1 127.0.0.1 9000 typ host",
            "::1 then 127.0.0.1",
            "localhost 0.0.0.0 ::1 127.0.0.1",
            "c=IN IP4 0.0.0.0\r\na=candidate:1 1 udp 1 127.0.0.1 1 typ host",
        ];
        for input in inputs {
            assert_eq!(classify_localhost(input), LocalhostIndicator::LoopbackV4, "{}", input);
        }
    }

    #[test]
    fn test_precedence_order() {
        assert_eq!(classify_localhost("fe80::1 and localhost"), LocalhostIndicator::LoopbackV6);
        assert_eq!(classify_localhost("http://localhost:0.0.0.0"), LocalhostIndicator::HostnameLocalhost);
        assert_eq!(classify_localhost("c=IN IP4 0.0.0.0"), LocalhostIndicator::UnspecifiedV4);
        assert_eq!(
            classify_localhost("candidate:1 1 UDP 2122260223 192.168.1.5 54321 typ host"),
            LocalhostIndicator::None
        );
        assert_eq!(classify_localhost(""), LocalhostIndicator::None);
    }

    #[test]
    fn test_ice_candidate_port() {
        let port = extract_port("candidate:1 1 UDP 2122260223 192.168.1.5 54321 typ host");
        assert_eq!(port, Port::Found("54321".into()));
    }

    #[test]
    fn test_sctp_port() {
        assert_eq!(extract_port("a=sctp-port:5000"), Port::Found("5000".into()));
    }

    #[test]
    fn test_ice_pattern_takes_priority_over_sctp() {
        let sdp = "a=sctp-port:5000\r\na=candidate:1 1 udp 1 10.0.0.2 6001 typ host\r\n";
        assert_eq!(extract_port(sdp), Port::Found("6001".into()));
    }

    #[test]
    fn test_no_port_is_sentinel() {
        for input in ["", "candidate:1 1 udp 1 fe80::1 typ host", "a=sctp-port:", "1.2.3 4"] {
            assert_eq!(extract_port(input), Port::NotFound, "{}", input);
        }
    }

    #[test]
    fn test_extract_all_ports() {
        let sdp = "a=candidate:1 1 udp 1 127.0.0.1 3000 typ host\r\n\
                   a=candidate:2 1 tcp 1 127.0.0.1 3001 typ host\r\n\
                   a=sctp-port:5000\r\n";
        let ports: Vec<String> = extract_ports(sdp).iter().map(|p| p.to_string()).collect();
        assert_eq!(ports, vec!["3000", "3001", "5000"]);
        assert!(extract_ports("nothing here").is_empty());
    }
}
