//! WFD body parameter parsing/building: the `key: value\r\n` pairs carried
//! in `GET_PARAMETER`/`SET_PARAMETER` bodies, plus the `NegotiatedParams`
//! record that survives the M3/M4/M6 round trip (mirrors
//! `WifiDisplaySource.h`'s member fields, needed to actually drive the
//! handshake even though it isn't part of the wire format itself).
use std::collections::BTreeMap;

pub const WFD_VIDEO_FORMATS: &str = "wfd_video_formats";
pub const WFD_AUDIO_CODECS: &str = "wfd_audio_codecs";
pub const WFD_CLIENT_RTP_PORTS: &str = "wfd_client_rtp_ports";
pub const WFD_CONTENT_PROTECTION: &str = "wfd_content_protection";
pub const WFD_PRESENTATION_URL: &str = "wfd_presentation_url";
pub const WFD_TRIGGER_METHOD: &str = "wfd_trigger_method";

/// Parses a `text/parameters` body into its `key: value` pairs, one per
/// line, tolerant of blank lines.
#[must_use]
pub fn parse_parameters(body: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            out.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }
    out
}

/// Renders a `key: value\r\n`-per-line body from an ordered list of pairs
/// (ordering matters for `wfd_client_rtp_ports`-style negotiation logs, so
/// callers pass a `Vec` rather than a map).
#[must_use]
pub fn build_parameters(pairs: &[(&str, String)]) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push_str("\r\n");
    }
    out
}

/// `wfd_client_rtp_ports: RTP/AVP/UDP;unicast <port0> <port1> mode=play`.
/// `port1` is always `0` for unicast in this implementation (WFD doesn't use
/// the RTCP companion port sinks advertise here).
#[must_use]
pub fn format_client_rtp_ports(port0: u16) -> String {
    format!("RTP/AVP/UDP;unicast {port0} 0 mode=play")
}

#[must_use]
pub fn parse_client_rtp_port(value: &str) -> Option<u16> {
    value.split_whitespace().nth(1)?.parse().ok()
}

/// The WFD-negotiated parameter set threaded through M3 (GET_PARAMETER
/// request)/M4 (SET_PARAMETER response) and M6 (SETUP Transport header).
#[derive(Debug, Clone, Default)]
pub struct NegotiatedParams {
    pub video_formats: Option<String>,
    pub audio_codecs: Option<String>,
    pub client_rtp_port: Option<u16>,
    pub content_protection: Option<String>,
    pub presentation_url: Option<String>,
}

impl NegotiatedParams {
    #[must_use]
    pub fn with_presentation_url(mut self, url: impl Into<String>) -> Self {
        self.presentation_url = Some(url.into());
        self
    }
}

impl NegotiatedParams {
    pub fn apply_m3_response(&mut self, params: &BTreeMap<String, String>) {
        if let Some(v) = params.get(WFD_VIDEO_FORMATS) {
            self.video_formats = Some(v.clone());
        }
        if let Some(v) = params.get(WFD_AUDIO_CODECS) {
            self.audio_codecs = Some(v.clone());
        }
        if let Some(v) = params.get(WFD_CLIENT_RTP_PORTS) {
            self.client_rtp_port = parse_client_rtp_port(v);
        }
        if let Some(v) = params.get(WFD_CONTENT_PROTECTION) {
            self.content_protection = Some(v.clone());
        }
    }
}
