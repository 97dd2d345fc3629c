//! Source-side RTSP state machine driving the WFD M1-M16 handshake, grounded
//! on `WifiDisplaySource.h`'s `State` enum and CSeq-keyed response
//! dispatch table.
use std::collections::HashMap;
use std::net::UdpSocket;

use super::message::Message;
use super::rtsp_error::RtspError;
use super::wfd::{self, NegotiatedParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Initialized,
    AwaitingClientConnection,
    AwaitingClientSetup,
    AwaitingClientPlay,
    AboutToPlay,
    Playing,
    AwaitingClientTeardown,
    Stopping,
    Stopped,
}

/// What triggered an outstanding request, keyed by its CSeq. Mirrors the
/// original `(sessionID, CSeq) -> function pointer` response dispatch
/// table, expressed here as plain data rather than a callback table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingTag {
    M1Options,
    M3GetParameter,
    M4SetParameter,
}

pub struct SourceSession {
    state: SourceState,
    next_cseq: u32,
    pending: HashMap<u32, PendingTag>,
    pub negotiated: NegotiatedParams,
    pub server_ports: Option<(u16, u16)>,
    presentation_url: String,
}

impl SourceSession {
    #[must_use]
    pub fn new(presentation_url: impl Into<String>) -> Self {
        Self {
            state: SourceState::Initialized,
            next_cseq: 1,
            pending: HashMap::new(),
            negotiated: NegotiatedParams::default(),
            server_ports: None,
            presentation_url: presentation_url.into(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SourceState {
        self.state
    }

    fn alloc_cseq(&mut self) -> u32 {
        let cseq = self.next_cseq;
        self.next_cseq += 1;
        cseq
    }

    /// M1: sends OPTIONS, advertising the WFD extension. Moves the source
    /// into `AwaitingClientConnection`.
    pub fn start(&mut self) -> Message {
        let cseq = self.alloc_cseq();
        let mut msg = Message::request("OPTIONS", "*");
        msg.set_header("CSeq", cseq.to_string());
        msg.set_header("Require", "org.wfa.wfd1.0");
        self.pending.insert(cseq, PendingTag::M1Options);
        self.state = SourceState::AwaitingClientConnection;
        msg
    }

    /// Feeds a response to a previously sent request. Returns the next
    /// request to send, if the handshake has a follow-up step.
    pub fn on_response(&mut self, msg: &Message) -> Result<Option<Message>, RtspError> {
        let cseq = msg.find_i32("cseq").ok_or(RtspError::BadStartLine)? as u32;
        let tag = self
            .pending
            .remove(&cseq)
            .ok_or(RtspError::UnmatchedResponse { cseq })?;
        let status = msg.get_status_code().ok_or(RtspError::BadStartLine)?;

        match tag {
            PendingTag::M1Options => {
                if status != 200 {
                    return Ok(None);
                }
                let cseq = self.alloc_cseq();
                let mut req = Message::request("GET_PARAMETER", &self.presentation_url);
                req.set_header("CSeq", cseq.to_string());
                req.set_header("Content-Type", "text/parameters");
                req.set_body(
                    wfd::build_parameters(&[
                        (wfd::WFD_VIDEO_FORMATS, String::new()),
                        (wfd::WFD_AUDIO_CODECS, String::new()),
                        (wfd::WFD_CLIENT_RTP_PORTS, String::new()),
                        (wfd::WFD_CONTENT_PROTECTION, String::new()),
                    ])
                    .into_bytes(),
                );
                self.pending.insert(cseq, PendingTag::M3GetParameter);
                Ok(Some(req))
            }
            PendingTag::M3GetParameter => {
                if status == 200 {
                    let body = String::from_utf8_lossy(&msg.body);
                    let params = wfd::parse_parameters(&body);
                    self.negotiated.apply_m3_response(&params);
                }
                let cseq = self.alloc_cseq();
                let mut req = Message::request("SET_PARAMETER", &self.presentation_url);
                req.set_header("CSeq", cseq.to_string());
                req.set_header("Content-Type", "text/parameters");
                req.set_body(
                    wfd::build_parameters(&[(
                        wfd::WFD_PRESENTATION_URL,
                        self.presentation_url.clone(),
                    )])
                    .into_bytes(),
                );
                self.pending.insert(cseq, PendingTag::M4SetParameter);
                Ok(Some(req))
            }
            PendingTag::M4SetParameter => {
                self.state = SourceState::AwaitingClientSetup;
                Ok(None)
            }
        }
    }

    /// Feeds an incoming request from the sink (M6 SETUP, M7 PLAY, M8..M15
    /// TEARDOWN/PAUSE). Returns the response to send.
    pub fn on_request(&mut self, msg: &Message) -> Result<Message, RtspError> {
        let method = msg.method().ok_or(RtspError::BadStartLine)?.to_string();
        let cseq = msg.find_i32("cseq").ok_or(RtspError::BadStartLine)?;
        match method.as_str() {
            "SETUP" => self.handle_setup(msg, cseq),
            "PLAY" => self.handle_play(cseq),
            "TEARDOWN" => self.handle_teardown(cseq),
            "PAUSE" => self.handle_pause(cseq),
            _ => Err(RtspError::MethodNotAllowed(method)),
        }
    }

    fn handle_setup(&mut self, msg: &Message, cseq: i32) -> Result<Message, RtspError> {
        if self.state != SourceState::AwaitingClientSetup {
            return Err(RtspError::WrongState);
        }
        let transport = msg.find_string("transport").ok_or(RtspError::BadStartLine)?;
        let client_port = Message::get_attribute(transport, "client_port")
            .and_then(|s| s.split('-').next())
            .and_then(|s| s.parse::<u16>().ok());
        if let Some(port) = client_port {
            self.negotiated.client_rtp_port = Some(port);
        }

        let ports = allocate_server_port_pair(15550).ok_or(RtspError::WrongState)?;
        self.server_ports = Some(ports);
        self.state = SourceState::AwaitingClientPlay;

        let mut resp = Message::response(200, "OK");
        resp.set_header("CSeq", cseq.to_string());
        resp.set_header("Session", "12345678;timeout=30");
        resp.set_header(
            "Transport",
            format!("RTP/AVP/UDP;unicast;server_port={}-{}", ports.0, ports.1),
        );
        Ok(resp)
    }

    fn handle_play(&mut self, cseq: i32) -> Result<Message, RtspError> {
        if self.state != SourceState::AwaitingClientPlay {
            return Err(RtspError::WrongState);
        }
        self.state = SourceState::AboutToPlay;
        let mut resp = Message::response(200, "OK");
        resp.set_header("CSeq", cseq.to_string());
        resp.set_header("Session", "12345678");
        Ok(resp)
    }

    /// Marks playback as actually started once the `PlaybackSession` has
    /// reported its first packets sent (driven by the owning supervisor,
    /// not by the RTSP message itself).
    pub fn mark_playing(&mut self) {
        if self.state == SourceState::AboutToPlay {
            self.state = SourceState::Playing;
        }
    }

    fn handle_teardown(&mut self, cseq: i32) -> Result<Message, RtspError> {
        self.state = SourceState::AwaitingClientTeardown;
        let mut resp = Message::response(200, "OK");
        resp.set_header("CSeq", cseq.to_string());
        Ok(resp)
    }

    fn handle_pause(&mut self, cseq: i32) -> Result<Message, RtspError> {
        if self.state != SourceState::Playing {
            return Err(RtspError::WrongState);
        }
        let mut resp = Message::response(200, "OK");
        resp.set_header("CSeq", cseq.to_string());
        Ok(resp)
    }

    /// TEARDOWN grace elapsed (2 s): force disconnect.
    pub fn force_stop(&mut self) {
        self.state = SourceState::Stopping;
    }
}

/// Tries binding an RTP/RTCP UDP port pair starting at `base`, stepping by 2
/// until a free pair is found. Sockets are dropped immediately; the real
/// bind happens in `net_session` once the session is actually established.
fn allocate_server_port_pair(base: u16) -> Option<(u16, u16)> {
    for k in 0..64u16 {
        let port0 = base.checked_add(k.checked_mul(2)?)?;
        let port1 = port0.checked_add(1)?;
        if UdpSocket::bind(("127.0.0.1", port0)).is_ok() && UdpSocket::bind(("127.0.0.1", port1)).is_ok() {
            return Some((port0, port1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s7_m_sequence_drives_source_to_awaiting_play() {
        let mut source = SourceSession::new("rtsp://localhost/wfd1.0");
        assert_eq!(source.state(), SourceState::Initialized);

        let m1 = source.start();
        assert_eq!(source.state(), SourceState::AwaitingClientConnection);
        assert_eq!(m1.method(), Some("OPTIONS"));

        let mut m1_resp = Message::response(200, "OK");
        m1_resp.set_header("CSeq", m1.find_i32("cseq").unwrap().to_string());
        let m3 = source.on_response(&m1_resp).unwrap().unwrap();
        assert_eq!(m3.method(), Some("GET_PARAMETER"));

        let mut m3_resp = Message::response(200, "OK");
        m3_resp.set_header("CSeq", m3.find_i32("cseq").unwrap().to_string());
        m3_resp.set_body(
            wfd::build_parameters(&[(
                wfd::WFD_CLIENT_RTP_PORTS,
                wfd::format_client_rtp_ports(19000),
            )])
            .into_bytes(),
        );
        let m4 = source.on_response(&m3_resp).unwrap().unwrap();
        assert_eq!(m4.method(), Some("SET_PARAMETER"));
        assert_eq!(source.negotiated.client_rtp_port, Some(19000));

        let mut m4_resp = Message::response(200, "OK");
        m4_resp.set_header("CSeq", m4.find_i32("cseq").unwrap().to_string());
        let follow_up = source.on_response(&m4_resp).unwrap();
        assert!(follow_up.is_none());
        assert_eq!(source.state(), SourceState::AwaitingClientSetup);

        let mut m6 = Message::request("SETUP", "rtsp://localhost/wfd1.0/video");
        m6.set_header("CSeq", "5");
        m6.set_header(
            "Transport",
            "RTP/AVP/UDP;unicast;client_port=19000-19001",
        );
        let setup_resp = source.on_request(&m6).unwrap();
        assert_eq!(setup_resp.get_status_code(), Some(200));
        assert!(setup_resp.find_string("session").is_some());
        assert_eq!(source.state(), SourceState::AwaitingClientPlay);
        assert!(source.server_ports.is_some());
    }

    #[test]
    fn unmatched_response_is_an_error() {
        let mut source = SourceSession::new("rtsp://localhost/wfd1.0");
        let mut resp = Message::response(200, "OK");
        resp.set_header("CSeq", "999");
        assert_eq!(
            source.on_response(&resp),
            Err(RtspError::UnmatchedResponse { cseq: 999 })
        );
    }

    #[test]
    fn setup_in_wrong_state_is_rejected() {
        let mut source = SourceSession::new("rtsp://localhost/wfd1.0");
        let mut m6 = Message::request("SETUP", "rtsp://localhost/wfd1.0");
        m6.set_header("CSeq", "1");
        m6.set_header("Transport", "RTP/AVP/UDP;unicast;client_port=19000-19001");
        assert_eq!(source.on_request(&m6), Err(RtspError::WrongState));
    }
}
