//! Sink-side RTSP state machine: `UNDEFINED -> CONNECTING -> CONNECTED ->
//! (PAUSED) -> PLAYING`. The sink mirrors the source's M1-M16 round trip
//! from the other side: it answers M1/M3/M4 and is the one that *sends*
//! M6 SETUP and M7 PLAY.
use std::collections::HashMap;

use super::message::Message;
use super::rtsp_error::RtspError;
use super::wfd::{self, NegotiatedParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Undefined,
    Connecting,
    Connected,
    Paused,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingTag {
    Setup,
    Play,
    Pause,
}

pub struct SinkSession {
    state: SinkState,
    next_cseq: u32,
    pending: HashMap<u32, PendingTag>,
    pub negotiated: NegotiatedParams,
    client_port: u16,
}

impl SinkSession {
    #[must_use]
    pub fn new(client_port: u16) -> Self {
        Self {
            state: SinkState::Undefined,
            next_cseq: 1,
            pending: HashMap::new(),
            negotiated: NegotiatedParams::default(),
            client_port,
        }
    }

    #[must_use]
    pub fn state(&self) -> SinkState {
        self.state
    }

    fn alloc_cseq(&mut self) -> u32 {
        let cseq = self.next_cseq;
        self.next_cseq += 1;
        cseq
    }

    /// Handles an incoming request from the source (M1 OPTIONS, M3
    /// GET_PARAMETER, M4 SET_PARAMETER, M5 trigger). Returns the response.
    pub fn on_request(&mut self, msg: &Message) -> Result<Message, RtspError> {
        let method = msg.method().ok_or(RtspError::BadStartLine)?.to_string();
        let cseq = msg.find_i32("cseq").ok_or(RtspError::BadStartLine)?;

        match method.as_str() {
            "OPTIONS" => {
                self.state = SinkState::Connecting;
                let mut resp = Message::response(200, "OK");
                resp.set_header("CSeq", cseq.to_string());
                resp.set_header(
                    "Public",
                    "org.wfa.wfd1.0, GET_PARAMETER, SET_PARAMETER, SETUP, PLAY, PAUSE, TEARDOWN",
                );
                Ok(resp)
            }
            "GET_PARAMETER" => {
                let mut resp = Message::response(200, "OK");
                resp.set_header("CSeq", cseq.to_string());
                resp.set_header("Content-Type", "text/parameters");
                resp.set_body(
                    wfd::build_parameters(&[
                        (wfd::WFD_VIDEO_FORMATS, "00 00 01 02 10 0001 0001 00 0000 0000 00 none none".to_string()),
                        (wfd::WFD_AUDIO_CODECS, "AAC 00000001 00".to_string()),
                        (wfd::WFD_CLIENT_RTP_PORTS, wfd::format_client_rtp_ports(self.client_port)),
                        (wfd::WFD_CONTENT_PROTECTION, "none".to_string()),
                    ])
                    .into_bytes(),
                );
                Ok(resp)
            }
            "SET_PARAMETER" => {
                let body = String::from_utf8_lossy(&msg.body);
                let params = wfd::parse_parameters(&body);
                self.negotiated.apply_m3_response(&params);
                if let Some(url) = params.get(wfd::WFD_PRESENTATION_URL) {
                    self.negotiated.presentation_url = Some(url.clone());
                }
                let mut resp = Message::response(200, "OK");
                resp.set_header("CSeq", cseq.to_string());
                Ok(resp)
            }
            _ => Err(RtspError::MethodNotAllowed(method)),
        }
    }

    /// M6: sends SETUP once the sink has received the M4 trigger naming it.
    pub fn send_setup(&mut self, uri: &str) -> Message {
        let cseq = self.alloc_cseq();
        let mut req = Message::request("SETUP", uri);
        req.set_header("CSeq", cseq.to_string());
        req.set_header(
            "Transport",
            format!("RTP/AVP/UDP;unicast;client_port={}-{}", self.client_port, self.client_port + 1),
        );
        self.pending.insert(cseq, PendingTag::Setup);
        req
    }

    /// M7: sends PLAY once SETUP has completed.
    pub fn send_play(&mut self, uri: &str, session: &str) -> Message {
        let cseq = self.alloc_cseq();
        let mut req = Message::request("PLAY", uri);
        req.set_header("CSeq", cseq.to_string());
        req.set_header("Session", session);
        self.pending.insert(cseq, PendingTag::Play);
        req
    }

    pub fn send_pause(&mut self, uri: &str, session: &str) -> Message {
        let cseq = self.alloc_cseq();
        let mut req = Message::request("PAUSE", uri);
        req.set_header("CSeq", cseq.to_string());
        req.set_header("Session", session);
        self.pending.insert(cseq, PendingTag::Pause);
        req
    }

    pub fn on_response(&mut self, msg: &Message) -> Result<(), RtspError> {
        let cseq = msg.find_i32("cseq").ok_or(RtspError::BadStartLine)? as u32;
        let tag = self
            .pending
            .remove(&cseq)
            .ok_or(RtspError::UnmatchedResponse { cseq })?;
        let status = msg.get_status_code().ok_or(RtspError::BadStartLine)?;
        if status != 200 {
            return Ok(());
        }
        match tag {
            PendingTag::Setup => self.state = SinkState::Connected,
            PendingTag::Play => self.state = SinkState::Playing,
            PendingTag::Pause => self.state = SinkState::Paused,
        }
        Ok(())
    }
}
