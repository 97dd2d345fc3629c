//! Wi-Fi Display (Miracast) media pipeline: RTSP M1-M16 handshake, an MPEG2
//! transport-stream source pipeline (capture -> convert -> packetize -> send,
//! with HDCP and retransmission), and an RTP/RTCP receive engine on the sink
//! side (sequence tracking, jitter, reorder, NACK).
//!
//! Session-level concurrency follows a single shape throughout: one thread
//! per worker, draining a bounded channel (see [`looper`]).

/// Ad hoc key=value configuration and the pipeline knobs derived from it.
pub mod config;
/// HDCP stub oracle: the byte-range counter-mode cipher at the media layer.
pub mod hdcp;
/// Non-blocking file-backed logger and the macros built on top of it.
pub mod log;
/// Generic single-threaded cooperative message-handler loop.
pub mod looper;
/// Capture -> encoder pipeline: `MediaPuller`, `Converter`, `RepeaterSource`.
pub mod media_agent;
/// Non-blocking TCP/UDP socket multiplexer shared by RTSP and RTP/RTCP.
pub mod net_session;
/// Per-session lifecycle: `PlaybackSession`, `Track`, interleaving, HDCP wrap.
pub mod playback;
/// Sink-side reorder/NACK scheduling (`TunnelRenderer`-equivalent).
pub mod reorder;
/// RTCP packet parsing and building (SR, RR, SDES, BYE, generic NACK).
pub mod rtcp;
/// RTP packet parsing and building.
pub mod rtp;
/// RTP/RTCP session layer: source-side `Sender`, sink-side `RtpSink`.
pub mod rtp_session;
/// RTSP/1.0 + WFD M1-M16 codec and state machines (source and sink).
pub mod rtsp;
/// In-memory collaborator stand-ins (capture source, encoder, HDCP, display)
/// used to exercise the pipeline end to end without real hardware.
#[cfg(test)]
pub mod testutil;
/// MPEG2 Transport Stream packetization: PAT/PMT/PES, CRC32, continuity.
pub mod ts;
/// Small time/NTP helpers shared across modules.
pub mod util;
