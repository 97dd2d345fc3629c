//! RTP/RTCP session layer built on top of the `rtp`/`rtcp` wire codecs:
//! the source-side `Sender` (framing, SR cadence, retransmission) and the
//! sink-side `RtpSink` (per-SSRC sequence tracking, jitter, NACK).
pub mod jitter;
pub mod rtp_session_error;
pub mod rtp_sink;
pub mod send_history;
pub mod sender;
pub mod seq_track;

pub use rtp_session_error::RtpSessionError;
pub use rtp_sink::{RtpSink, RtpSinkObserver};
pub use sender::Sender;
