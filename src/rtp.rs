//! RTP packet model and wire codec (RFC 3550 §5). Session-level concerns
//! (sequence tracking, jitter, retransmission) live in `rtp_session`.
pub mod config;
pub mod rtp_error;
pub mod rtp_header;
pub mod rtp_header_extension;
pub mod rtp_packet;
pub mod time;

pub use rtp_error::RtpError;
pub use rtp_header::RtpHeader;
pub use rtp_header_extension::RtpHeaderExtension;
pub use rtp_packet::RtpPacket;
