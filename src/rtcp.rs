//! RTCP packet encode/decode: SR, RR, SDES, BYE and the generic NACK (RTPFB
//! FMT=1) feedback packet. Wi-Fi Display RTP traffic never needs APP or
//! payload-specific feedback, so those packet types are not modeled here.
pub mod bye;
pub mod common_header;
pub mod config;
pub mod generic_nack;
pub mod packet_type;
pub mod receiver_report;
pub mod report_block;
#[allow(clippy::module_inception)]
pub mod rtcp;
pub mod rtcp_error;
pub mod sdes;
pub mod sender_info;
pub mod sender_report;

pub use rtcp::RtcpPacket;
