use super::{
    common_header::CommonHeader,
    rtcp_error::RtcpError,
    rtcp::RtcpPacket,
};

// RTCP packet types (per RFC3550; feedback per RFC4585)
pub const PT_SR: u8 = 200;
pub const PT_RR: u8 = 201;
pub const PT_SDES: u8 = 202;
pub const PT_BYE: u8 = 203;
pub const PT_RTPFB: u8 = 205; // Transport layer FB (Generic NACK, FMT=1)

pub trait RtcpPacketType {
    /// Encode the full packet, including its CommonHeader.
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), RtcpError>;

    /// Decode the packet from an already-parsed CommonHeader and its payload.
    fn decode(hdr: &CommonHeader, payload: &[u8]) -> Result<RtcpPacket, RtcpError>;
}
