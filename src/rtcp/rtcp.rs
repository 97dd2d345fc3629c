use crate::rtcp::packet_type;

use super::{
    bye::Bye, common_header::CommonHeader, generic_nack::GenericNack, packet_type::RtcpPacketType,
    receiver_report::ReceiverReport, rtcp_error::RtcpError, sdes::Sdes, sender_report::SenderReport,
};

/// The union of RTCP packets a sender/sink actually produce or consume: SR,
/// RR, SDES, BYE and generic NACK. Unknown packet types inside a compound
/// datagram are logged and skipped, not treated as fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtcpPacket {
    Sr(SenderReport),
    Rr(ReceiverReport),
    Sdes(Sdes),
    Bye(Bye),
    Nack(GenericNack), // Transport FB (205/FMT=1)
}

impl RtcpPacket {
    /// Decode a *compound* RTCP buffer into individual packets: walks
    /// fixed-length sub-packets, skipping (not erroring on) unrecognized
    /// packet types.
    pub fn decode_compound(buf: &[u8]) -> Result<Vec<RtcpPacket>, RtcpError> {
        let mut out = Vec::new();
        let mut idx = 0usize;
        while idx + 4 <= buf.len() {
            let (hdr, total) = CommonHeader::decode(&buf[idx..])?;
            let pkt_bytes = &buf[idx..idx + total];
            let payload = &pkt_bytes[4..];

            match hdr.pt() {
                packet_type::PT_SR => out.push(SenderReport::decode(&hdr, payload)?),
                packet_type::PT_RR => out.push(ReceiverReport::decode(&hdr, payload)?),
                packet_type::PT_SDES => out.push(Sdes::decode(&hdr, payload)?),
                packet_type::PT_BYE => out.push(Bye::decode(&hdr, payload)?),
                packet_type::PT_RTPFB => out.push(GenericNack::decode(&hdr, payload)?),
                _other => {
                    // Unknown/unsupported RTCP packet type (APP, payload-specific
                    // FB, ...): skip rather than abort the compound decode.
                }
            }
            idx += total;
        }
        if idx != buf.len() {
            // trailing garbage / partial packet
            return Err(RtcpError::TooShort);
        }
        Ok(out)
    }

    /// Encode a compound RTCP packet (concatenation of packets).
    pub fn encode_compound(pkts: &[RtcpPacket]) -> Result<Vec<u8>, RtcpError> {
        let mut out = Vec::new();
        for pkt in pkts {
            encode_one(pkt, &mut out)?;
        }
        Ok(out)
    }
}

fn encode_one(packet: &RtcpPacket, out: &mut Vec<u8>) -> Result<(), RtcpError> {
    match packet {
        RtcpPacket::Sr(sr) => sr.encode_into(out),
        RtcpPacket::Rr(rr) => rr.encode_into(out),
        RtcpPacket::Sdes(sdes) => sdes.encode_into(out),
        RtcpPacket::Bye(bye) => bye.encode_into(out),
        RtcpPacket::Nack(nack) => nack.encode_into(out),
    }
}
