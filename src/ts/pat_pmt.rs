//! PAT/PMT section construction, ISO/IEC 13818-1 §2.4.4. One TS packet per
//! table, CRC32 appended per `TSPacketizer::packetize`'s table emission.
use super::config::{PID_PAT, PID_PMT, PROGRAM_NUMBER, TS_PACKET_SIZE};
use super::crc32::crc32_mpeg2;

/// One elementary stream entry as it appears in the PMT.
pub struct EsInfo {
    pub stream_type: u8,
    pub pid: u16,
    /// Present (non-empty) only for an encrypted track: a private
    /// `HDCP_private_data` descriptor tag carried in the PMT entry.
    pub hdcp_descriptor: bool,
}

const HDCP_DESCRIPTOR_TAG: u8 = 0x05; // private "registration_descriptor" slot

fn push_section_with_crc(section: &mut Vec<u8>) {
    let crc = crc32_mpeg2(section);
    section.extend_from_slice(&crc.to_be_bytes());
}

/// Builds one 188-byte PAT TS packet: PID 0, program 1 -> PMT PID.
pub fn build_pat(continuity_counter: u8) -> [u8; TS_PACKET_SIZE] {
    let mut section = Vec::with_capacity(16);
    section.push(0x00); // table_id: program_association_section
    // section_length filled below, placeholder
    section.push(0x00);
    section.push(0x00);
    section.extend_from_slice(&0x0001u16.to_be_bytes()); // transport_stream_id
    section.push(0xC1); // reserved(2)=11 version(5)=0 current_next=1
    section.push(0x00); // section_number
    section.push(0x00); // last_section_number
    section.extend_from_slice(&PROGRAM_NUMBER.to_be_bytes());
    section.extend_from_slice(&(0xE000 | PID_PMT).to_be_bytes());

    // section_length = bytes after the length field up to and including CRC.
    let section_length = (section.len() - 3 + 4) as u16;
    section[1] = 0xB0 | ((section_length >> 8) as u8 & 0x0F);
    section[2] = (section_length & 0xFF) as u8;

    push_section_with_crc(&mut section);
    build_ts_packet(PID_PAT, &section, continuity_counter)
}

/// Builds one 188-byte PMT TS packet describing every registered stream.
pub fn build_pmt(streams: &[EsInfo], continuity_counter: u8) -> [u8; TS_PACKET_SIZE] {
    let mut section = Vec::with_capacity(32);
    section.push(0x02); // table_id: TS_program_map_section
    section.push(0x00);
    section.push(0x00);
    section.extend_from_slice(&PROGRAM_NUMBER.to_be_bytes());
    section.push(0xC1);
    section.push(0x00);
    section.push(0x00);
    section.extend_from_slice(&(0xE000 | super::config::PID_PCR).to_be_bytes()); // PCR_PID
    section.extend_from_slice(&0xF000u16.to_be_bytes()); // program_info_length = 0

    for es in streams {
        section.push(es.stream_type);
        section.extend_from_slice(&(0xE000 | es.pid).to_be_bytes());
        if es.hdcp_descriptor {
            let desc_len = 1u16;
            section.extend_from_slice(&(0xF000 | desc_len).to_be_bytes());
            section.push(HDCP_DESCRIPTOR_TAG);
        } else {
            section.extend_from_slice(&0xF000u16.to_be_bytes());
        }
    }

    let section_length = (section.len() - 3 + 4) as u16;
    section[1] = 0xB0 | ((section_length >> 8) as u8 & 0x0F);
    section[2] = (section_length & 0xFF) as u8;

    push_section_with_crc(&mut section);
    build_ts_packet(PID_PMT, &section, continuity_counter)
}

/// Wraps one PSI section (already CRC-terminated) into a single 188-byte TS
/// packet with a pointer_field of 0 and zero-padding to fill the packet.
fn build_ts_packet(pid: u16, section: &[u8], continuity_counter: u8) -> [u8; TS_PACKET_SIZE] {
    let mut packet = [0xFFu8; TS_PACKET_SIZE];
    packet[0] = 0x47;
    packet[1] = 0x40 | ((pid >> 8) as u8 & 0x1F); // PUSI=1
    packet[2] = (pid & 0xFF) as u8;
    packet[3] = 0x10 | (continuity_counter & 0x0F); // no adaptation field, payload only

    packet[4] = 0x00; // pointer_field
    let body_start = 5;
    let body_end = body_start + section.len();
    assert!(body_end <= TS_PACKET_SIZE, "PSI section too large for one TS packet");
    packet[body_start..body_end].copy_from_slice(section);
    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pat_has_valid_header_and_crc() {
        let pkt = build_pat(0);
        assert_eq!(pkt[0], 0x47);
        assert_eq!(u16::from_be_bytes([pkt[1] & 0x1F, pkt[2]]), PID_PAT);
        // Section starts at offset 5 (after pointer_field); verify CRC.
        let section_length = (((pkt[6] & 0x0F) as usize) << 8) | pkt[7] as usize;
        let section_end = 6 + section_length; // 3 header bytes + section_length
        let section = &pkt[5..section_end];
        let (body, crc_bytes) = section.split_at(section.len() - 4);
        let expected = u32::from_be_bytes(crc_bytes.try_into().unwrap());
        assert_eq!(crc32_mpeg2(body), expected);
    }

    #[test]
    fn pmt_lists_both_streams() {
        let streams = vec![
            EsInfo { stream_type: 0x1b, pid: 0x1011, hdcp_descriptor: false },
            EsInfo { stream_type: 0x0f, pid: 0x1012, hdcp_descriptor: false },
        ];
        let pkt = build_pmt(&streams, 0);
        assert_eq!(u16::from_be_bytes([pkt[1] & 0x1F, pkt[2]]), PID_PMT);
        // stream_type bytes appear somewhere in the packet payload.
        assert!(pkt.windows(3).any(|w| w[0] == 0x1b));
        assert!(pkt.windows(3).any(|w| w[0] == 0x0f));
    }
}
