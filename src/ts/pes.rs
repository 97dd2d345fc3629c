//! PES (Packetized Elementary Stream) header construction, ISO/IEC 13818-1
//! §2.4.3.6: start code, stream_id, optional length, and a 33-bit PTS split
//! across the header in the standard 5-bit/4-bit/4-bit marker-bit layout.

pub const STREAM_ID_VIDEO: u8 = 0xE0;
pub const STREAM_ID_AUDIO: u8 = 0xC0;

/// Builds a PES header (no trailing payload) for one access unit. `pts_90khz`
/// must fit in 33 bits; `payload_len` is the number of ES bytes that will
/// follow (SPS/PPS + AU), used for `PES_packet_length` when it fits in 16
/// bits (set to 0, meaning "unbounded", once the total reaches 64 KiB).
/// `private_data` carries the 16-byte HDCP private-data block when the
/// track is content-protected; it rides the standard `PES_private_data_flag`
/// extension area.
pub fn build_pes_header(
    stream_id: u8,
    pts_90khz: u64,
    payload_len: usize,
    private_data: Option<&[u8; 16]>,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(36);
    out.extend_from_slice(&[0x00, 0x00, 0x01]); // start code prefix
    out.push(stream_id);

    let pts_field_len = 5usize; // 10xx with PTS only (no DTS)
    let extension_len = private_data.map_or(0, |_| 1 + 16); // flags byte + 16 bytes
    let header_data_len = pts_field_len + extension_len;
    let total_after_length_field = 3 /* flags + header_data_len */ + header_data_len + payload_len;

    let pes_packet_length: u16 = if total_after_length_field >= 0x10000 {
        0
    } else {
        total_after_length_field as u16
    };
    out.extend_from_slice(&pes_packet_length.to_be_bytes());

    out.push(0x80); // '10' marker, no scrambling/priority/alignment/copyright
    let pts_dts_flags = 0x80; // PTS only
    let extension_flag = if private_data.is_some() { 0x01 } else { 0x00 };
    out.push(pts_dts_flags | extension_flag);
    out.push(header_data_len as u8);

    out.extend_from_slice(&encode_pts(0x2, pts_90khz));

    if let Some(data) = private_data {
        out.push(0x80); // PES_extension_flag's PES_private_data_flag=1, rest 0
        out.extend_from_slice(data);
    }
    out
}

/// Encodes a timestamp with the given 4-bit marker prefix ('0010' for PTS
/// only, '0011' for PTS-in-PTS/DTS pair) into the 5-byte layout: prefix(4)
/// + bits[32:30](3) + marker(1), bits[29:15](15) + marker(1), bits[14:0](15)
/// + marker(1).
fn encode_pts(prefix: u8, value_90khz: u64) -> [u8; 5] {
    let v = value_90khz & 0x1_FFFF_FFFF; // 33 bits
    let top = ((v >> 30) & 0x7) as u8;
    let mid = ((v >> 15) & 0x7FFF) as u16;
    let low = (v & 0x7FFF) as u16;

    let mut out = [0u8; 5];
    out[0] = (prefix << 4) | (top << 1) | 1;
    out[1] = (mid >> 7) as u8;
    out[2] = (((mid & 0x7F) as u8) << 1) | 1;
    out[3] = (low >> 7) as u8;
    out[4] = (((low & 0x7F) as u8) << 1) | 1;
    out
}

/// Decodes a 5-byte PTS/DTS field back into a 90kHz timestamp (tests only;
/// production code never needs to parse its own PES output).
#[cfg(test)]
fn decode_pts(bytes: &[u8; 5]) -> u64 {
    let top = u64::from((bytes[0] >> 1) & 0x7);
    let mid = u64::from(bytes[1]) << 7 | u64::from(bytes[2] >> 1);
    let low = u64::from(bytes[3]) << 7 | u64::from(bytes[4] >> 1);
    (top << 30) | (mid << 15) | low
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pts_round_trips() {
        for &pts in &[0u64, 9000, 1 << 32, (1u64 << 33) - 1] {
            let bytes = encode_pts(0x2, pts);
            assert_eq!(decode_pts(&bytes), pts & 0x1_FFFF_FFFF);
            assert_eq!(bytes[0] & 1, 1);
            assert_eq!(bytes[2] & 1, 1);
            assert_eq!(bytes[4] & 1, 1);
        }
    }

    #[test]
    fn header_length_matches_payload_under_64k() {
        let header = build_pes_header(STREAM_ID_VIDEO, 9000, 3000, None);
        let len = u16::from_be_bytes([header[4], header[5]]);
        assert_eq!(len as usize, 3 + 5 + 3000);
    }

    #[test]
    fn header_length_is_zero_when_unbounded() {
        let header = build_pes_header(STREAM_ID_VIDEO, 9000, 100_000, None);
        let len = u16::from_be_bytes([header[4], header[5]]);
        assert_eq!(len, 0);
    }

    #[test]
    fn private_data_extends_header() {
        let private = [0xABu8; 16];
        let header = build_pes_header(STREAM_ID_VIDEO, 9000, 3000, Some(&private));
        assert_eq!(header[7] & 0x01, 0x01); // PES_extension_flag set
        assert_eq!(header[8] as usize, 5 + 17); // header_data_length
        assert_eq!(&header[15..15 + 16], &private);
    }
}
