//! TS adaptation field construction: PCR insertion on the first packet of a
//! PES, and end-of-PES stuffing so the final packet fills exactly 188 bytes.
use super::config::{PCR_BASE_MODULUS, PCR_EXTENSION_MODULUS, TS_PACKET_SIZE};

/// Encodes a 90kHz PTS/PCR value into the 6-byte `program_clock_reference`
/// field: 33-bit base (90kHz), 6 reserved bits, 9-bit extension (27MHz).
/// `pts_90khz * 300` is the nominal PCR since the base runs at 90kHz and the
/// extension counts 27MHz ticks within one base tick.
pub fn encode_pcr(pts_90khz: u64) -> [u8; 6] {
    let base = pts_90khz % PCR_BASE_MODULUS;
    let extension = 0u64; // extension kept at 0; base alone gives ms precision
    let _ = PCR_EXTENSION_MODULUS;
    let mut out = [0u8; 6];
    out[0] = (base >> 25) as u8;
    out[1] = (base >> 17) as u8;
    out[2] = (base >> 9) as u8;
    out[3] = (base >> 1) as u8;
    out[4] = (((base & 1) as u8) << 7) | 0x7E | ((extension >> 8) as u8 & 0x01);
    out[5] = extension as u8;
    out
}

/// Builds the adaptation field + payload for the first TS packet of a PES,
/// optionally carrying a PCR. `payload` is truncated to whatever fits after
/// the adaptation field; the caller advances its cursor by the returned
/// consumed-byte count.
pub fn first_packet_with_pcr(
    pid: u16,
    pusi: bool,
    continuity_counter: u8,
    pcr_90khz: Option<u64>,
    payload: &[u8],
) -> ([u8; TS_PACKET_SIZE], usize) {
    let mut packet = [0xFFu8; TS_PACKET_SIZE];
    packet[0] = 0x47;
    packet[1] = (if pusi { 0x40 } else { 0x00 }) | ((pid >> 8) as u8 & 0x1F);
    packet[2] = (pid & 0xFF) as u8;

    match pcr_90khz {
        Some(pcr) => {
            // adaptation_field_control = 0b11 (adaptation + payload)
            packet[3] = 0x30 | (continuity_counter & 0x0F);
            let adaptation_length = 7u8; // flags byte + 6-byte PCR
            packet[4] = adaptation_length;
            packet[5] = 0x10; // PCR_flag=1, others 0
            packet[6..12].copy_from_slice(&encode_pcr(pcr));
            let header_len = 5 + adaptation_length as usize;
            let avail = TS_PACKET_SIZE - header_len;
            let take = payload.len().min(avail);
            packet[header_len..header_len + take].copy_from_slice(&payload[..take]);
            if take < avail {
                // Shouldn't happen on the first packet of a multi-packet PES
                // (the caller always supplies >= avail bytes when more
                // packets follow); if this is also the last packet, the
                // caller pads via `pad_last_packet` instead.
            }
            (packet, take)
        }
        None => {
            packet[3] = 0x10 | (continuity_counter & 0x0F); // payload only
            let avail = TS_PACKET_SIZE - 4;
            let take = payload.len().min(avail);
            packet[4..4 + take].copy_from_slice(&payload[..take]);
            (packet, take)
        }
    }
}

/// Builds a plain payload-only TS packet (no adaptation field), used for
/// every packet of a PES after the first.
pub fn plain_packet(
    pid: u16,
    continuity_counter: u8,
    payload: &[u8],
) -> ([u8; TS_PACKET_SIZE], usize) {
    let mut packet = [0xFFu8; TS_PACKET_SIZE];
    packet[0] = 0x47;
    packet[1] = (pid >> 8) as u8 & 0x1F;
    packet[2] = (pid & 0xFF) as u8;
    packet[3] = 0x10 | (continuity_counter & 0x0F);
    let avail = TS_PACKET_SIZE - 4;
    let take = payload.len().min(avail);
    packet[4..4 + take].copy_from_slice(&payload[..take]);
    (packet, take)
}

/// Builds the final TS packet of a PES: payload followed by a stuffed
/// adaptation field sized to make the packet exactly 188 bytes.
pub fn last_packet_padded(pid: u16, continuity_counter: u8, payload: &[u8]) -> [u8; TS_PACKET_SIZE] {
    assert!(payload.len() <= TS_PACKET_SIZE - 4, "payload too large for one TS packet");
    let mut packet = [0xFFu8; TS_PACKET_SIZE];
    packet[0] = 0x47;
    packet[1] = (pid >> 8) as u8 & 0x1F;
    packet[2] = (pid & 0xFF) as u8;

    if payload.is_empty() {
        packet[3] = 0x20 | (continuity_counter & 0x0F); // adaptation only
        packet[4] = (TS_PACKET_SIZE - 5) as u8;
        if packet[4] > 0 {
            packet[5] = 0x00; // no flags set
            for b in &mut packet[6..] {
                *b = 0xFF;
            }
        }
        return packet;
    }

    packet[3] = 0x30 | (continuity_counter & 0x0F); // adaptation + payload
    let stuffing_total = TS_PACKET_SIZE - 4 - payload.len();
    // adaptation_field_length counts everything after its own length byte.
    let adaptation_length = stuffing_total - 1;
    packet[4] = adaptation_length as u8;
    if adaptation_length > 0 {
        packet[5] = 0x00; // flags byte, no optional fields
        for b in &mut packet[6..5 + adaptation_length] {
            *b = 0xFF;
        }
    }
    let payload_start = 5 + adaptation_length;
    packet[payload_start..].copy_from_slice(payload);
    packet
}
