//! HDCP stub oracle (`encrypt(bytesInOut, streamCTR) -> inputCTR`) and the
//! 16-byte HDCP private-data wire layout. The real HDCP key exchange is out
//! of scope here; this module supplies the closest real primitive already in
//! the dependency stack (AES-128-CTR) so the encrypt/packetize path is
//! testable end-to-end without inventing a dependency.
use std::fmt;

use aes::Aes128;
use aes::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;

type Aes128Ctr = Ctr128BE<Aes128>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HdcpError {
    /// The oracle failed to initialize or encrypt. No real failure mode
    /// exists in the stub; kept so callers can exercise the path that treats
    /// an HDCP failure as fatal to the owning playback session.
    EncryptFailed,
}

impl fmt::Display for HdcpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HdcpError::EncryptFailed => write!(f, "HDCP encrypt failed"),
        }
    }
}

impl std::error::Error for HdcpError {}

/// The HDCP crypto oracle's narrow seam: encrypts a byte range in place
/// keyed by the caller's stream counter, returning the oracle's own input
/// counter for that call (folded into the wire-visible private data).
pub trait HdcpOracle: Send {
    fn encrypt(&mut self, bytes_in_out: &mut [u8], stream_ctr: u32) -> Result<u64, HdcpError>;
}

/// AES-128-CTR stand-in for the real HDCP cipher. Serializing calls is the
/// caller's responsibility (only one encrypt in flight per session); this
/// struct itself holds no lock, it's wrapped in `Arc<Mutex<_>>` by its
/// owning playback session.
pub struct StubOracle {
    key: [u8; 16],
    input_ctr: u64,
}

impl StubOracle {
    #[must_use]
    pub fn new(key: [u8; 16]) -> Self {
        Self { key, input_ctr: 0 }
    }
}

impl HdcpOracle for StubOracle {
    fn encrypt(&mut self, bytes_in_out: &mut [u8], stream_ctr: u32) -> Result<u64, HdcpError> {
        let input_ctr = self.input_ctr;
        self.input_ctr = self.input_ctr.wrapping_add(1);

        let mut iv = [0u8; 16];
        iv[0..8].copy_from_slice(&input_ctr.to_be_bytes());
        iv[8..12].copy_from_slice(&stream_ctr.to_be_bytes());

        let mut cipher = Aes128Ctr::new((&self.key).into(), (&iv).into());
        cipher.apply_keystream(bytes_in_out);
        Ok(input_ctr)
    }
}

/// Builds the 16-byte `HDCP_private_data` block carried unchanged to the
/// wire: 13 reserved bits, a 32-bit stream counter split 2/15/15 with a
/// marker bit after each chunk, 11 reserved bits, then a 64-bit input
/// counter split 4/15/15/15/15 with a marker bit after each chunk. Total:
/// 128 bits.
#[must_use]
pub fn build_private_data(stream_ctr: u32, input_ctr: u64) -> [u8; 16] {
    let mut acc: u128 = 0;
    let mut push = |value: u128, bits: u32| {
        acc = (acc << bits) | (value & ((1u128 << bits) - 1));
    };

    push(0, 13); // reserved
    push(u128::from((stream_ctr >> 30) & 0x3), 2);
    push(1, 1); // marker
    push(u128::from((stream_ctr >> 15) & 0x7FFF), 15);
    push(1, 1); // marker
    push(u128::from(stream_ctr & 0x7FFF), 15);
    push(1, 1); // marker

    push(0, 11); // reserved
    push(u128::from((input_ctr >> 60) & 0xF), 4);
    push(1, 1); // marker
    push(u128::from((input_ctr >> 45) & 0x7FFF), 15);
    push(1, 1); // marker
    push(u128::from((input_ctr >> 30) & 0x7FFF), 15);
    push(1, 1); // marker
    push(u128::from((input_ctr >> 15) & 0x7FFF), 15);
    push(1, 1); // marker
    push(u128::from(input_ctr & 0x7FFF), 15);
    push(1, 1); // marker

    acc.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_oracle_round_trips_via_matching_counters() {
        let mut enc = StubOracle::new([0x11; 16]);
        let mut dec = StubOracle::new([0x11; 16]);

        let mut data = b"hello wfd payload!".to_vec();
        let original = data.clone();
        let input_ctr_enc = enc.encrypt(&mut data, 7).unwrap();
        assert_ne!(data, original);

        let input_ctr_dec = dec.encrypt(&mut data, 7).unwrap();
        assert_eq!(input_ctr_enc, input_ctr_dec);
        assert_eq!(data, original);
    }

    #[test]
    fn stub_oracle_input_counter_increments() {
        let mut oracle = StubOracle::new([0x22; 16]);
        let mut buf = [0u8; 4];
        let a = oracle.encrypt(&mut buf, 1).unwrap();
        let b = oracle.encrypt(&mut buf, 1).unwrap();
        assert_eq!(b, a + 1);
    }

    #[test]
    fn private_data_has_exact_marker_bit_pattern() {
        // stream_ctr=0, input_ctr=0: every marker bit set, all else zero.
        let bytes = build_private_data(0, 0);
        // byte layout, MSB first: 13 reserved + 2 stream-high bits fill
        // byte0 and the top 3 bits of byte1; marker is bit index 15 (0-based
        // from MSB) i.e. the LSB of byte1.
        assert_eq!(bytes[0], 0x00);
        assert_eq!(bytes[1] & 0x01, 1); // first marker bit
        // Total popcount of markers (7 marker bits set, everything else 0
        // when both counters are 0) -- verifies bit positions independently
        // of a full manual re-derivation.
        let total_ones: u32 = bytes.iter().map(|b| b.count_ones()).sum();
        assert_eq!(total_ones, 7);
    }

    #[test]
    fn private_data_carries_counters_losslessly() {
        let stream_ctr = 0xDEAD_BEEFu32 & 0x3FFF_FFFF; // fits the 32-bit field (top 2 bits used)
        let input_ctr = 0x0123_4567_89AB_CDEFu64 & 0x0FFF_FFFF_FFFF_FFFF; // fits 60 bits + 4-bit high chunk
        let bytes = build_private_data(stream_ctr, input_ctr);

        // Re-extract with the same bit layout and confirm round-trip.
        let acc = u128::from_be_bytes(bytes);
        let mut cursor = 128u32;
        let mut take = |bits: u32| {
            cursor -= bits;
            ((acc >> cursor) & ((1u128 << bits) - 1)) as u64
        };

        let _reserved1 = take(13);
        let stream_high = take(2);
        let _m1 = take(1);
        let stream_mid = take(15);
        let _m2 = take(1);
        let stream_low = take(15);
        let _m3 = take(1);
        let _reserved2 = take(11);
        let input_high = take(4);
        let _m4 = take(1);
        let c1 = take(15);
        let _m5 = take(1);
        let c2 = take(15);
        let _m6 = take(1);
        let c3 = take(15);
        let _m7 = take(1);
        let c4 = take(15);
        let _m8 = take(1);

        let rebuilt_stream = (stream_high << 30) | (stream_mid << 15) | stream_low;
        let rebuilt_input = (input_high << 60) | (c1 << 45) | (c2 << 30) | (c3 << 15) | c4;

        assert_eq!(rebuilt_stream as u32, stream_ctr);
        assert_eq!(rebuilt_input, input_ctr);
    }
}
