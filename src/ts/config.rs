/// 188-byte fixed MPEG2 transport stream packet size (ISO/IEC 13818-1).
pub const TS_PACKET_SIZE: usize = 188;
/// Bytes of payload carried by a TS packet with no adaptation field.
pub const TS_PAYLOAD_SIZE: usize = 184;

pub const PID_PAT: u16 = 0;
pub const PID_PMT: u16 = 0x100;
pub const PID_PCR: u16 = 0x1000;
pub const FIRST_ES_PID: u16 = 0x1011;

pub const STREAM_TYPE_H264: u8 = 0x1b;
pub const STREAM_TYPE_AAC_ADTS: u8 = 0x0f;
pub const STREAM_TYPE_PCM: u8 = 0x81;

pub const PROGRAM_NUMBER: u16 = 1;

/// `TSPacketizer` emission flags, kept as a bitmask to match the original
/// compile-time flag layout.
pub const EMIT_PAT_AND_PMT: u32 = 1;
pub const EMIT_PCR: u32 = 2;
pub const IS_ENCRYPTED: u32 = 4;
pub const PREPEND_SPS_PPS_TO_IDR_FRAMES: u32 = 8;

/// PCR runs at 27MHz; the base field increments at 90kHz (PTS rate).
pub const PCR_EXTENSION_MODULUS: u64 = 300;
pub const PCR_BASE_MODULUS: u64 = 1 << 33;
