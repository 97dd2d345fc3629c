//! MPEG2 Transport Stream packetization: PAT/PMT/PES framing, CRC32, and
//! per-PID continuity counters, grounded on `TSPacketizer.h`.
pub mod adaptation;
pub mod config;
pub mod crc32;
pub mod pat_pmt;
pub mod packetizer;
pub mod pes;
pub mod ts_error;

pub use packetizer::{Codec, TsPacketizer};
pub use ts_error::TsError;
