use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtcpError {
    TooShort,
    BadVersion(u8),
    LengthMismatch,
    UnknownPacketType(u8),
    Truncated,
    Invalid,
    SdesItemTooShort,
    SdesItemTooLong,
    TooManyReportBlocks(usize),
    TooManyByeSources(usize),
}

impl fmt::Display for RtcpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RtcpError::*;
        match self {
            TooShort => write!(f, "buffer too short"),
            BadVersion(v) => write!(f, "bad RTCP version: {v}"),
            LengthMismatch => write!(f, "rendered length does not match header length"),
            UnknownPacketType(pt) => write!(f, "unknown RTCP packet type: {pt}"),
            Truncated => write!(f, "truncated RTCP structure"),
            Invalid => write!(f, "invalid RTCP packet"),
            SdesItemTooShort => write!(f, "SDES item too short"),
            SdesItemTooLong => write!(f, "SDES item payload exceeds 255 bytes"),
            TooManyReportBlocks(n) => write!(f, "too many report blocks for SR/RR: {n}"),
            TooManyByeSources(n) => write!(f, "too many sources for BYE: {n}"),
        }
    }
}
impl std::error::Error for RtcpError {}
