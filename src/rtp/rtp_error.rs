use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtpError {
    TooShort,
    BadVersion(u8),
    CsrcCountMismatch { expected: usize, buf_left: usize },
    HeaderExtensionTooShort,
    HeaderExtensionTooLong,
    PaddingTooShort,
    Invalid,
}

impl fmt::Display for RtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RtpError::*;
        match self {
            TooShort => write!(f, "buffer too short for an RTP header"),
            BadVersion(v) => write!(f, "bad RTP version: {v}"),
            CsrcCountMismatch { expected, buf_left } => write!(
                f,
                "CSRC count {expected} needs {} bytes, only {buf_left} left",
                expected * 4
            ),
            HeaderExtensionTooShort => write!(f, "truncated RTP header extension"),
            HeaderExtensionTooLong => write!(f, "RTP header extension exceeds 65535 words"),
            PaddingTooShort => write!(f, "invalid RTP padding count"),
            Invalid => write!(f, "invalid RTP packet"),
        }
    }
}

impl std::error::Error for RtpError {}
