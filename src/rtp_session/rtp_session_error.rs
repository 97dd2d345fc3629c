use crate::rtcp::rtcp_error::RtcpError;
use crate::rtp::rtp_error::RtpError;
use std::fmt;
use std::sync::PoisonError;

#[derive(Debug)]
pub enum RtpSessionError {
    Rtcp(RtcpError),
    Rtp(RtpError),
    /// A NACK referenced a seq already evicted from send history. Not fatal:
    /// older NACKs are silently dropped, this variant exists only so callers
    /// can route it to bandwidth-trace logging instead of retransmitting.
    HistoryMiss { seq: u16 },
    /// The owning mutex was poisoned by a panicking thread.
    Poisoned,
    /// No free UDP port pair could be bound starting at the configured base.
    NoFreePort { base: u16 },
}

impl fmt::Display for RtpSessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RtpSessionError::*;
        match self {
            Rtcp(e) => write!(f, "RTCP error: {e}"),
            Rtp(e) => write!(f, "RTP error: {e}"),
            HistoryMiss { seq } => write!(f, "NACK for seq {seq} not in send history"),
            Poisoned => write!(f, "rtp session mutex poisoned"),
            NoFreePort { base } => write!(f, "no free RTP/RTCP port pair from {base}"),
        }
    }
}

impl std::error::Error for RtpSessionError {}

impl From<RtcpError> for RtpSessionError {
    fn from(e: RtcpError) -> Self {
        Self::Rtcp(e)
    }
}

impl From<RtpError> for RtpSessionError {
    fn from(e: RtpError) -> Self {
        Self::Rtp(e)
    }
}

impl<T> From<PoisonError<T>> for RtpSessionError {
    fn from(_: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}
