use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtspError {
    /// More bytes are needed before the message can be parsed (headers or
    /// body incomplete); not fatal, the caller should read more and retry.
    Incomplete,
    /// A header line had no colon and wasn't a fold continuation.
    MalformedHeader,
    /// `Content-Length` didn't parse as a non-negative integer.
    BadContentLength,
    /// The request/status line was empty or malformed.
    BadStartLine,
    /// A response arrived with no matching `(session, CSeq)` pending request.
    UnmatchedResponse { cseq: u32 },
    /// A request used a method not allowed in the session's current state.
    MethodNotAllowed(String),
    /// The session is in a state that can't handle this request/response.
    WrongState,
}

impl fmt::Display for RtspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RtspError::*;
        match self {
            Incomplete => write!(f, "incomplete RTSP message"),
            MalformedHeader => write!(f, "malformed RTSP header line"),
            BadContentLength => write!(f, "bad Content-Length header"),
            BadStartLine => write!(f, "malformed request/status line"),
            UnmatchedResponse { cseq } => write!(f, "response with no pending request for CSeq {cseq}"),
            MethodNotAllowed(m) => write!(f, "method not allowed in current state: {m}"),
            WrongState => write!(f, "RTSP request received in the wrong session state"),
        }
    }
}

impl std::error::Error for RtspError {}
