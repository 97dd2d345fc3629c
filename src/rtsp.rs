//! RTSP/1.0 codec and the WFD M1-M16 state machines, grounded on
//! `ParsedMessage.cpp`/`WifiDisplaySource.h`.
pub mod message;
pub mod rtsp_error;
pub mod sink_state;
pub mod source_state;
pub mod timers;
pub mod wfd;

pub use message::Message;
pub use rtsp_error::RtspError;
pub use sink_state::{SinkSession, SinkState};
pub use source_state::{SourceSession, SourceState};
