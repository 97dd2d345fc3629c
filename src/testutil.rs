//! In-memory collaborator stand-ins shared by tests that cross module
//! boundaries: a scripted `CaptureSource`, a passthrough `Encoder`, a
//! deterministic `HdcpOracle`, and a `Display` sink that just records what a
//! real playback session would otherwise send out over the wire. None of
//! these model real hardware; they exist so `media_agent`, `playback`, and
//! `rtp_session` can be exercised together without one.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::hdcp::{HdcpError, HdcpOracle};
use crate::media_agent::{CaptureError, CaptureEvent, ConverterError, Encoder, EncodedAccessUnit, RawAccessUnit};

/// Feeds a fixed script of events, then reports idle (`Ok(None)`) forever.
/// Mirrors `media_agent::tests::ScriptedSource`, kept here for reuse by
/// integration-style tests that don't live in `media_agent.rs` itself.
pub struct ScriptedCaptureSource {
    events: VecDeque<CaptureEvent>,
}

impl ScriptedCaptureSource {
    #[must_use]
    pub fn new(events: Vec<CaptureEvent>) -> Self {
        Self { events: events.into() }
    }
}

impl crate::media_agent::CaptureSource for ScriptedCaptureSource {
    fn start(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn read(&mut self, timeout: Duration) -> Result<Option<CaptureEvent>, CaptureError> {
        match self.events.pop_front() {
            Some(e) => Ok(Some(e)),
            None => {
                std::thread::sleep(timeout.min(Duration::from_millis(5)));
                Ok(None)
            }
        }
    }
}

/// Echoes queued input back out as "encoded" output with a one-call-deep
/// input queue, so tests can assert on ordering without a real codec.
/// `request_idr_frame` calls are counted for idempotence assertions.
pub struct PassthroughEncoder {
    free_slot: bool,
    output: VecDeque<EncodedAccessUnit>,
    idr_requests: Arc<Mutex<u32>>,
}

impl PassthroughEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self { free_slot: true, output: VecDeque::new(), idr_requests: Arc::new(Mutex::new(0)) }
    }

    #[must_use]
    pub fn idr_request_count(&self) -> Arc<Mutex<u32>> {
        self.idr_requests.clone()
    }
}

impl Default for PassthroughEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for PassthroughEncoder {
    fn available_input_indices(&mut self) -> Vec<usize> {
        if self.free_slot { vec![0] } else { vec![] }
    }

    fn queue_input_buffer(
        &mut self,
        _index: usize,
        data: &[u8],
        pts_us: i64,
        is_idr_request: bool,
    ) -> Result<(), ConverterError> {
        self.output.push_back(EncodedAccessUnit { pts_us, data: data.to_vec(), is_idr: is_idr_request });
        Ok(())
    }

    fn dequeue_output_buffer(&mut self) -> Option<EncodedAccessUnit> {
        self.output.pop_front()
    }

    fn signal_eos(&mut self) {}

    fn request_idr_frame(&mut self) {
        *self.idr_requests.lock().unwrap() += 1;
    }
}

/// Identity "cipher": records every call but leaves bytes untouched, so
/// tests can assert the HDCP seam was exercised (call count, counters handed
/// back) without depending on AES-CTR's actual keystream.
pub struct RecordingHdcpOracle {
    input_ctr: u64,
    calls: Vec<(usize, u32)>,
}

impl RecordingHdcpOracle {
    #[must_use]
    pub fn new() -> Self {
        Self { input_ctr: 0, calls: Vec::new() }
    }

    #[must_use]
    pub fn calls(&self) -> &[(usize, u32)] {
        &self.calls
    }
}

impl Default for RecordingHdcpOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl HdcpOracle for RecordingHdcpOracle {
    fn encrypt(&mut self, bytes_in_out: &mut [u8], stream_ctr: u32) -> Result<u64, HdcpError> {
        let input_ctr = self.input_ctr;
        self.input_ctr = self.input_ctr.wrapping_add(1);
        self.calls.push((bytes_in_out.len(), stream_ctr));
        Ok(input_ctr)
    }
}

/// Stands in for the sink's display/renderer: records every TS burst a
/// `PlaybackSession` (or `Sender`) hands off, in arrival order, so tests can
/// assert on total bytes and packet framing without a real socket.
#[derive(Default)]
pub struct RecordingDisplay {
    bursts: Vec<(usize, Vec<u8>)>,
}

impl RecordingDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, track_index: usize, ts_bytes: Vec<u8>) {
        self.bursts.push((track_index, ts_bytes));
    }

    #[must_use]
    pub fn bursts(&self) -> &[(usize, Vec<u8>)] {
        &self.bursts
    }

    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.bursts.iter().map(|(_, b)| b.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_agent::CaptureSource;

    #[test]
    fn scripted_source_replays_then_goes_idle() {
        let mut src = ScriptedCaptureSource::new(vec![CaptureEvent::Au(RawAccessUnit {
            pts_us: 0,
            data: vec![1],
            is_idr: true,
        })]);
        let first = src.read(Duration::from_millis(1)).unwrap();
        assert!(matches!(first, Some(CaptureEvent::Au(_))));
        let second = src.read(Duration::from_millis(1)).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn passthrough_encoder_counts_idr_requests() {
        let mut enc = PassthroughEncoder::new();
        let counter = enc.idr_request_count();
        enc.request_idr_frame();
        enc.request_idr_frame();
        assert_eq!(*counter.lock().unwrap(), 2);
    }

    #[test]
    fn recording_hdcp_oracle_leaves_bytes_untouched_but_logs_calls() {
        let mut oracle = RecordingHdcpOracle::new();
        let mut data = vec![1, 2, 3];
        oracle.encrypt(&mut data, 7).unwrap();
        assert_eq!(data, vec![1, 2, 3]);
        assert_eq!(oracle.calls(), &[(3, 7)]);
    }

    #[test]
    fn recording_display_tallies_bytes_across_bursts() {
        let mut display = RecordingDisplay::new();
        display.accept(0, vec![0u8; 188]);
        display.accept(1, vec![0u8; 376]);
        assert_eq!(display.bursts().len(), 2);
        assert_eq!(display.total_bytes(), 564);
    }
}
