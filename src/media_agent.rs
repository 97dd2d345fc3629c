//! Capture -> encoder pipeline, source side: `MediaPuller` drains a capture
//! source on its own pull loop and hands raw access units to `Converter`;
//! `Converter` owns an asynchronous encoder handle and opportunistically
//! feeds encoded access units onward (to a `PlaybackSession`'s track).
//! `RepeaterSource` wraps a video capture source to guarantee steady output
//! by repeating the last frame when the source has gone idle.
//!
//! Opportunistic encode ("do more work" while buffered input and free
//! encoder slots exist) is driven by a self-posting message rather than a
//! polled tick, since every other component in this crate is message-driven.
//! `MediaPuller` is a dedicated pull thread generalized over any
//! `CaptureSource`, not tied to a particular capture device.
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::log::log_sink::LogSink;
use crate::looper::Looper;
use crate::playback::AccessUnit;
use crate::util::now_micros;
use crate::{sink_debug, sink_warn};

/// How often `MediaPuller`'s blocking read is given to return before it
/// re-checks its stop flag, mirroring `Looper::POLL_INTERVAL`'s role.
const PULL_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    Io(String),
    SourceStopped,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "capture source error: {msg}"),
            Self::SourceStopped => write!(f, "capture source already stopped"),
        }
    }
}

impl std::error::Error for CaptureError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConverterError {
    EncoderFailed(String),
}

impl fmt::Display for ConverterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncoderFailed(msg) => write!(f, "encoder failed: {msg}"),
        }
    }
}

impl std::error::Error for ConverterError {}

/// One buffer handed from a `CaptureSource` to `MediaPuller`, before any
/// encoder has touched it: timing, payload, and IDR flag at capture
/// granularity, in microseconds rather than the 90 kHz RTP units used once
/// an AU is packetized.
#[derive(Debug, Clone)]
pub struct RawAccessUnit {
    pub pts_us: i64,
    pub data: Vec<u8>,
    pub is_idr: bool,
}

#[derive(Debug, Clone)]
pub enum CaptureEvent {
    Au(RawAccessUnit),
    Eos,
}

/// Narrow capture-source seam (screen, microphone, ...): a concrete capture
/// implementation is out of scope here, but the pull side still needs a
/// trait object to drive against. `read` takes a `timeout` (rather than
/// blocking indefinitely) so `RepeaterSource` can poll the wrapped source
/// without a second thread, and so `MediaPuller` can observe its stop flag
/// between reads without the source's cooperation.
pub trait CaptureSource: Send {
    fn start(&mut self) -> Result<(), CaptureError>;
    fn read(&mut self, timeout: Duration) -> Result<Option<CaptureEvent>, CaptureError>;
    fn stop(&mut self);
}

/// One encoded buffer handed back from `Encoder` to `Converter`.
#[derive(Debug, Clone)]
pub struct EncodedAccessUnit {
    pub pts_us: i64,
    pub data: Vec<u8>,
    pub is_idr: bool,
}

/// Narrow async-codec seam (host media-codec API): a concrete encoder
/// implementation is out of scope here. `available_input_indices`/
/// `queue_input_buffer`/`dequeue_output_buffer` mirror the real encoder's
/// buffer-index dance so `Converter`'s opportunistic-work loop has something
/// concrete to poll.
pub trait Encoder: Send {
    fn available_input_indices(&mut self) -> Vec<usize>;
    fn queue_input_buffer(
        &mut self,
        index: usize,
        data: &[u8],
        pts_us: i64,
        is_idr_request: bool,
    ) -> Result<(), ConverterError>;
    fn dequeue_output_buffer(&mut self) -> Option<EncodedAccessUnit>;
    fn signal_eos(&mut self);
    fn request_idr_frame(&mut self);
}

/// `RepeaterSource`'s fixed output rate: a steady 30 Hz.
pub const REPEATER_FPS: u32 = 30;

/// Wraps a video `CaptureSource` to guarantee output at `fps` even when the
/// wrapped source has produced nothing in one frame period: the last frame
/// is re-emitted with a fresh timestamp, following `WifiDisplaySource`'s 30Hz
/// repetition behavior.
pub struct RepeaterSource {
    inner: Box<dyn CaptureSource>,
    frame_period_us: i64,
    last_au: Option<RawAccessUnit>,
    last_emit_at_us: Option<i64>,
}

impl RepeaterSource {
    #[must_use]
    pub fn new(inner: Box<dyn CaptureSource>, fps: u32) -> Self {
        let fps = fps.max(1);
        Self {
            inner,
            frame_period_us: 1_000_000 / i64::from(fps),
            last_au: None,
            last_emit_at_us: None,
        }
    }

    fn overdue(&self, now_us: i64) -> bool {
        match self.last_emit_at_us {
            None => false,
            Some(t) => now_us - t >= self.frame_period_us,
        }
    }
}

impl CaptureSource for RepeaterSource {
    fn start(&mut self) -> Result<(), CaptureError> {
        self.inner.start()
    }

    fn stop(&mut self) {
        self.inner.stop();
    }

    fn read(&mut self, timeout: Duration) -> Result<Option<CaptureEvent>, CaptureError> {
        // Give the wrapped source a slice of the budget first; only fall
        // back to repeating the last frame once it has genuinely produced
        // nothing for a full frame period.
        let slice = Duration::from_micros(self.frame_period_us.max(1) as u64).min(timeout);
        match self.inner.read(slice)? {
            Some(CaptureEvent::Au(au)) => {
                self.last_emit_at_us = Some(now_micros());
                self.last_au = Some(au.clone());
                Ok(Some(CaptureEvent::Au(au)))
            }
            Some(CaptureEvent::Eos) => Ok(Some(CaptureEvent::Eos)),
            None => {
                let now = now_micros();
                if self.overdue(now)
                    && let Some(last) = &self.last_au
                {
                    let mut repeated = last.clone();
                    repeated.pts_us = now;
                    self.last_emit_at_us = Some(now);
                    return Ok(Some(CaptureEvent::Au(repeated)));
                }
                Ok(None)
            }
        }
    }
}

/// Drains a `CaptureSource` on its own OS thread (spec.md §4.5: "runs a
/// single-threaded pull loop on its own scheduler"). Each returned buffer
/// becomes a `ConverterMsg::FeedAccessUnit`; EOS becomes a
/// `ConverterMsg::SignalEos` and ends the loop.
pub struct MediaPuller {
    name: &'static str,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MediaPuller {
    pub fn start(
        name: &'static str,
        mut source: Box<dyn CaptureSource>,
        tx_converter: Sender<ConverterMsg>,
        logger: Arc<dyn LogSink>,
    ) -> Result<Self, CaptureError> {
        source.start()?;

        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_flag_thread = stop_flag.clone();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                loop {
                    if stop_flag_thread.load(Ordering::Acquire) {
                        break;
                    }
                    match source.read(PULL_POLL_INTERVAL) {
                        Ok(Some(CaptureEvent::Au(au))) => {
                            if tx_converter.send(ConverterMsg::FeedAccessUnit(au)).is_err() {
                                break;
                            }
                        }
                        Ok(Some(CaptureEvent::Eos)) => {
                            let _ = tx_converter.send(ConverterMsg::SignalEos);
                            break;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            sink_warn!(&logger, "media_puller '{}': read error: {}", name, e);
                            break;
                        }
                    }
                }
                source.stop();
                sink_debug!(&logger, "media_puller '{}': quiesced", name);
            })
            .ok();

        Ok(Self { name, stop_flag, handle })
    }

    /// Requests the pull loop stop and blocks until it has quiesced. The
    /// original posts a notification to a caller-supplied reply target;
    /// collapsed here to a synchronous join since each `MediaPuller` has
    /// exactly one owning `Track`.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for MediaPuller {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

pub enum ConverterMsg {
    FeedAccessUnit(RawAccessUnit),
    SignalEos,
    RequestIdrFrame,
    /// Self-posted while there is buffered input and a free encoder slot,
    /// or after new input/EOS arrives; drains whatever progress is
    /// currently possible.
    DoMoreWork,
}

/// How a track's raw AUs become encoded AUs: through an asynchronous
/// encoder, or (PCM, spec.md §4.5) repackaged directly into fixed-size
/// frames without ever touching a codec.
enum Backend {
    Encoder(Box<dyn Encoder>),
    /// PCM bypasses the encoder: incoming bytes accumulate in `carry` and
    /// are sliced into `frame_bytes`-sized chunks as soon as enough have
    /// arrived, each chunk timestamped from the AU it started in.
    PcmPassthrough { frame_bytes: usize, carry: Vec<u8>, carry_pts_us: Option<i64> },
}

/// Owns an encoder handle (or the PCM passthrough path) for one track and
/// opportunistically feeds it from buffered input, emitting encoded AUs to
/// `tx_playback` as `(track_index, AccessUnit)` pairs. `feed_access_unit`/
/// `signal_eos`/`request_idr_frame` are spec.md §4.5's Converter interface,
/// implemented as message sends into the Looper-owned work loop.
pub struct Converter {
    tx: Sender<ConverterMsg>,
    looper: Option<Looper>,
}

impl Converter {
    #[must_use]
    pub fn start_with_encoder(
        name: &'static str,
        encoder: Box<dyn Encoder>,
        track_index: usize,
        tx_playback: Sender<(usize, AccessUnit)>,
        logger: Arc<dyn LogSink>,
    ) -> (Self, Sender<ConverterMsg>) {
        Self::start(name, Backend::Encoder(encoder), track_index, tx_playback, logger)
    }

    #[must_use]
    pub fn start_pcm_passthrough(
        name: &'static str,
        frame_bytes: usize,
        track_index: usize,
        tx_playback: Sender<(usize, AccessUnit)>,
        logger: Arc<dyn LogSink>,
    ) -> (Self, Sender<ConverterMsg>) {
        Self::start(
            name,
            Backend::PcmPassthrough { frame_bytes, carry: Vec::new(), carry_pts_us: None },
            track_index,
            tx_playback,
            logger,
        )
    }

    fn start(
        name: &'static str,
        mut backend: Backend,
        track_index: usize,
        tx_playback: Sender<(usize, AccessUnit)>,
        logger: Arc<dyn LogSink>,
    ) -> (Self, Sender<ConverterMsg>) {
        let (tx, rx) = mpsc::channel::<ConverterMsg>();
        let tx_self = tx.clone();
        let mut pending_input: VecDeque<RawAccessUnit> = VecDeque::new();
        let mut eos_signaled = false;
        let mut eos_dispatched = false;
        // spec.md §8 property 7: repeated `requestIDRFrame()` calls within
        // one encoder output cycle collapse to at most one downstream
        // request; the flag clears once an IDR AU actually comes back out.
        let mut idr_request_pending = false;

        let handle_one = move |msg: ConverterMsg| {
            match msg {
                ConverterMsg::FeedAccessUnit(au) => {
                    pending_input.push_back(au);
                    let _ = tx_self.send(ConverterMsg::DoMoreWork);
                    return;
                }
                ConverterMsg::SignalEos => {
                    eos_signaled = true;
                    let _ = tx_self.send(ConverterMsg::DoMoreWork);
                    return;
                }
                ConverterMsg::RequestIdrFrame => {
                    if !idr_request_pending
                        && let Backend::Encoder(encoder) = &mut backend
                    {
                        encoder.request_idr_frame();
                        idr_request_pending = true;
                    }
                    return;
                }
                ConverterMsg::DoMoreWork => {}
            }

            match &mut backend {
                Backend::Encoder(encoder) => {
                    for index in encoder.available_input_indices() {
                        let Some(au) = pending_input.pop_front() else { break };
                        if let Err(e) =
                            encoder.queue_input_buffer(index, &au.data, au.pts_us, au.is_idr)
                        {
                            sink_warn!(&logger, "converter '{}': {}", name, e);
                        }
                    }
                    if eos_signaled && !eos_dispatched && pending_input.is_empty() {
                        encoder.signal_eos();
                        eos_dispatched = true;
                    }
                    while let Some(out) = encoder.dequeue_output_buffer() {
                        if out.is_idr {
                            idr_request_pending = false;
                        }
                        let au = AccessUnit {
                            pts_90khz: pts_us_to_90khz(out.pts_us),
                            data: out.data,
                            is_idr: out.is_idr,
                            sps_pps: None,
                        };
                        if tx_playback.send((track_index, au)).is_err() {
                            return;
                        }
                    }
                    let has_free_slot = !encoder.available_input_indices().is_empty();
                    if !pending_input.is_empty() && has_free_slot {
                        let _ = tx_self.send(ConverterMsg::DoMoreWork);
                    }
                }
                Backend::PcmPassthrough { frame_bytes, carry, carry_pts_us } => {
                    while let Some(au) = pending_input.pop_front() {
                        if carry.is_empty() {
                            *carry_pts_us = Some(au.pts_us);
                        }
                        carry.extend_from_slice(&au.data);
                    }
                    while carry.len() >= *frame_bytes {
                        let frame: Vec<u8> = carry.drain(..*frame_bytes).collect();
                        let au = AccessUnit {
                            pts_90khz: pts_us_to_90khz(carry_pts_us.unwrap_or(0)),
                            data: frame,
                            is_idr: false,
                            sps_pps: None,
                        };
                        if tx_playback.send((track_index, au)).is_err() {
                            return;
                        }
                    }
                    if carry.is_empty() {
                        *carry_pts_us = None;
                    }
                }
            }
        };

        let looper = Looper::start(name, rx, handle_one, || {});
        (Self { tx: tx.clone(), looper: Some(looper) }, tx)
    }

    pub fn feed_access_unit(&self, au: RawAccessUnit) {
        let _ = self.tx.send(ConverterMsg::FeedAccessUnit(au));
    }

    pub fn signal_eos(&self) {
        let _ = self.tx.send(ConverterMsg::SignalEos);
    }

    pub fn request_idr_frame(&self) {
        let _ = self.tx.send(ConverterMsg::RequestIdrFrame);
    }

    pub fn stop(&mut self, logger: &Arc<dyn LogSink>) {
        if let Some(mut looper) = self.looper.take() {
            looper.stop(logger);
        }
    }
}

/// 90 kHz RTP-clock units from a microsecond presentation timestamp
/// (spec.md §3: "presentation time in microseconds" at capture, "32-bit RTP
/// timestamp in 90 kHz units" on the wire).
#[must_use]
pub fn pts_us_to_90khz(pts_us: i64) -> u64 {
    ((pts_us as i128 * 9 / 100) as u64) & 0xFFFF_FFFF
}
