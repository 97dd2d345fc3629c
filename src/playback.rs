//! Per-session playback lifecycle: tracks, cross-track interleaving by
//! presentation timestamp, lazy `TSPacketizer` track binding, and optional
//! HDCP wrapping ahead of packetization. Grounded on `PlaybackSession.cpp`'s
//! `Track`/`drainAccessUnit`/`packetizeAccessUnit` trio, with the
//! lifecycle/ownership shape of a long-lived session following
//! `core/session.rs`.
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::hdcp::{HdcpError, HdcpOracle, build_private_data};
use crate::ts::config::{EMIT_PAT_AND_PMT, EMIT_PCR, IS_ENCRYPTED};
use crate::ts::{Codec, TsError, TsPacketizer};
use crate::util::now_micros;

/// A track is considered idle (and excluded from the "every track must have
/// data" interleave rule) once this long has passed with nothing queued.
pub const SUSPEND_THRESHOLD_US: i64 = 60_000;
/// Minimum spacing between PAT/PMT + PCR re-emission.
pub const PAT_PMT_PCR_INTERVAL_US: i64 = 100_000;

#[derive(Debug, Clone)]
pub struct AccessUnit {
    pub pts_90khz: u64,
    pub data: Vec<u8>,
    pub is_idr: bool,
    /// SPS/PPS NAL units to prepend ahead of this unit, set only for a video
    /// IDR frame whose converter doesn't embed config data in-band.
    pub sps_pps: Option<Vec<u8>>,
}

#[derive(Debug)]
pub enum PlaybackError {
    Ts(TsError),
    Hdcp(HdcpError),
    Poisoned,
    UnknownTrack(usize),
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ts(e) => write!(f, "packetizer error: {e}"),
            Self::Hdcp(e) => write!(f, "HDCP error: {e}"),
            Self::Poisoned => write!(f, "playback session mutex poisoned"),
            Self::UnknownTrack(i) => write!(f, "no track at index {i}"),
        }
    }
}

impl std::error::Error for PlaybackError {}

impl From<TsError> for PlaybackError {
    fn from(e: TsError) -> Self {
        Self::Ts(e)
    }
}

impl From<HdcpError> for PlaybackError {
    fn from(e: HdcpError) -> Self {
        Self::Hdcp(e)
    }
}

impl<T> From<PoisonError<T>> for PlaybackError {
    fn from(_: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}

struct Track {
    codec: Codec,
    is_audio: bool,
    encrypted: bool,
    packetizer_track_index: Option<usize>,
    pending_access_units: VecDeque<AccessUnit>,
    queued_output: VecDeque<AccessUnit>,
    last_output_queued_at_us: Option<i64>,
}

impl Track {
    fn new(codec: Codec, is_audio: bool, encrypted: bool) -> Self {
        Self {
            codec,
            is_audio,
            encrypted,
            packetizer_track_index: None,
            pending_access_units: VecDeque::new(),
            queued_output: VecDeque::new(),
            last_output_queued_at_us: None,
        }
    }

    fn queue_output(&mut self, au: AccessUnit) {
        self.queued_output.push_back(au);
        self.last_output_queued_at_us = Some(now_micros());
    }

    fn has_output_pts(&self) -> Option<u64> {
        self.queued_output.front().map(|au| au.pts_90khz)
    }

    /// A track stays "live" (blocks interleaving) until it's produced no
    /// output for `SUSPEND_THRESHOLD_US`. A track that has never produced
    /// anything yet is live, not suspended (matches the original's
    /// "tracks start out live" comment).
    fn is_suspended(&self) -> bool {
        if !self.queued_output.is_empty() {
            return false;
        }
        match self.last_output_queued_at_us {
            None => false,
            Some(t) => now_micros() - t > SUSPEND_THRESHOLD_US,
        }
    }
}

/// Owns the `TSPacketizer` and every track's pending/output queues for one
/// playback session; one instance per connected sink.
pub struct PlaybackSession {
    packetizer: TsPacketizer,
    tracks: Vec<Track>,
    video_track_index: Option<usize>,
    hdcp: Option<Arc<Mutex<dyn HdcpOracle>>>,
    all_tracks_have_packetizer_index: bool,
    prev_pcr_at_us: Option<i64>,
}

impl PlaybackSession {
    #[must_use]
    pub fn new(hdcp: Option<Arc<Mutex<dyn HdcpOracle>>>) -> Self {
        Self {
            packetizer: TsPacketizer::new(),
            tracks: Vec::new(),
            video_track_index: None,
            hdcp,
            all_tracks_have_packetizer_index: false,
            prev_pcr_at_us: None,
        }
    }

    /// Adds a session-level track. The `TSPacketizer` track index is bound
    /// lazily, on the first access unit fed for it, matching the original's
    /// deferred `packetizerTrackIndex` assignment (the encoder may not be
    /// warmed up yet when the track slot is created).
    pub fn add_track(&mut self, codec: Codec, is_audio: bool, encrypted: bool) -> usize {
        let index = self.tracks.len();
        if codec.is_video() {
            self.video_track_index = Some(index);
        }
        self.tracks.push(Track::new(codec, is_audio, encrypted));
        self.all_tracks_have_packetizer_index = false;
        index
    }

    #[must_use]
    pub fn is_video_track(&self, track_index: usize) -> bool {
        self.video_track_index == Some(track_index)
    }

    fn all_tracks_bound(&mut self) -> bool {
        if self.all_tracks_have_packetizer_index {
            return true;
        }
        if !self.tracks.is_empty()
            && self.tracks.iter().all(|t| t.packetizer_track_index.is_some())
        {
            self.all_tracks_have_packetizer_index = true;
        }
        self.all_tracks_have_packetizer_index
    }

    /// Feeds one encoded access unit for `track_index`, as delivered by the
    /// Converter. Binds the track's packetizer index on first call; until
    /// every track in the session has one, access units queue in
    /// `pending_access_units` rather than the drainable output queue.
    pub fn feed_access_unit(&mut self, track_index: usize, au: AccessUnit) -> Result<(), PlaybackError> {
        if track_index >= self.tracks.len() {
            return Err(PlaybackError::UnknownTrack(track_index));
        }

        if self.tracks[track_index].packetizer_track_index.is_none() {
            let (codec, encrypted) = {
                let t = &self.tracks[track_index];
                (t.codec, t.encrypted)
            };
            let packetizer_index = self.packetizer.add_track(codec, encrypted)?;
            self.tracks[track_index].packetizer_track_index = Some(packetizer_index);

            if self.all_tracks_bound() {
                for t in &mut self.tracks {
                    while let Some(pending) = t.pending_access_units.pop_front() {
                        t.queue_output(pending);
                    }
                }
            }
        }

        if !self.all_tracks_bound() {
            self.tracks[track_index].pending_access_units.push_back(au);
            return Ok(());
        }

        self.tracks[track_index].queue_output(au);
        Ok(())
    }

    /// Drains every access unit currently ready to interleave. Returns
    /// `(track_index, ts_bytes)` pairs in the order they were packetized
    /// (== presentation-timestamp order across tracks).
    pub fn drain(&mut self) -> Result<Vec<(usize, Vec<u8>)>, PlaybackError> {
        let mut out = Vec::new();
        while let Some(pair) = self.drain_one()? {
            out.push(pair);
        }
        Ok(out)
    }

    fn drain_one(&mut self) -> Result<Option<(usize, Vec<u8>)>, PlaybackError> {
        if !self.all_tracks_bound() {
            return Ok(None);
        }

        let mut min_index = None;
        let mut min_pts = u64::MAX;
        for (i, t) in self.tracks.iter().enumerate() {
            match t.has_output_pts() {
                Some(pts) => {
                    if pts < min_pts {
                        min_pts = pts;
                        min_index = Some(i);
                    }
                }
                None => {
                    if !t.is_suspended() {
                        // Still "live": every track must have data before any
                        // one of them can be drained, so interleaving order
                        // stays correct.
                        return Ok(None);
                    }
                }
            }
        }

        let Some(track_index) = min_index else {
            return Ok(None);
        };
        let au = self.tracks[track_index]
            .queued_output
            .pop_front()
            .expect("min_index only set for a track with queued output");
        let packets = self.packetize(track_index, &au)?;
        Ok(Some((track_index, packets)))
    }

    fn packetize(&mut self, track_index: usize, au: &AccessUnit) -> Result<Vec<u8>, PlaybackError> {
        let (is_audio, encrypted, packetizer_index) = {
            let t = &self.tracks[track_index];
            (t.is_audio, t.encrypted, t.packetizer_track_index.expect("bound by feed_access_unit"))
        };

        let mut payload = au.data.clone();
        if !is_audio {
            if let Some(sps_pps) = &au.sps_pps {
                let mut combined = sps_pps.clone();
                combined.extend_from_slice(&payload);
                payload = combined;
            }
        }

        let mut flags = 0u32;
        let mut private_data = None;
        if encrypted && !is_audio {
            if let Some(hdcp) = &self.hdcp {
                let input_ctr = hdcp.lock()?.encrypt(&mut payload, track_index as u32)?;
                private_data = Some(build_private_data(track_index as u32, input_ctr));
                flags |= IS_ENCRYPTED;
            }
        }

        let now = now_micros();
        let emit_tables = match self.prev_pcr_at_us {
            None => true,
            Some(prev) => now - prev >= PAT_PMT_PCR_INTERVAL_US,
        };
        if emit_tables {
            flags |= EMIT_PAT_AND_PMT | EMIT_PCR;
            self.prev_pcr_at_us = Some(now);
        }

        let packets = self.packetizer.packetize(
            packetizer_index,
            &payload,
            au.pts_90khz,
            au.is_idr,
            flags,
            None,
            private_data.as_ref(),
        )?;
        Ok(packets)
    }
}
