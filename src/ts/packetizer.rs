//! `TSPacketizer`: registers tracks, assigns PIDs, and turns one access unit
//! into a burst of 188-byte TS packets (PAT/PMT + PES + payload fragments),
//! grounded on `TSPacketizer.h`'s `addTrack`/`packetize` contract.
use super::adaptation::{first_packet_with_pcr, last_packet_padded, plain_packet};
use super::config::{
    EMIT_PAT_AND_PMT, EMIT_PCR, FIRST_ES_PID, IS_ENCRYPTED, PREPEND_SPS_PPS_TO_IDR_FRAMES,
    STREAM_TYPE_AAC_ADTS, STREAM_TYPE_H264, STREAM_TYPE_PCM, TS_PACKET_SIZE,
};
use super::pat_pmt::{EsInfo, build_pat, build_pmt};
use super::pes::{STREAM_ID_AUDIO, STREAM_ID_VIDEO, build_pes_header};
use super::ts_error::TsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    H264,
    AacAdts,
    Pcm,
}

impl Codec {
    fn stream_type(self) -> u8 {
        match self {
            Codec::H264 => STREAM_TYPE_H264,
            Codec::AacAdts => STREAM_TYPE_AAC_ADTS,
            Codec::Pcm => STREAM_TYPE_PCM,
        }
    }

    pub fn is_video(self) -> bool {
        matches!(self, Codec::H264)
    }
}

struct Track {
    codec: Codec,
    pid: u16,
    continuity_counter: u8,
    encrypted: bool,
}

/// Forms the packets of a transport stream given access units; emits PAT/PMT
/// and PCR based on per-call flags, matching the Java-style
/// `TSPacketizer::packetize` contract one-to-one in semantics.
pub struct TsPacketizer {
    tracks: Vec<Track>,
    pat_continuity_counter: u8,
    pmt_continuity_counter: u8,
}

impl TsPacketizer {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            pat_continuity_counter: 0,
            pmt_continuity_counter: 0,
        }
    }

    /// Registers a track, assigning the next PID starting at `FIRST_ES_PID`.
    /// Returns the track index used by `packetize`.
    pub fn add_track(&mut self, codec: Codec, encrypted: bool) -> Result<usize, TsError> {
        let pid = FIRST_ES_PID
            .checked_add(self.tracks.len() as u16)
            .ok_or(TsError::TooManyTracks(self.tracks.len()))?;
        self.tracks.push(Track {
            codec,
            pid,
            continuity_counter: 0,
            encrypted,
        });
        Ok(self.tracks.len() - 1)
    }

    pub fn pid_for_track(&self, track_index: usize) -> Result<u16, TsError> {
        self.tracks
            .get(track_index)
            .map(|t| t.pid)
            .ok_or(TsError::UnknownTrack(track_index))
    }

    fn next_continuity(counter: &mut u8) -> u8 {
        let cc = *counter;
        *counter = (*counter + 1) & 0x0F;
        cc
    }

    fn pmt_streams(&self) -> Vec<EsInfo> {
        self.tracks
            .iter()
            .map(|t| EsInfo {
                stream_type: t.codec.stream_type(),
                pid: t.pid,
                hdcp_descriptor: t.encrypted,
            })
            .collect()
    }

    /// Packetizes one access unit for `track_index`. `flags` is an OR of
    /// `EMIT_PAT_AND_PMT`/`EMIT_PCR`/`IS_ENCRYPTED`/
    /// `PREPEND_SPS_PPS_TO_IDR_FRAMES`; `sps_pps` supplies the codec-specific
    /// NAL units prepended ahead of a video IDR frame; `private_data` is the
    /// 16-byte HDCP block, present only when the track is content-protected.
    pub fn packetize(
        &mut self,
        track_index: usize,
        access_unit: &[u8],
        pts_90khz: u64,
        is_idr: bool,
        flags: u32,
        sps_pps: Option<&[u8]>,
        private_data: Option<&[u8; 16]>,
    ) -> Result<Vec<u8>, TsError> {
        if access_unit.is_empty() {
            return Err(TsError::EmptyAccessUnit);
        }
        if pts_90khz >= (1u64 << 33) {
            return Err(TsError::PtsOverflow);
        }

        let streams = if flags & EMIT_PAT_AND_PMT != 0 {
            Some(self.pmt_streams())
        } else {
            None
        };

        let (codec, pid, encrypted) = {
            let t = self
                .tracks
                .get(track_index)
                .ok_or(TsError::UnknownTrack(track_index))?;
            (t.codec, t.pid, t.encrypted)
        };

        let mut out = Vec::new();

        if let Some(streams) = streams {
            out.extend_from_slice(&build_pat(Self::next_continuity(
                &mut self.pat_continuity_counter,
            )));
            out.extend_from_slice(&build_pmt(
                &streams,
                Self::next_continuity(&mut self.pmt_continuity_counter),
            ));
        }

        let mut es_payload = Vec::with_capacity(access_unit.len() + 32);
        if codec.is_video() && is_idr && flags & PREPEND_SPS_PPS_TO_IDR_FRAMES != 0 {
            if let Some(sps_pps) = sps_pps {
                es_payload.extend_from_slice(sps_pps);
            }
        }
        es_payload.extend_from_slice(access_unit);

        let stream_id = if codec.is_video() {
            STREAM_ID_VIDEO
        } else {
            STREAM_ID_AUDIO
        };
        let private = if flags & IS_ENCRYPTED != 0 && encrypted {
            private_data
        } else {
            None
        };
        let pes_header = build_pes_header(stream_id, pts_90khz, es_payload.len(), private);

        let mut pes = Vec::with_capacity(pes_header.len() + es_payload.len());
        pes.extend_from_slice(&pes_header);
        pes.extend_from_slice(&es_payload);

        let track = &mut self.tracks[track_index];
        let want_pcr = flags & EMIT_PCR != 0;
        let mut cursor = 0usize;
        let mut first = true;

        while cursor < pes.len() {
            let remaining = &pes[cursor..];
            let is_last_chunk = remaining.len() <= TS_PACKET_SIZE - 4;

            if first {
                let pcr = if want_pcr { Some(pts_90khz) } else { None };
                if is_last_chunk && pcr.is_none() {
                    out.extend_from_slice(&last_packet_padded(
                        pid,
                        Self::next_continuity(&mut track.continuity_counter),
                        remaining,
                    ));
                    cursor = pes.len();
                } else {
                    let (packet, consumed) = first_packet_with_pcr(
                        pid,
                        true,
                        Self::next_continuity(&mut track.continuity_counter),
                        pcr,
                        remaining,
                    );
                    out.extend_from_slice(&packet);
                    cursor += consumed;
                }
                first = false;
            } else if is_last_chunk {
                out.extend_from_slice(&last_packet_padded(
                    pid,
                    Self::next_continuity(&mut track.continuity_counter),
                    remaining,
                ));
                cursor = pes.len();
            } else {
                let (packet, consumed) =
                    plain_packet(pid, Self::next_continuity(&mut track.continuity_counter), remaining);
                out.extend_from_slice(&packet);
                cursor += consumed;
            }
        }

        Ok(out)
    }
}

impl Default for TsPacketizer {
    fn default() -> Self {
        Self::new()
    }
}
