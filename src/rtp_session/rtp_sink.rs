//! Sink-side RTP receive tracking for one SSRC: sequence-number state,
//! arrival jitter, and the RTCP reports sent back to the source. Grounded on
//! `RTPSink::Source` (parseRTP/addReportBlock/onSendRR/addSDES/onPacketLost).
use crate::rtcp::{
    generic_nack::GenericNack, receiver_report::ReceiverReport, report_block::ReportBlock,
    sdes::Sdes,
};
use crate::rtp::RtpPacket;

use super::jitter::JitterEstimator;
use super::rtp_session_error::RtpSessionError;
use super::seq_track::{SeqOutcome, SeqTracker};

/// Callbacks the owner of an `RtpSink` must supply to move generated RTCP
/// packets and in-order payloads out to the network / decoder.
pub trait RtpSinkObserver {
    fn on_payload(&mut self, packet: &RtpPacket);
    fn on_rtcp(&mut self, packet: &[u8]);
}

pub struct RtpSink {
    ssrc: u32,
    tracker: Option<SeqTracker>,
    jitter: JitterEstimator,
    highest_queued_seq: Option<u16>,
}

impl RtpSink {
    pub fn new(ssrc: u32) -> Self {
        Self {
            ssrc,
            tracker: None,
            jitter: JitterEstimator::new(),
            highest_queued_seq: None,
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// The largest packet lateness observed so far, in milliseconds.
    pub fn max_lateness_ms(&self) -> f64 {
        self.jitter.max_lateness_ms()
    }

    /// Feeds one received packet through sequence tracking and jitter/
    /// lateness estimation. Returns the set of sequence numbers that should
    /// now be considered lost (gap observed, not yet seen) and worth
    /// NACKing.
    pub fn on_packet(&mut self, packet: &RtpPacket, arrival_us: i64) -> Vec<u16> {
        let seq = packet.header.sequence_number;

        let rtp_time = f64::from(packet.header.timestamp);
        let arrival_media = arrival_us as f64 * 9.0 / 100.0;
        self.jitter.add_sample(rtp_time, arrival_media);

        let outcome = match &mut self.tracker {
            None => {
                let (tracker, outcome) = SeqTracker::new(seq);
                self.tracker = Some(tracker);
                outcome
            }
            Some(t) => t.update_seq(seq),
        };

        let mut missing = Vec::new();
        if let SeqOutcome::Accept { .. } = outcome {
            if let Some(prev_high) = self.highest_queued_seq {
                let gap = seq.wrapping_sub(prev_high);
                if gap > 1 && u32::from(gap) < 0x8000 {
                    let mut s = prev_high.wrapping_add(1);
                    while s != seq {
                        missing.push(s);
                        s = s.wrapping_add(1);
                    }
                }
            }
            self.highest_queued_seq = Some(seq);
        }
        missing
    }

    /// Builds the RR report block for this source's receive state.
    pub fn build_report_block(&mut self) -> Option<ReportBlock> {
        let tracker = self.tracker.as_mut()?;
        let (fraction_lost, cumulative_lost, highest_seq) = tracker.loss_fields();
        Some(ReportBlock {
            ssrc: self.ssrc,
            fraction_lost,
            cumulative_lost,
            highest_seq_no_received: highest_seq,
            interarrival_jitter: 0,
            lsr: 0,
            dlsr: 0,
        })
    }

    pub fn build_nack(
        &self,
        sender_ssrc: u32,
        missing: &[u16],
    ) -> Result<GenericNack, RtpSessionError> {
        if missing.is_empty() {
            return Err(RtpSessionError::HistoryMiss { seq: 0 });
        }
        let mut entries = Vec::new();
        let mut sorted = missing.to_vec();
        sorted.sort_unstable();
        let mut i = 0;
        while i < sorted.len() {
            let pid = sorted[i];
            let mut blp = 0u16;
            let mut j = i + 1;
            while j < sorted.len() {
                let delta = sorted[j].wrapping_sub(pid);
                if delta == 0 || delta > 16 {
                    break;
                }
                blp |= 1 << (delta - 1);
                j += 1;
            }
            entries.push((pid, blp));
            i = j;
        }
        Ok(GenericNack::new(sender_ssrc, self.ssrc, entries))
    }
}

pub fn build_receiver_report(sender_ssrc: u32, blocks: Vec<ReportBlock>) -> ReceiverReport {
    ReceiverReport::new(sender_ssrc, blocks)
}

pub fn build_sdes(ssrc: u32, cname: &str) -> Sdes {
    Sdes::cname(ssrc, cname.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtp::{RtpHeader, RtpPacket};

    fn packet(seq: u16, ts: u32) -> RtpPacket {
        RtpPacket::new(RtpHeader::new(33, seq, ts, 0xdead_beef), vec![b'x'])
    }

    #[test]
    fn first_packet_has_no_gap() {
        let mut sink = RtpSink::new(0xdead_beef);
        let missing = sink.on_packet(&packet(100, 9000), 0);
        assert!(missing.is_empty());
    }

    #[test]
    fn gap_reports_missing_seqs() {
        let mut sink = RtpSink::new(0xdead_beef);
        sink.on_packet(&packet(100, 9000), 0);
        let missing = sink.on_packet(&packet(103, 9300), 1000);
        assert_eq!(missing, vec![101, 102]);
    }

    #[test]
    fn nack_blp_encodes_gap_correctly() {
        let sink = RtpSink::new(0xdead_beef);
        let nack = sink.build_nack(0x1234, &[101, 102]).unwrap();
        assert_eq!(nack.entries, vec![(101, 0b1)]);
    }

    #[test]
    fn report_block_reflects_receive_state() {
        let mut sink = RtpSink::new(0xdead_beef);
        sink.on_packet(&packet(10, 1000), 0);
        sink.on_packet(&packet(11, 2000), 100);
        let block = sink.build_report_block().unwrap();
        assert_eq!(block.ssrc, 0xdead_beef);
        assert_eq!(block.highest_seq_no_received, 11);
    }
}
