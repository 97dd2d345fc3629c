//! Source-side RTP framing and RTCP cadence, grounded in `Sender.h`/`Sender.cpp`:
//! assigns sequence numbers and 90kHz timestamps, keeps a bounded send history
//! for NACK-driven retransmission, and emits an SR+SDES pair every 10 seconds.
use std::sync::{Arc, Mutex};

use crate::config::RetransmitMode;
use crate::rtcp::{
    generic_nack::GenericNack, report_block::ReportBlock, rtcp::RtcpPacket,
    sender_info::SenderInfo, sender_report::SenderReport,
};
use crate::rtp::{RtpHeader, RtpPacket};
use crate::ts::config::TS_PACKET_SIZE;
use crate::util::{now_micros, ntp_now};

use super::rtp_session_error::RtpSessionError;
use super::send_history::SendHistory;

/// `Sender::kSendSRIntervalUs`: 10 seconds between sender reports.
pub const SEND_SR_INTERVAL_US: i64 = 10_000_000;
/// spec.md §4.2: "Splits them into RTP packets of at most 7 TS packets",
/// keeping an RTP packet's payload under a 1500-byte MTU (12 + 7*188 = 1328).
pub const MAX_TS_PACKETS_PER_RTP: usize = 7;

/// Where a retransmitted packet goes once `Sender::onPacketLost` fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetransmitAction {
    /// Re-send verbatim on the primary channel (`RetransmitMode::SameChannel`).
    ResendOriginal,
    /// Re-send on a side channel with a fresh sequence number wrapping the
    /// original payload (`RetransmitMode::SideChannel`).
    ResendWrapped { new_seq: u16 },
    /// `RetransmitMode::Off`: drop the NACK on the floor.
    Drop,
}

pub struct Sender {
    ssrc: u32,
    payload_type: u8,
    retransmit: RetransmitMode,
    next_seq: u16,
    rtx_seq: u16,
    packets_sent: u32,
    octets_sent: u32,
    last_sr_time_us: Option<i64>,
    history: Arc<Mutex<SendHistory>>,
}

impl Sender {
    pub fn new(ssrc: u32, payload_type: u8, retransmit: RetransmitMode) -> Self {
        Self {
            ssrc,
            payload_type,
            retransmit,
            next_seq: 0,
            rtx_seq: 0,
            packets_sent: 0,
            octets_sent: 0,
            last_sr_time_us: None,
            history: Arc::new(Mutex::new(SendHistory::new())),
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Wraps `payload` in an RTP header, assigning the next sequence number
    /// and recording it in send history for possible retransmission.
    pub fn package(
        &mut self,
        timestamp: u32,
        marker: bool,
        payload: Vec<u8>,
    ) -> Result<RtpPacket, RtpSessionError> {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        let header = RtpHeader::new(self.payload_type, seq, timestamp, self.ssrc).with_marker(marker);
        let packet = RtpPacket::new(header, payload);

        let buf = packet.encode().map_err(RtpSessionError::from)?;

        self.packets_sent = self.packets_sent.wrapping_add(1);
        self.octets_sent = self.octets_sent.wrapping_add(packet.payload.len() as u32);

        self.history
            .lock()?
            .push(seq, bytes::Bytes::from(buf));

        Ok(packet)
    }

    /// Splits one TS burst (a multiple of 188 bytes, as `PlaybackSession`
    /// hands to the Sender) into RTP packets of at most
    /// `MAX_TS_PACKETS_PER_RTP` TS packets each, per spec.md §4.2. Every
    /// packet in the burst carries the same RTP timestamp: 90kHz of the
    /// wall-clock `now` at send time, not the original AU's presentation
    /// timestamp (spec.md §4.2's "fills the RTP timestamp ... at send
    /// time"; see spec.md §9's open question on NTP/RTP A/V-sync timing).
    pub fn send_ts_burst(&mut self, ts_bytes: &[u8]) -> Result<Vec<RtpPacket>, RtpSessionError> {
        let rtp_timestamp = ((now_micros() as i128 * 9 / 100) as u64 & 0xFFFF_FFFF) as u32;
        let chunk_bytes = MAX_TS_PACKETS_PER_RTP * TS_PACKET_SIZE;
        let mut out = Vec::with_capacity(ts_bytes.len().div_ceil(chunk_bytes).max(1));
        for chunk in ts_bytes.chunks(chunk_bytes) {
            out.push(self.package(rtp_timestamp, false, chunk.to_vec())?);
        }
        Ok(out)
    }

    /// True once `SEND_SR_INTERVAL_US` has elapsed since the last report (or
    /// immediately, if none has been sent yet).
    pub fn sr_due(&self, now_us: i64) -> bool {
        match self.last_sr_time_us {
            None => true,
            Some(last) => now_us - last >= SEND_SR_INTERVAL_US,
        }
    }

    /// Builds the periodic SR, marking it as sent at `now_us`.
    pub fn build_sender_report(&mut self, now_us: i64, rtp_timestamp: u32) -> SenderReport {
        self.last_sr_time_us = Some(now_us);
        let (ntp_msw, ntp_lsw) = ntp_now();
        let info = SenderInfo {
            ntp_msw,
            ntp_lsw,
            rtp_ts: rtp_timestamp,
            packet_count: self.packets_sent,
            octet_count: self.octets_sent,
        };
        SenderReport::new(self.ssrc, info, Vec::new())
    }

    /// Decides what to do about one NACKed sequence number, consulting send
    /// history. Returns `None` if the seq was never sent or already evicted.
    pub fn resolve_retransmit(&mut self, seq: u16) -> Option<(RetransmitAction, bytes::Bytes)> {
        let packet = self.history.lock().ok()?.get(seq)?;
        let action = match self.retransmit {
            RetransmitMode::Off => RetransmitAction::Drop,
            RetransmitMode::SameChannel => RetransmitAction::ResendOriginal,
            RetransmitMode::SideChannel => {
                let new_seq = self.rtx_seq;
                self.rtx_seq = self.rtx_seq.wrapping_add(1);
                RetransmitAction::ResendWrapped { new_seq }
            }
        };
        Some((action, packet))
    }

    /// Expands a generic NACK into concrete retransmit actions, per
    /// `RTPSink::onPacketLost`'s (pid, blp) decoding.
    pub fn handle_nack(&mut self, nack: &GenericNack) -> Vec<(u16, RetransmitAction, bytes::Bytes)> {
        let mut out = Vec::new();
        for &(pid, blp) in &nack.entries {
            if let Some((action, bytes)) = self.resolve_retransmit(pid) {
                out.push((pid, action, bytes));
            }
            for bit in 0..16u16 {
                if blp & (1 << bit) != 0 {
                    let seq = pid.wrapping_add(bit + 1);
                    if let Some((action, bytes)) = self.resolve_retransmit(seq) {
                        out.push((seq, action, bytes));
                    }
                }
            }
        }
        out
    }

    pub fn compound_sr_sdes(&mut self, now_us: i64, rtp_timestamp: u32, cname: &str) -> Result<Vec<u8>, RtpSessionError> {
        let sr = self.build_sender_report(now_us, rtp_timestamp);
        let sdes = super::rtp_sink::build_sdes(self.ssrc, cname);
        let packets = vec![RtcpPacket::Sr(sr), RtcpPacket::Sdes(sdes)];
        let out = RtcpPacket::encode_compound(&packets)?;
        Ok(out)
    }

    pub fn build_receiver_report_ack(&self, blocks: Vec<ReportBlock>) -> RtcpPacket {
        RtcpPacket::Rr(crate::rtcp::receiver_report::ReceiverReport::new(
            self.ssrc, blocks,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_assigns_increasing_seqs_and_records_history() {
        let mut sender = Sender::new(0xdead_beef, 33, RetransmitMode::SameChannel);
        let p0 = sender.package(1000, false, vec![1, 2, 3]).unwrap();
        let p1 = sender.package(1000, false, vec![4, 5, 6]).unwrap();
        assert_eq!(p0.header.sequence_number, 0);
        assert_eq!(p1.header.sequence_number, 1);
        assert_eq!(sender.packets_sent, 2);
    }

    #[test]
    fn ts_burst_splits_into_at_most_seven_packets_with_shared_timestamp() {
        // spec.md §8 S5: 10 TS packets (1880 bytes) -> two RTP packets of
        // 12+7*188=1328 and 12+3*188=576 bytes, seqs N and N+1, same ts.
        let mut sender = Sender::new(0xdead_beef, 33, RetransmitMode::SameChannel);
        let burst = vec![0x47u8; 10 * TS_PACKET_SIZE];
        let packets = sender.send_ts_burst(&burst).unwrap();

        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].payload.len(), 7 * TS_PACKET_SIZE);
        assert_eq!(packets[1].payload.len(), 3 * TS_PACKET_SIZE);
        assert_eq!(packets[0].header.sequence_number, 0);
        assert_eq!(packets[1].header.sequence_number, 1);
        assert_eq!(packets[0].header.timestamp, packets[1].header.timestamp);
        assert_eq!(packets[0].header.payload_type, 33);
        assert_eq!(packets[0].header.ssrc, 0xdead_beef);
    }

    #[test]
    fn ts_burst_of_exactly_seven_packets_is_one_rtp_packet() {
        let mut sender = Sender::new(0xdead_beef, 33, RetransmitMode::SameChannel);
        let burst = vec![0x47u8; 7 * TS_PACKET_SIZE];
        let packets = sender.send_ts_burst(&burst).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].payload.len(), 7 * TS_PACKET_SIZE);
    }

    #[test]
    fn sr_due_is_true_before_first_report() {
        let sender = Sender::new(0xdead_beef, 33, RetransmitMode::SameChannel);
        assert!(sender.sr_due(0));
    }

    #[test]
    fn sr_due_false_until_interval_elapses() {
        let mut sender = Sender::new(0xdead_beef, 33, RetransmitMode::SameChannel);
        sender.build_sender_report(0, 9000);
        assert!(!sender.sr_due(SEND_SR_INTERVAL_US - 1));
        assert!(sender.sr_due(SEND_SR_INTERVAL_US));
    }

    #[test]
    fn retransmit_off_drops_nack() {
        let mut sender = Sender::new(0xdead_beef, 33, RetransmitMode::Off);
        sender.package(1000, false, vec![9]).unwrap();
        let (action, _) = sender.resolve_retransmit(0).unwrap();
        assert_eq!(action, RetransmitAction::Drop);
    }

    #[test]
    fn nack_with_blp_resolves_multiple_seqs() {
        let mut sender = Sender::new(0xdead_beef, 33, RetransmitMode::SameChannel);
        for i in 0..4u32 {
            sender.package(1000 + i, false, vec![i as u8]).unwrap();
        }
        let nack = GenericNack::new(0x1234, 0xdead_beef, vec![(0, 0b110)]);
        let resolved = sender.handle_nack(&nack);
        let seqs: Vec<u16> = resolved.iter().map(|(s, _, _)| *s).collect();
        assert_eq!(seqs, vec![0, 2, 3]);
    }

    #[test]
    fn missing_from_history_is_skipped() {
        let mut sender = Sender::new(0xdead_beef, 33, RetransmitMode::SameChannel);
        sender.package(1000, false, vec![1]).unwrap();
        let nack = GenericNack::new(0x1234, 0xdead_beef, vec![(50, 0)]);
        assert!(sender.handle_nack(&nack).is_empty());
    }
}
