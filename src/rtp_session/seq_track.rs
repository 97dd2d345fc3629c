//! Per-SSRC sequence-number tracking, RFC 3550 Appendix A.1 exactly, per
//! `RTPSink::Source::updateSeq`. Probation initializes state against the
//! first `kMinSequential` in-order packets; out-of-order packets during
//! probation restart it; once past probation, a very large forward jump is
//! treated as a re-sync candidate rather than accepted outright.
const K_MIN_SEQUENTIAL: u32 = 2;
const K_MAX_DROPOUT: u32 = 3000;
const K_MAX_MISORDER: u32 = 100;
const K_RTP_SEQ_MOD: u32 = 1 << 16;

#[derive(Debug, Clone)]
pub struct SeqTracker {
    max_seq: u16,
    cycles: u32,
    base_seq: u32,
    bad_seq: u32,
    probation: u32,
    received: u32,
    expected_prior: u32,
    received_prior: u32,
}

/// Outcome of feeding one packet through the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqOutcome {
    /// Packet accepted; queue it. Carries the extended (cycles|seq) value.
    Accept { extended_seq: u32 },
    /// Packet rejected (still in probation, or a first half of a suspected
    /// re-sync jump): do not queue it.
    Reject,
}

impl SeqTracker {
    /// Creates the tracker from the first packet seen for this SSRC. The
    /// first packet is consumed here (`max_seq = first_seq`), leaving
    /// `kMinSequential - 1` further in-order packets to clear probation.
    pub fn new(first_seq: u16) -> (Self, SeqOutcome) {
        let t = Self {
            max_seq: first_seq,
            cycles: 0,
            base_seq: u32::from(first_seq),
            bad_seq: K_RTP_SEQ_MOD + 1,
            probation: K_MIN_SEQUENTIAL - 1,
            received: 0,
            expected_prior: 0,
            received_prior: 0,
        };
        let extended_seq = t.cycles | u32::from(first_seq);
        (t, SeqOutcome::Accept { extended_seq })
    }

    fn init_seq(&mut self, seq: u16) {
        self.max_seq = seq;
        self.cycles = 0;
        self.base_seq = u32::from(seq);
        self.bad_seq = K_RTP_SEQ_MOD + 1;
        self.received = 0;
        self.expected_prior = 0;
        self.received_prior = 0;
    }

    /// Feeds the next packet's 16-bit seq through the RFC 3550 A.1 state
    /// machine. Returns whether to accept (queue) the packet.
    pub fn update_seq(&mut self, seq: u16) -> SeqOutcome {
        if self.probation > 0 {
            if seq == self.max_seq.wrapping_add(1) {
                let extended_seq = self.cycles | u32::from(seq);
                self.probation -= 1;
                self.max_seq = seq;
                if self.probation == 0 {
                    self.init_seq(seq);
                    self.received += 1;
                }
                return SeqOutcome::Accept { extended_seq };
            }
            // Out of sequence: restart the startup phase.
            self.probation = K_MIN_SEQUENTIAL - 1;
            self.max_seq = seq;
            let extended_seq = self.cycles | u32::from(seq);
            return SeqOutcome::Accept { extended_seq };
        }

        let udelta = seq.wrapping_sub(self.max_seq);
        let udelta = u32::from(udelta);

        if udelta < K_MAX_DROPOUT {
            if seq < self.max_seq {
                self.cycles += K_RTP_SEQ_MOD;
            }
            self.max_seq = seq;
        } else if udelta <= K_RTP_SEQ_MOD - K_MAX_MISORDER {
            if u32::from(seq) == self.bad_seq {
                self.init_seq(seq);
            } else {
                self.bad_seq = (u32::from(seq) + 1) & (K_RTP_SEQ_MOD - 1);
                return SeqOutcome::Reject;
            }
        }
        // else: duplicate or reordered packet -- counted, not advanced.

        self.received += 1;
        let extended_seq = self.cycles | u32::from(seq);
        SeqOutcome::Accept { extended_seq }
    }

    #[must_use]
    pub fn extended_max_seq(&self) -> u32 {
        self.cycles | u32::from(self.max_seq)
    }

    #[must_use]
    pub fn received(&self) -> u32 {
        self.received
    }

    #[must_use]
    pub fn base_seq(&self) -> u32 {
        self.base_seq
    }

    /// Computes one RTCP report block's loss fields, per
    /// `RTPSink::Source::addReportBlock`.
    pub fn loss_fields(&mut self) -> (u8, i32, u32) {
        let ext_max_seq = self.extended_max_seq();
        let expected = ext_max_seq.wrapping_sub(self.base_seq).wrapping_add(1);

        let mut lost = i64::from(expected) - i64::from(self.received);
        lost = lost.clamp(-0x0080_0000, 0x007f_ffff);

        let expected_interval = expected.wrapping_sub(self.expected_prior);
        self.expected_prior = expected;

        let received_interval = self.received.wrapping_sub(self.received_prior);
        self.received_prior = self.received;

        let lost_interval = i64::from(expected_interval) - i64::from(received_interval);

        let fraction_lost = if expected_interval == 0 || lost_interval <= 0 {
            0u8
        } else {
            ((lost_interval << 8) / i64::from(expected_interval)) as u8
        };

        (fraction_lost, lost as i32, ext_max_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_sequence_probation() {
        let (mut t, out) = SeqTracker::new(100);
        assert_eq!(out, SeqOutcome::Accept { extended_seq: 100 });
        assert_eq!(t.probation, K_MIN_SEQUENTIAL - 1);

        let out = t.update_seq(101);
        assert_eq!(out, SeqOutcome::Accept { extended_seq: 101 });
        assert_eq!(t.probation, 0);
        assert_eq!(t.received, 1);
        assert_eq!(t.max_seq, 101);

        let out = t.update_seq(102);
        assert_eq!(out, SeqOutcome::Accept { extended_seq: 102 });
        assert_eq!(t.received, 2);
        assert_eq!(t.max_seq, 102);
        assert_eq!(t.extended_max_seq(), 102);
    }

    #[test]
    fn s2_sequence_wrap() {
        let (mut t, _) = SeqTracker::new(65534);
        t.update_seq(65535);
        assert_eq!(t.probation, 0);

        let out = t.update_seq(0);
        assert_eq!(out, SeqOutcome::Accept { extended_seq: 65536 });
        let out = t.update_seq(1);
        assert_eq!(out, SeqOutcome::Accept { extended_seq: 65537 });
        assert_eq!(t.cycles, 65536);
        assert_eq!(t.max_seq, 1);
        assert_eq!(t.extended_max_seq(), 65537);
    }

    #[test]
    fn s3_large_forward_jump_then_resync() {
        // Prime with 2 in-order packets to clear probation at max_seq=100.
        let (mut t, _) = SeqTracker::new(99);
        t.update_seq(100);
        assert_eq!(t.probation, 0);
        assert_eq!(t.max_seq, 100);

        let out = t.update_seq(40000);
        assert_eq!(out, SeqOutcome::Reject);
        assert_eq!(t.bad_seq, 40001);

        let out = t.update_seq(40000);
        assert_eq!(out, SeqOutcome::Reject);
        assert_eq!(t.bad_seq, 40001);

        let out = t.update_seq(40001);
        assert_eq!(out, SeqOutcome::Accept { extended_seq: 40001 });
        assert_eq!(t.max_seq, 40001);
        assert_eq!(t.base_seq, 40001);
    }

    #[test]
    fn duplicate_packet_does_not_advance_max_seq() {
        let (mut t, _) = SeqTracker::new(9);
        t.update_seq(10);
        assert_eq!(t.max_seq, 10);
        let before = t.received;
        let out = t.update_seq(10);
        assert_eq!(out, SeqOutcome::Accept { extended_seq: 10 });
        assert_eq!(t.max_seq, 10);
        assert_eq!(t.received, before + 1);
    }
}
