//! Sink-side reorder queue and gap-driven NACK scheduling, the
//! `TunnelRenderer`-equivalent: reassembles incoming RTP payloads (already
//! extended-seq tagged by `rtp_session::seq_track::SeqTracker`) into
//! presentation order and, when the next expected seq is missing, waits up
//! to a first-failure window before requesting retransmission.
use std::collections::BTreeMap;

/// Time a gap is tolerated before a NACK fires for it.
pub const FIRST_FAILURE_WINDOW_MS: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderAction {
    None,
    EmitNack { seq: u16 },
}

/// Orders packets by extended sequence number and surfaces gaps as NACK
/// requests. `extended_seq` must come from the same cycle-extended counter
/// `SeqTracker` produces, so wraparound is already resolved before packets
/// reach this queue.
pub struct ReorderQueue {
    next_expected: Option<u32>,
    pending: BTreeMap<u32, Vec<u8>>,
    gap_opened_at_ms: Option<i64>,
    nack_sent_for_gap: bool,
}

impl Default for ReorderQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ReorderQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_expected: None,
            pending: BTreeMap::new(),
            gap_opened_at_ms: None,
            nack_sent_for_gap: false,
        }
    }

    /// Queues one packet's payload under its extended sequence number.
    /// Duplicates (an already-delivered or already-queued seq) are dropped.
    pub fn push(&mut self, extended_seq: u32, payload: Vec<u8>) {
        if let Some(next) = self.next_expected
            && extended_seq < next
        {
            return; // already delivered
        }
        self.pending.entry(extended_seq).or_insert(payload);
        if self.next_expected.is_none() {
            self.next_expected = Some(extended_seq);
        }
    }

    /// Pops every payload that is now contiguous with the last delivered
    /// seq, in order. Closes an open gap (resets the NACK timer) the moment
    /// the missing seq is filled in.
    pub fn drain_ready(&mut self) -> Vec<Vec<u8>> {
        let Some(mut next) = self.next_expected else {
            return Vec::new();
        };
        let mut out = Vec::new();
        while let Some(payload) = self.pending.remove(&next) {
            out.push(payload);
            next = next.wrapping_add(1);
        }
        self.next_expected = Some(next);
        if !out.is_empty() {
            self.gap_opened_at_ms = None;
            self.nack_sent_for_gap = false;
        }
        out
    }

    /// Whether the head of the queue is currently a gap (next expected seq
    /// not yet received, but a later one is queued).
    #[must_use]
    fn has_open_gap(&self) -> bool {
        match self.next_expected {
            Some(next) => !self.pending.is_empty() && !self.pending.contains_key(&next),
            None => false,
        }
    }

    /// Call once per reorder-worker tick. Opens the first-failure timer the
    /// moment a gap is observed; emits exactly one NACK for that gap once
    /// `FIRST_FAILURE_WINDOW_MS` has elapsed without it closing.
    pub fn tick(&mut self, now_ms: i64) -> ReorderAction {
        if !self.has_open_gap() {
            self.gap_opened_at_ms = None;
            self.nack_sent_for_gap = false;
            return ReorderAction::None;
        }
        let opened_at = *self.gap_opened_at_ms.get_or_insert(now_ms);
        if !self.nack_sent_for_gap && now_ms - opened_at >= FIRST_FAILURE_WINDOW_MS {
            self.nack_sent_for_gap = true;
            let seq = self.next_expected.expect("has_open_gap implies next_expected is set") as u16;
            return ReorderAction::EmitNack { seq };
        }
        ReorderAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_packets_drain_immediately() {
        let mut q = ReorderQueue::new();
        q.push(0, vec![0]);
        q.push(1, vec![1]);
        q.push(2, vec![2]);
        assert_eq!(q.drain_ready(), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn gap_holds_back_later_packets_until_filled() {
        let mut q = ReorderQueue::new();
        q.push(0, vec![0]);
        q.push(2, vec![2]);
        assert_eq!(q.drain_ready(), vec![vec![0]]);
        assert!(q.drain_ready().is_empty()); // seq 1 still missing

        q.push(1, vec![1]);
        assert_eq!(q.drain_ready(), vec![vec![1], vec![2]]);
    }

    #[test]
    fn nack_fires_once_after_first_failure_window_then_resets_on_recovery() {
        let mut q = ReorderQueue::new();
        q.push(0, vec![0]);
        assert_eq!(q.drain_ready(), vec![vec![0]]);
        q.push(2, vec![2]); // seq 1 missing -> gap opens at whatever tick observes it

        assert_eq!(q.tick(1_000), ReorderAction::None); // opens the gap timer
        assert_eq!(q.tick(1_010), ReorderAction::None); // still inside the window
        assert_eq!(q.tick(1_020), ReorderAction::EmitNack { seq: 1 });
        assert_eq!(q.tick(1_025), ReorderAction::None); // already sent for this gap

        q.push(1, vec![1]);
        assert_eq!(q.drain_ready(), vec![vec![1], vec![2]]);
        assert_eq!(q.tick(1_030), ReorderAction::None);
    }

    #[test]
    fn duplicate_seq_is_dropped() {
        let mut q = ReorderQueue::new();
        q.push(0, vec![0]);
        q.drain_ready();
        q.push(0, vec![99]); // already delivered
        assert!(q.drain_ready().is_empty());
    }
}
