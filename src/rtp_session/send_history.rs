//! Bounded record of recently-sent RTP packets, keyed by sequence number,
//! used to answer NACKs with a retransmit. Mirrors `Sender::kMaxHistoryLength`:
//! a fixed-capacity ring that silently forgets packets older than the most
//! recent 128 once full.
use std::collections::VecDeque;

use bytes::Bytes;

pub const MAX_HISTORY_LENGTH: usize = 128;

pub struct SendHistory {
    capacity: usize,
    entries: VecDeque<(u16, Bytes)>,
}

impl SendHistory {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY_LENGTH)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, seq: u16, packet: Bytes) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((seq, packet));
    }

    /// Looks up a previously sent packet by sequence number. Returns `None`
    /// both for seqs never sent and for seqs already evicted.
    pub fn get(&self, seq: u16) -> Option<Bytes> {
        self.entries
            .iter()
            .rev()
            .find(|(s, _)| *s == seq)
            .map(|(_, b)| b.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SendHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retains_most_recent_and_finds_by_seq() {
        let mut h = SendHistory::with_capacity(4);
        for seq in 0u16..4 {
            h.push(seq, Bytes::from(vec![seq as u8]));
        }
        assert_eq!(h.len(), 4);
        assert_eq!(h.get(2).unwrap().as_ref(), &[2u8]);
    }

    #[test]
    fn eviction_forgets_oldest() {
        let mut h = SendHistory::with_capacity(2);
        h.push(1, Bytes::from_static(b"a"));
        h.push(2, Bytes::from_static(b"b"));
        h.push(3, Bytes::from_static(b"c"));
        assert_eq!(h.len(), 2);
        assert!(h.get(1).is_none());
        assert!(h.get(2).is_some());
        assert!(h.get(3).is_some());
    }

    #[test]
    fn missing_seq_is_none() {
        let h = SendHistory::with_capacity(4);
        assert!(h.get(99).is_none());
    }
}
