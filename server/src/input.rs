//! Per-player input buffering keyed by sequence number.
//!
//! Clients send one input per frame, but frames can arrive duplicated or out
//! of order. Inputs are buffered by sequence and consumed oldest-first, one
//! per tick, so the applied order is strictly increasing no matter how the
//! network reorders them.

use race_shared::{InputState, Sequence};
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    pending: BTreeMap<Sequence, InputState>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers an input. The first value received for a sequence wins;
    /// later duplicates are ignored. Returns true if the input was buffered.
    pub fn queue(&mut self, sequence: Sequence, input: InputState) -> bool {
        if self.pending.contains_key(&sequence) {
            return false;
        }
        self.pending.insert(sequence, input);
        true
    }

    /// Removes and returns the smallest buffered input newer than
    /// `last_processed`. Entries at or below `last_processed` can never be
    /// applied and are discarded.
    pub fn consume_next(&mut self, last_processed: Sequence) -> Option<(Sequence, InputState)> {
        if let Some((&oldest, _)) = self.pending.first_key_value() {
            if oldest <= last_processed {
                self.pending = self.pending.split_off(&last_processed.saturating_add(1));
            }
        }

        let sequence = *self
            .pending
            .range((Excluded(last_processed), Unbounded))
            .next()?
            .0;
        let input = self.pending.remove(&sequence)?;
        Some((sequence, input))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
