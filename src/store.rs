/// Record accumulation and gap tracking
///
/// Tracks which sequence numbers have been captured and which are still
/// missing below the highest sequence observed. One store per client run;
/// populated by the full-stream phase, supplemented by recovery, then read
/// once for export.

use crate::protocol::Record;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct RecordStore {
    seen: HashSet<u32>,
    records: Vec<Record>,
    max_sequence: u32,
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore {
            seen: HashSet::new(),
            records: Vec::new(),
            max_sequence: 0,
        }
    }

    /// Insert a record; returns whether its sequence number was new.
    ///
    /// A duplicate sequence updates nothing: the arrival list is kept
    /// deduplicated along with the membership set, so the first frame per
    /// sequence wins.
    pub fn insert(&mut self, record: Record) -> bool {
        if !self.seen.insert(record.sequence) {
            return false;
        }
        if record.sequence > self.max_sequence {
            self.max_sequence = record.sequence;
        }
        self.records.push(record);
        true
    }

    pub fn contains(&self, sequence: u32) -> bool {
        self.seen.contains(&sequence)
    }

    /// Highest sequence number observed; 0 until anything arrives.
    pub fn max_sequence(&self) -> u32 {
        self.max_sequence
    }

    /// Every sequence in [1, max_sequence] not yet captured, ascending.
    /// Empty when nothing has been received at all.
    pub fn missing_sequences(&self) -> Vec<u32> {
        (1..=self.max_sequence)
            .filter(|seq| !self.seen.contains(seq))
            .collect()
    }

    /// Records in arrival order, not sequence order. Callers that need
    /// sequence order sort explicitly.
    pub fn export(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}
