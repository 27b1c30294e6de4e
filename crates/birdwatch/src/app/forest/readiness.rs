use std::collections::HashSet;

use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Counted { count: usize },
    /// This record brought the count to the target.
    Ready { count: usize },
    Duplicate,
}

/// Counts distinct entity slots that finished loading.
///
/// A target of zero is never reached: readiness is only signalled by a
/// record that brings the count up to the target.
#[derive(Debug, Clone)]
pub struct ReadinessCounter {
    target: usize,
    counted: HashSet<usize>,
    failed: HashSet<usize>,
}

impl ReadinessCounter {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            counted: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    pub fn record_loaded(&mut self, slot: usize) -> Recorded {
        if self.failed.contains(&slot) || !self.counted.insert(slot) {
            warn!(slot, count = self.count(), "readiness_duplicate_rejected");
            return Recorded::Duplicate;
        }

        let count = self.count();
        if count > self.target {
            error!(slot, count, target = self.target, "readiness_count_exceeded_target");
            return Recorded::Counted { count };
        }
        if count == self.target {
            Recorded::Ready { count }
        } else {
            Recorded::Counted { count }
        }
    }

    /// Returns `false` when the slot had already settled.
    pub fn record_failed(&mut self, slot: usize) -> bool {
        if self.counted.contains(&slot) || !self.failed.insert(slot) {
            warn!(slot, "readiness_duplicate_failure_rejected");
            return false;
        }
        true
    }

    pub fn is_recorded(&self, slot: usize) -> bool {
        self.counted.contains(&slot) || self.failed.contains(&slot)
    }

    pub fn count(&self) -> usize {
        self.counted.len()
    }

    pub fn failed(&self) -> usize {
        self.failed.len()
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn is_ready(&self) -> bool {
        self.target > 0 && self.count() >= self.target
    }

    /// Everything expected has settled, short of the target because of failures.
    pub fn is_degraded(&self) -> bool {
        self.target > 0
            && self.failed() > 0
            && self.count() < self.target
            && self.count() + self.failed() >= self.target
    }
}
