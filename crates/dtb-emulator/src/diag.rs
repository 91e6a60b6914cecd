//! Session diagnostics counters.

use crate::{FaultClass, FaultCode};

/// Saturating counters describing what a session has done so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DiagCounters {
    /// The last fault code that occurred, if any.
    pub last_fault_code: Option<FaultCode>,
    /// Triggers requested through trigger or sweep calls.
    pub trigger_count: u32,
    /// Events appended to channel queues, summed over channels.
    pub events_synthesised: u64,
    /// Words appended to channel queues.
    pub words_synthesised: u64,
    /// Words handed out by channel reads.
    pub words_drained: u64,
    /// Emulated RPCs that only logged their call.
    pub noop_calls: u32,
    /// Saturating counter for bounds-class faults.
    pub fault_count_bounds: u16,
    /// Saturating counter for encoding-class faults.
    pub fault_count_encoding: u16,
    /// Saturating counter for distribution-class faults.
    pub fault_count_distribution: u16,
}

impl DiagCounters {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fault occurrence, updating the last fault and the counter of
    /// its class.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_fault(&mut self, code: FaultCode) {
        self.last_fault_code = Some(code);
        match code.class() {
            FaultClass::Bounds => {
                self.fault_count_bounds = self.fault_count_bounds.saturating_add(1);
            }
            FaultClass::Encoding => {
                self.fault_count_encoding = self.fault_count_encoding.saturating_add(1);
            }
            FaultClass::Distribution => {
                self.fault_count_distribution = self.fault_count_distribution.saturating_add(1);
            }
        }
    }

    /// Records the outcome of one synthesis call.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_synthesis(&mut self, triggers: u32, events: u64, words: u64) {
        self.trigger_count = self.trigger_count.saturating_add(triggers);
        self.events_synthesised = self.events_synthesised.saturating_add(events);
        self.words_synthesised = self.words_synthesised.saturating_add(words);
    }

    /// Records words handed to the host by a read.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_drain(&mut self, words: usize) {
        self.words_drained = self
            .words_drained
            .saturating_add(u64::try_from(words).unwrap_or(u64::MAX));
    }

    /// Records an emulated no-op call.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_noop(&mut self) {
        self.noop_calls = self.noop_calls.saturating_add(1);
    }

    /// Total faults over every class.
    #[must_use]
    pub const fn fault_total(&self) -> u32 {
        self.fault_count_bounds as u32
            + self.fault_count_encoding as u32
            + self.fault_count_distribution as u32
    }

    /// Resets all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
