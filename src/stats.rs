// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Verdicts, the external action taxonomy, and per-action statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// The final disposition chosen for a packet.
///
/// Produced exactly once per packet and immutable once chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Hand the packet to the normal stack unmodified (or with whatever
    /// mutations were applied before the decision).
    Pass,
    /// Discard the packet.
    Drop,
    /// Send the packet back out the interface it arrived on.
    Transmit,
    /// Send the packet out the given interface.
    Redirect(u32),
}

/// The external action taxonomy statistics are keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Action {
    Pass = 0,
    Drop = 1,
    Tx = 2,
    Redirect = 3,
}

impl Action {
    /// Every action, in counter order.
    pub const ALL: [Action; 4] = [Action::Pass, Action::Drop, Action::Tx, Action::Redirect];
}

impl Verdict {
    /// The action this verdict maps to. Total over both taxonomies.
    pub fn action(&self) -> Action {
        match self {
            Verdict::Pass => Action::Pass,
            Verdict::Drop => Action::Drop,
            Verdict::Transmit => Action::Tx,
            Verdict::Redirect(_) => Action::Redirect,
        }
    }
}

#[derive(Default)]
struct ActionCounter {
    packets: AtomicU64,
    bytes: AtomicU64,
}

/// Per-action packet and byte counters.
///
/// Incremented exactly once per packet, concurrently from any number of
/// processing contexts; readers see each counter independently.
#[derive(Default)]
pub struct StatsCollector {
    counters: [ActionCounter; 4],
}

impl StatsCollector {
    pub fn new() -> StatsCollector {
        StatsCollector::default()
    }

    /// Record the final verdict for one packet of `bytes` length and hand
    /// the verdict back, so programs can return through a single record
    /// call.
    pub fn record(&self, verdict: Verdict, bytes: u64) -> Verdict {
        let counter = &self.counters[verdict.action() as usize];
        counter.packets.fetch_add(1, Ordering::Relaxed);
        counter.bytes.fetch_add(bytes, Ordering::Relaxed);
        verdict
    }

    pub fn packets(&self, action: Action) -> u64 {
        self.counters[action as usize].packets.load(Ordering::Relaxed)
    }

    pub fn bytes(&self, action: Action) -> u64 {
        self.counters[action as usize].bytes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_to_action_is_total() {
        assert_eq!(Verdict::Pass.action(), Action::Pass);
        assert_eq!(Verdict::Drop.action(), Action::Drop);
        assert_eq!(Verdict::Transmit.action(), Action::Tx);
        assert_eq!(Verdict::Redirect(9).action(), Action::Redirect);
    }

    #[test]
    fn record_increments_exactly_one_counter() {
        let stats = StatsCollector::new();
        assert_eq!(stats.record(Verdict::Transmit, 60), Verdict::Transmit);

        for action in Action::ALL {
            let expected = u64::from(action == Action::Tx);
            assert_eq!(stats.packets(action), expected, "{:?}", action);
            assert_eq!(stats.bytes(action), expected * 60, "{:?}", action);
        }
    }

    #[test]
    fn counters_accumulate() {
        let stats = StatsCollector::new();
        stats.record(Verdict::Redirect(1), 100);
        stats.record(Verdict::Redirect(2), 50);
        assert_eq!(stats.packets(Action::Redirect), 2);
        assert_eq!(stats.bytes(Action::Redirect), 150);
    }
}
