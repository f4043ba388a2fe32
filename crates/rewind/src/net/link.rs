//! Tick-driven lossy link for running client and server sessions in one
//! process.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkConditions {
    pub loss_percent: f32,
    pub min_latency_ticks: u32,
    pub max_latency_ticks: u32,
    pub jitter_ticks: u32,
}

impl LinkConditions {
    pub fn perfect() -> Self {
        Self::default()
    }

    pub fn latency(ticks: u32) -> Self {
        Self {
            min_latency_ticks: ticks,
            max_latency_ticks: ticks,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub sent: u64,
    pub dropped: u64,
    pub delivered: u64,
}

#[derive(Debug)]
struct InFlight<T> {
    release_tick: u32,
    sequence: u64,
    message: T,
}

impl<T> PartialEq for InFlight<T> {
    fn eq(&self, other: &Self) -> bool {
        self.release_tick == other.release_tick && self.sequence == other.sequence
    }
}

impl<T> Eq for InFlight<T> {}

impl<T> PartialOrd for InFlight<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for InFlight<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; equal release ticks keep send order.
        other
            .release_tick
            .cmp(&self.release_tick)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// One direction of a simulated connection.
#[derive(Debug)]
pub struct LinkSimulator<T> {
    conditions: LinkConditions,
    rng: StdRng,
    in_flight: BinaryHeap<InFlight<T>>,
    next_sequence: u64,
    stats: LinkStats,
}

impl<T> LinkSimulator<T> {
    pub fn new(conditions: LinkConditions, seed: u64) -> Self {
        Self {
            conditions,
            rng: StdRng::seed_from_u64(seed),
            in_flight: BinaryHeap::new(),
            next_sequence: 0,
            stats: LinkStats::default(),
        }
    }

    pub fn conditions(&self) -> &LinkConditions {
        &self.conditions
    }

    pub fn set_conditions(&mut self, conditions: LinkConditions) {
        self.conditions = conditions;
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn should_drop(&mut self) -> bool {
        self.conditions.loss_percent > 0.0
            && self.rng.gen_range(0.0..100.0f32) < self.conditions.loss_percent
    }

    fn delay_ticks(&mut self) -> u32 {
        let LinkConditions {
            min_latency_ticks: min,
            max_latency_ticks: max,
            jitter_ticks: jitter,
            ..
        } = self.conditions;
        let base = if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        };
        let jitter = if jitter > 0 {
            self.rng.gen_range(0..=jitter)
        } else {
            0
        };
        base + jitter
    }

    /// Sends `message` at `now`; returns `false` if the link dropped it.
    pub fn send(&mut self, now: u32, message: T) -> bool {
        self.stats.sent += 1;
        if self.should_drop() {
            self.stats.dropped += 1;
            return false;
        }

        let release_tick = now.saturating_add(self.delay_ticks());
        self.in_flight.push(InFlight {
            release_tick,
            sequence: self.next_sequence,
            message,
        });
        self.next_sequence += 1;
        true
    }

    /// Everything due at or before `now`, in arrival order.
    pub fn deliver(&mut self, now: u32) -> Vec<T> {
        let mut delivered = Vec::new();
        while self
            .in_flight
            .peek()
            .is_some_and(|next| next.release_tick <= now)
        {
            if let Some(next) = self.in_flight.pop() {
                delivered.push(next.message);
            }
        }
        self.stats.delivered += delivered.len() as u64;
        delivered
    }
}
