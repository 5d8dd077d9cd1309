//! Batch partitioning and staggered start delays.
//!
//! Work items are cut into fixed-size batches that run one after another.
//! Inside a batch every item gets an independent start delay drawn from an
//! exponential distribution, so requests trickle into the external API
//! instead of arriving as one burst when the batch opens.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::item::WorkItem;

/// One sequential group of work items with their start delays.
#[derive(Debug, Clone)]
pub struct Batch {
    /// 1-based position of this batch in the run
    pub seq: usize,
    pub items: Vec<(WorkItem, Duration)>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Assigns batches and per-item delays.
#[derive(Debug, Clone)]
pub struct Scheduler {
    batch_size: usize,
    /// Mean of the exponential start delay
    scale: Duration,
    base_seed: u64,
}

impl Scheduler {
    /// `seed = None` draws a fresh base seed; each batch is re-seeded from it.
    pub fn new(batch_size: usize, scale: Duration, seed: Option<u64>) -> Self {
        Self {
            batch_size: batch_size.max(1),
            scale,
            base_seed: seed.unwrap_or_else(|| rand::rng().random()),
        }
    }

    /// Partition `items` into batches of at most `batch_size`, preserving order.
    pub fn partition(&self, items: Vec<WorkItem>) -> Vec<Batch> {
        let mut batches = Vec::with_capacity(items.len().div_ceil(self.batch_size));
        let mut iter = items.into_iter().peekable();
        let mut seq = 0;
        while iter.peek().is_some() {
            seq += 1;
            let chunk: Vec<WorkItem> = iter.by_ref().take(self.batch_size).collect();
            let delays = self.delays(seq, chunk.len());
            batches.push(Batch {
                seq,
                items: chunk.into_iter().zip(delays).collect(),
            });
        }
        batches
    }

    /// Draw `n` exponential delays for batch `seq`.
    pub fn delays(&self, seq: usize, n: usize) -> Vec<Duration> {
        if self.scale.is_zero() {
            return vec![Duration::ZERO; n];
        }
        let mut rng = StdRng::seed_from_u64(self.base_seed.wrapping_add(seq as u64));
        (0..n)
            .map(|_| exponential(&mut rng, self.scale))
            .collect()
    }
}

/// Inverse-CDF sample of Exp(mean = `scale`)
fn exponential(rng: &mut impl Rng, scale: Duration) -> Duration {
    // u in [0, 1) so 1 - u in (0, 1] and ln is finite and <= 0
    let u: f64 = rng.random();
    let secs = -scale.as_secs_f64() * (1.0 - u).ln();
    Duration::from_secs_f64(secs.max(0.0))
}
