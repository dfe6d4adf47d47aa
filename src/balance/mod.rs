//! Adaptive load balancers that hand out sieve intervals to workers.
//!
//! Subdividing the sieve interval into equally sized chunks per thread
//! does not scale: the distribution of the special leaves is highly
//! skewed and most of them sit in the first few segments. Both
//! balancers therefore start with small work units to spread the dense
//! prefix across all workers, grow the units once the leaves thin out,
//! and shrink them again near the end so no straggler runs much longer
//! than a quarter of the estimated remaining time.

mod gourdon;
mod lmo;

pub use gourdon::{GourdonBalancer, GourdonWorker};
pub use lmo::LoadBalancer;

/// A unit of work handed to a sieve worker: `segments` consecutive
/// segments of `segment_size` integers starting at `low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkUnit {
    /// First integer of the interval.
    pub low: i64,
    /// Number of consecutive segments.
    pub segments: i64,
    /// Size of each segment.
    pub segment_size: i64,
}

impl WorkUnit {
    /// One past the last integer of the interval (uncapped).
    #[must_use]
    pub fn high(&self) -> i64 {
        self.low + self.segments * self.segment_size
    }
}
