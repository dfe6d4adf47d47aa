//! Work scheduling for the sieves of Gourdon's algorithm.
//!
//! Unlike the LMO balancer, which only varies the number of segments,
//! this balancer first grows the segment size geometrically up to a
//! cap derived from the sieve limit and only then adapts the segment
//! count. Resizing is driven by the leader thread (the worker that
//! processed the most recently assigned interval), whose runtime
//! reflects the current sizing.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::WorkUnit;
use crate::clock::{wtime, Runtime};
use crate::config;
use crate::imath::{ilog, isqrt};
use crate::primes::legal_segment_size;
use crate::status::{load_balance_percent, S2Status};

const WORK_TIME_SAMPLES: usize = 32;

/// Per-worker state threaded through [`GourdonBalancer::get_work`].
#[derive(Debug, Default)]
pub struct GourdonWorker {
    /// First integer of the worker's current interval.
    pub low: i64,
    /// Number of segments of the current interval.
    pub segments: i64,
    /// Segment size of the current interval.
    pub segment_size: i64,
    /// Partial sum of the last processed interval; consumed (and
    /// reset to 0) by the next `get_work` call.
    pub sum: i128,
    /// Timings of the last processed interval.
    pub runtime: Runtime,
}

impl GourdonWorker {
    /// The worker's current interval as a [`WorkUnit`].
    #[must_use]
    pub fn unit(&self) -> WorkUnit {
        WorkUnit {
            low: self.low,
            segments: self.segments,
            segment_size: self.segment_size,
        }
    }
}

#[derive(Debug)]
struct Inner {
    low: i64,
    segments: i64,
    segment_size: i64,
    max_low: i64,
    total: i128,
    work_times: VecDeque<f64>,
}

/// Hands out work units covering `[0, sieve_limit]`; segment sizes are
/// always legal sieve sizes (multiples of 240).
#[derive(Debug)]
pub struct GourdonBalancer {
    sieve_limit: i64,
    max_segment_size: i64,
    sum_approx: i128,
    start_time: f64,
    status: S2Status,
    inner: Mutex<Inner>,
}

impl GourdonBalancer {
    /// Create a balancer for the sieve interval `[0, sieve_limit]`.
    #[must_use]
    pub fn new(x: i128, sieve_limit: i64, sum_approx: i128) -> Self {
        let sqrt_limit = isqrt(sieve_limit);
        let segment_size =
            legal_segment_size((sqrt_limit / ilog(sqrt_limit).max(1)).max(1 << 9));
        let max_segment_size = legal_segment_size(sqrt_limit.max(30 << 15));

        Self {
            sieve_limit,
            max_segment_size,
            sum_approx,
            start_time: wtime(),
            status: S2Status::new(x),
            inner: Mutex::new(Inner {
                low: 0,
                segments: 1,
                segment_size,
                max_low: 0,
                total: 0,
                work_times: VecDeque::with_capacity(WORK_TIME_SAMPLES),
            }),
        }
    }

    /// Assign the next interval to `worker`, consuming its previous
    /// partial sum and runtime. Returns `false` once the assigned
    /// interval lies past the sieve limit (the worker must not
    /// process it).
    pub fn get_work(&self, worker: &mut GourdonWorker) -> bool {
        let (more, total, balance) = {
            let mut inner = self.inner.lock().expect("balancer mutex poisoned");
            inner.total += worker.sum;
            worker.sum = 0;

            if worker.runtime.work > 0.0 {
                if inner.work_times.len() == WORK_TIME_SAMPLES {
                    inner.work_times.pop_front();
                }
                inner.work_times.push_back(worker.runtime.work);
            }

            // Only the leader thread resizes: its runtime was measured
            // with the current segment configuration.
            if worker.low == inner.max_low && inner.total > 0 {
                if inner.segment_size < self.max_segment_size {
                    inner.segment_size =
                        (inner.segment_size * 2).min(self.max_segment_size);
                } else {
                    self.update_segments(&mut inner, &worker.runtime);
                }
            }

            worker.low = inner.low;
            worker.segments = inner.segments;
            worker.segment_size = inner.segment_size;
            inner.max_low = worker.low;
            inner.low += inner.segments * inner.segment_size;

            let balance = load_balance_percent(inner.work_times.make_contiguous());
            (worker.low <= self.sieve_limit, inner.total, balance)
        };

        if config::is_print() {
            self.status.print(total, self.sum_approx, balance);
        }

        more
    }

    /// The accumulated sum of all consumed worker sums.
    #[must_use]
    pub fn result(&self) -> i128 {
        self.inner.lock().expect("balancer mutex poisoned").total
    }

    // Rescale the segment count by threshold / work_time, where the
    // threshold is a quarter of the estimated remaining time. The
    // factor is clamped so one decision never more than doubles or
    // halves the unit, and capped when sieving dwarfs segment
    // initialization by more than 1000x.
    fn update_segments(&self, inner: &mut Inner, runtime: &Runtime) {
        let percent =
            S2Status::skewed_percent(inner.total, self.sum_approx).clamp(10.0, 100.0);
        let elapsed = wtime() - self.start_time;
        let remaining = elapsed * (100.0 / percent - 1.0);
        let threshold = (remaining / 4.0).max(runtime.init * 10.0).max(0.01);
        let divider = runtime.work.max(0.001);
        let mut factor = threshold / divider;
        if runtime.work > 0.01 && runtime.work > runtime.init * 1000.0 {
            factor = factor.min(runtime.init * 1000.0 / runtime.work);
        }
        let factor = factor.clamp(0.5, 2.0);
        inner.segments = ((inner.segments as f64 * factor).round() as i64).max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(balancer: &GourdonBalancer, sum_per_unit: i128, work: f64) -> Vec<WorkUnit> {
        let mut worker = GourdonWorker::default();
        let mut units = Vec::new();
        while balancer.get_work(&mut worker) {
            units.push(worker.unit());
            worker.sum = sum_per_unit;
            worker.runtime.work = work;
        }
        units
    }

    #[test]
    fn test_segment_sizes_are_legal() {
        let limit = 10_000_000;
        let balancer = GourdonBalancer::new(10i128.pow(14), limit, 1000);
        let units = drain(&balancer, 1, 0.0);
        for unit in &units {
            assert_eq!(unit.segment_size % 240, 0, "illegal segment size");
            assert!(unit.segments >= 1);
        }
    }

    #[test]
    fn test_contiguous_cover_from_zero() {
        let limit = 5_000_000;
        let balancer = GourdonBalancer::new(10i128.pow(14), limit, 1000);
        let units = drain(&balancer, 1, 0.0);

        let mut expected_low = 0;
        for unit in &units {
            assert_eq!(unit.low, expected_low, "gap or overlap in cover");
            expected_low = unit.high();
        }
        // the cover reaches past the inclusive sieve limit
        assert!(expected_low > limit);

        let mut worker = GourdonWorker::default();
        worker.low = units.last().expect("non-empty").high();
        assert!(!balancer.get_work(&mut worker));
    }

    #[test]
    fn test_segment_size_doubles_before_segments_grow() {
        let limit = 100_000_000;
        let balancer = GourdonBalancer::new(10i128.pow(14), limit, 1000);
        let units = drain(&balancer, 1, 0.0);

        let first = units.first().expect("non-empty");
        let mut sizes: Vec<i64> = units.iter().map(|u| u.segment_size).collect();
        sizes.dedup();
        // strictly doubling (modulo the cap) while segments stay at 1
        for pair in sizes.windows(2) {
            assert!(pair[1] >= pair[0] * 2 || pair[1] == units.last().map(|u| u.segment_size).expect("non-empty"));
        }
        assert_eq!(first.segments, 1);

        // once the cap is reached, segments may grow but sizes stop
        let max_size = *sizes.last().expect("non-empty");
        for unit in units.iter().filter(|u| u.segment_size == max_size) {
            assert!(unit.segments >= 1);
        }
    }

    #[test]
    fn test_segments_shrink_with_slow_workers() {
        let limit = 1i64 << 40;
        let balancer = GourdonBalancer::new(10i128.pow(14), limit, 1000);
        let mut worker = GourdonWorker::default();

        // fast rounds until the segment size stops doubling (cap hit)
        loop {
            let prev = worker.segment_size;
            assert!(balancer.get_work(&mut worker));
            worker.sum = 1;
            worker.runtime.work = 0.0;
            if worker.segment_size == prev {
                break;
            }
        }
        // two more fast rounds grow the segment count
        for _ in 0..2 {
            assert!(balancer.get_work(&mut worker));
            worker.sum = 1;
            worker.runtime.work = 0.0;
        }
        assert!(worker.segments >= 2);

        // pathologically slow rounds must halve segments down to 1
        let mut last_segments = worker.segments;
        worker.runtime.work = 1e9;
        for _ in 0..10 {
            assert!(balancer.get_work(&mut worker));
            assert!(worker.segments <= last_segments);
            last_segments = worker.segments;
            worker.sum = 1;
            worker.runtime.work = 1e9;
        }
        assert_eq!(last_segments, 1);
    }

    #[test]
    fn test_result_accumulates_final_sum() {
        let balancer = GourdonBalancer::new(10i128.pow(14), 1_000_000, 1000);
        let units = drain(&balancer, 3, 0.0);
        // one consumed sum per unit, including the final rejected call
        assert_eq!(balancer.result(), i128::from(units.len() as i64) * 3);
    }
}
