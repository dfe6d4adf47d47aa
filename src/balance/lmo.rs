//! Work scheduling for the special-leaf sieves of the
//! Lagarias-Miller-Odlyzko and Deleglise-Rivat algorithms.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::WorkUnit;
use crate::clock::{wtime, Runtime};
use crate::config;
use crate::imath::{ceil_div, iroot, isqrt, next_power_of_2};
use crate::status::{load_balance_percent, S2Status};

// Number of recent work-unit durations kept for the RSD estimate.
const WORK_TIME_SAMPLES: usize = 32;

#[derive(Debug)]
struct Inner {
    low: i64,
    segments: i64,
    segment_size: i64,
    total: i128,
    work_times: VecDeque<f64>,
}

/// Hands out `(low, segments, segment_size)` work units covering
/// `[1, z + 1)` and adapts the unit size to the workers' runtimes.
///
/// All state is mutated under a single mutex; workers block only for
/// the microseconds it takes to take the next snapshot.
#[derive(Debug)]
pub struct LoadBalancer {
    limit: i64,
    smallest_hard_leaf: i64,
    sum_approx: i128,
    start_time: f64,
    status: S2Status,
    inner: Mutex<Inner>,
}

impl LoadBalancer {
    /// Create a balancer for the sieve interval `[1, z + 1)`.
    ///
    /// `sum_approx` is an a-priori approximation of the final sum and
    /// only feeds the completion estimate, never the result.
    #[must_use]
    pub fn new(x: i128, y: i64, z: i64, alpha: f64, sum_approx: i128) -> Self {
        let segment_size = next_power_of_2(isqrt(z).max(1 << 9));
        // Most hard special leaves are located just past this bound.
        let divisor = y as f64 * alpha.sqrt() * iroot::<6>(x) as f64;
        let smallest_hard_leaf = (x as f64 / divisor) as i64;

        Self {
            limit: z + 1,
            smallest_hard_leaf,
            sum_approx,
            start_time: wtime(),
            status: S2Status::new(x),
            inner: Mutex::new(Inner {
                low: 1,
                segments: 1,
                segment_size,
                total: 0,
                work_times: VecDeque::with_capacity(WORK_TIME_SAMPLES),
            }),
        }
    }

    /// Get the next work unit.
    ///
    /// `sum_delta` is the partial sum of the worker's previous unit
    /// (0 on the first call) and is always accumulated, even when no
    /// work remains. `runtime` is the worker's timing of the previous
    /// unit and drives the grow/shrink policy.
    pub fn get_work(&self, sum_delta: i128, runtime: &Runtime) -> Option<WorkUnit> {
        let (unit, more, total, balance) = {
            let mut inner = self.inner.lock().expect("balancer mutex poisoned");
            let high = inner.low + inner.segments * inner.segment_size;

            // Prevent assigning the bulk of the hard leaves to a
            // single thread: around smallest_hard_leaf the number of
            // segments is reduced to a minimum.
            if inner.low <= self.smallest_hard_leaf && high >= self.smallest_hard_leaf {
                inner.segments = 1;
            }

            let unit = WorkUnit {
                low: inner.low,
                segments: inner.segments,
                segment_size: inner.segment_size,
            };

            inner.total += sum_delta;
            inner.low = (inner.low + inner.segments * inner.segment_size).min(self.limit);

            if runtime.work > 0.0 {
                if inner.work_times.len() == WORK_TIME_SAMPLES {
                    inner.work_times.pop_front();
                }
                inner.work_times.push_back(runtime.work);
            }

            if self.is_increase(inner.total, runtime) {
                inner.segments += ceil_div(inner.segments, 3);
            } else {
                inner.segments -= inner.segments / 4;
            }

            let balance = load_balance_percent(inner.work_times.make_contiguous());
            (unit, unit.low < self.limit, inner.total, balance)
        };

        if config::is_print() {
            self.status.print(total, self.sum_approx, balance);
        }

        more.then_some(unit)
    }

    /// The accumulated sum of all `sum_delta` values.
    #[must_use]
    pub fn result(&self) -> i128 {
        self.inner.lock().expect("balancer mutex poisoned").total
    }

    // Decide whether the next work unit should be larger. A unit is
    // enlarged while it runs faster than a quarter of the estimated
    // remaining time, so the last units stay small and the stragglers
    // finish together.
    fn is_increase(&self, total: i128, runtime: &Runtime) -> bool {
        let min_secs = (runtime.init * 10.0).max(0.01);
        if runtime.work < min_secs {
            return true;
        }
        let total_time = wtime() - self.start_time;
        let percent = S2Status::skewed_percent(total, self.sum_approx).clamp(1.0, 99.9);
        let remaining = total_time * (100.0 / percent) - total_time;
        let threshold = (remaining / 4.0).max(min_secs);
        runtime.work < threshold
    }
}
