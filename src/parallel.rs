//! Parallel-for-with-reduction primitives.
//!
//! Two shapes of parallelism are used by the kernels: static stripes,
//! where worker i processes a fixed slice of the range, and dynamic
//! pull-based scheduling, where workers repeatedly ask a load balancer
//! for the next interval. Both reduce by exact integer addition, so
//! results are independent of thread interleaving.

use std::thread;

use crate::balance::{GourdonBalancer, GourdonWorker, LoadBalancer, WorkUnit};
use crate::clock::Runtime;
use crate::config;

/// Resolve a requested thread count: 0 means the process-wide default,
/// everything is clamped to `[1, hardware_concurrency]`.
#[must_use]
pub fn validate_threads(threads: usize) -> usize {
    let hardware = thread::available_parallelism().map_or(1, usize::from);
    let threads = if threads == 0 { config::get_num_threads() } else { threads };
    threads.clamp(1, hardware)
}

/// Clamp the thread count so every thread gets at least
/// `thread_threshold` units of the `sieve_limit`-sized workload.
#[must_use]
pub fn ideal_num_threads(threads: usize, sieve_limit: i64, thread_threshold: i64) -> usize {
    let threads = validate_threads(threads);
    let max_threads = (sieve_limit / thread_threshold.max(1)).max(1);
    threads.min(usize::try_from(max_threads).unwrap_or(usize::MAX))
}

/// Run `f(0), f(1), ..., f(threads - 1)` on scoped worker threads and
/// return the sum of the results (static striping).
pub fn parallel_sum<F>(threads: usize, f: F) -> i128
where
    F: Fn(usize) -> i128 + Sync,
{
    if threads <= 1 {
        return f(0);
    }
    let f = &f;
    thread::scope(|scope| {
        let handles: Vec<_> = (0..threads).map(|i| scope.spawn(move || f(i))).collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker thread panicked"))
            .sum()
    })
}

/// Run `threads` workers that pull work units from an LMO-flavour
/// [`LoadBalancer`] until it is exhausted, then return the reduced sum.
///
/// `f` processes one work unit and returns its partial sum; it should
/// record its segment-init and sieve durations in the passed
/// [`Runtime`] so the balancer can adapt.
pub fn balanced_reduce<F>(threads: usize, balancer: &LoadBalancer, f: F) -> i128
where
    F: Fn(&WorkUnit, &mut Runtime) -> i128 + Sync,
{
    thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                let mut runtime = Runtime::default();
                let mut sum: i128 = 0;
                while let Some(unit) = balancer.get_work(sum, &runtime) {
                    sum = f(&unit, &mut runtime);
                }
            });
        }
    });
    balancer.result()
}

/// Run `threads` workers that pull work units from a Gourdon-flavour
/// [`GourdonBalancer`] until it is exhausted, then return the reduced
/// sum.
pub fn gourdon_reduce<F>(threads: usize, balancer: &GourdonBalancer, f: F) -> i128
where
    F: Fn(&WorkUnit, &mut Runtime) -> i128 + Sync,
{
    thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                let mut worker = GourdonWorker::default();
                while balancer.get_work(&mut worker) {
                    worker.sum = f(&worker.unit(), &mut worker.runtime);
                }
            });
        }
    });
    balancer.result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_threads() {
        assert!(validate_threads(0) >= 1);
        assert_eq!(validate_threads(1), 1);
        assert!(validate_threads(usize::MAX) >= 1);
    }

    #[test]
    fn test_ideal_num_threads_clamps_to_workload() {
        assert_eq!(ideal_num_threads(8, 50, 100), 1);
        assert_eq!(ideal_num_threads(8, 100, 100), 1);
        let t = ideal_num_threads(2, 10_000_000, 100);
        assert!(t >= 1 && t <= 2);
    }

    #[test]
    fn test_parallel_sum_matches_sequential() {
        let f = |i: usize| (i as i128 + 1) * 10;
        let seq: i128 = (0..4).map(f).sum();
        assert_eq!(parallel_sum(4, f), seq);
        assert_eq!(parallel_sum(1, f), 10);
    }

    #[test]
    fn test_balanced_reduce_sums_interval_lengths() {
        // sum over the exact cover of [1, z + 1) must equal z
        let z = 1 << 18;
        for threads in [1, 2, 4] {
            let balancer = LoadBalancer::new(10i128.pow(12), 20_000, z, 1.0, 1000);
            let total = balanced_reduce(threads, &balancer, |unit, _| {
                let high = unit.high().min(z + 1);
                i128::from(high - unit.low)
            });
            assert_eq!(total, i128::from(z), "threads = {threads}");
        }
    }

    #[test]
    fn test_gourdon_reduce_sums_interval_lengths() {
        let limit = 2_000_000;
        for threads in [1, 2, 4] {
            let balancer = GourdonBalancer::new(10i128.pow(14), limit, 1000);
            let total = gourdon_reduce(threads, &balancer, |unit, _| {
                let high = unit.high().min(limit + 1);
                i128::from(high - unit.low)
            });
            assert_eq!(total, i128::from(limit) + 1, "threads = {threads}");
        }
    }
}
