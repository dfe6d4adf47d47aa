//! The B formula of Gourdon's algorithm.
//!
//! B(x, y) = sum over primes y < p <= sqrt(x) of pi(x / p). It is a
//! partial computation of the P2(x, a) formula from the Lagarias-
//! Miller-Odlyzko and Deleglise-Rivat algorithms and runs in
//! O(z log log z) operations and O(sqrt(z)) memory, with z = x / y.
//!
//! Instead of a pi lookup table (which would need O(z) memory), each
//! worker thread walks its stripe of [2, z) with a forward prime
//! iterator, counting primes on the fly while a reverse iterator
//! enumerates the p values. The per-stripe counts are merged in
//! stripe order afterwards: a stripe's running pi values are missing
//! the primes of all lower stripes, so `pix_total * pix_count` is
//! added as a correction. This in-order merge is the one place where
//! the reduction is not commutative.

use std::thread;

use tracing::debug;

use crate::aligned::AlignedVec;
use crate::clock::wtime;
use crate::config;
use crate::error::{Error, Result};
use crate::imath::{ceil_div, fast_div64, isqrt128};
use crate::parallel::validate_threads;
use crate::primes::{PrimeIter, PrimeIterRev};
use crate::status::S2Status;
use crate::MAX_X;

/// Compute the B partial sum of Gourdon's algorithm.
///
/// # Errors
///
/// Returns an error if `x` is negative or exceeds [`MAX_X`], if
/// `y < 1`, or if `x / y` does not fit in 64 bits.
pub fn b(x: i128, y: i64, threads: usize) -> Result<i128> {
    if !(0..=MAX_X).contains(&x) {
        return Err(Error::OutOfRange(format!("B(x, y) requires 0 <= x <= 10^27, got x = {x}")));
    }
    if y < 1 {
        return Err(Error::InvalidInput(format!("B(x, y) requires y >= 1, got y = {y}")));
    }
    let z = x / i128::from(y);
    if z > i128::from(i64::MAX) {
        return Err(Error::OutOfRange(format!(
            "B(x, y) requires x / y to fit in 64 bits, got {z}"
        )));
    }

    let time = wtime();
    debug!("B(x = {x}, y = {y}, threads = {threads})");

    let sum = b_impl(x, y, z as i64, threads);

    debug!("B = {sum}, {:.3}s", wtime() - time);
    Ok(sum)
}

// Count the primes of the stripe inside (prime, stop], advancing the
// stripe's forward iterator.
fn count_primes(it: &mut PrimeIter, prime: &mut i64, stop: i64) -> i64 {
    let mut count = 0;
    while *prime <= stop {
        *prime = it.next_prime();
        count += 1;
    }
    count
}

#[allow(clippy::too_many_arguments)]
fn b_thread(
    x: i128,
    y: i64,
    z: i64,
    mut low: i64,
    thread_num: i64,
    thread_distance: i64,
    sqrtx: i64,
    pix: &mut i64,
    pix_count: &mut i64,
) -> i128 {
    *pix = 0;
    *pix_count = 0;
    let mut sum: i128 = 0;

    low += thread_distance * thread_num;
    let high = (low + thread_distance).min(z);
    let start = fast_div64(x, high).max(y);
    let stop = fast_div64(x, low).min(sqrtx);

    let mut rit = PrimeIterRev::new(stop + 1, start);
    let mut it = PrimeIter::new(low - 1, high);
    let mut next = it.next_prime();
    let mut prime = rit.prev_prime();

    // sum of pi(x / prime) for the primes inside (start, stop],
    // with pi counted relative to the stripe [low, high)
    while prime > start {
        let xp = fast_div64(x, prime);
        if xp >= high {
            break;
        }
        *pix += count_primes(&mut it, &mut next, xp);
        *pix_count += 1;
        sum += i128::from(*pix);
        prime = rit.prev_prime();
    }

    // finish counting the stripe so the in-order merge sees pi(high - 1)
    *pix += count_primes(&mut it, &mut next, high - 1);

    sum
}

fn b_impl(x: i128, y: i64, z: i64, threads: usize) -> i128 {
    if x < 4 {
        return 0;
    }

    let mut sum: i128 = 0;
    let mut pix_total: i128 = 0;
    let mut low: i64 = 2;
    let min_distance: i64 = 1 << 23;
    let mut thread_distance = min_distance;

    let sqrtx = isqrt128(x);
    let max_threads = validate_threads(threads);
    let status = S2Status::new(x);

    while low < z {
        let max_useful = ceil_div(z - low, thread_distance).max(1);
        let threads = max_threads.min(usize::try_from(max_useful).unwrap_or(usize::MAX));
        let time = wtime();

        let mut pix = AlignedVec::<i64>::new(threads);
        let mut pix_counts = AlignedVec::<i64>::new(threads);

        thread::scope(|scope| {
            let handles: Vec<_> = pix
                .iter_mut()
                .zip(pix_counts.iter_mut())
                .enumerate()
                .map(|(i, (pix_i, count_i))| {
                    scope.spawn(move || {
                        b_thread(x, y, z, low, i as i64, thread_distance, sqrtx, pix_i, count_i)
                    })
                })
                .collect();
            for handle in handles {
                sum += handle.join().expect("worker thread panicked");
            }
        });

        low += thread_distance * threads as i64;
        balance_load(&mut thread_distance, low, z, threads, time);

        // add the missing contributions of the lower stripes, in order
        for i in 0..threads {
            sum += pix_total * i128::from(pix_counts[i]);
            pix_total += i128::from(pix[i]);
        }

        if config::is_print() {
            status.print_progress(low.min(z), z);
        }
    }

    sum
}

// Gradually increase the per-thread sieving distance to keep all CPU
// cores busy: double while a round takes less than a minute, halve
// when it takes longer.
fn balance_load(thread_distance: &mut i64, low: i64, z: i64, threads: usize, start_time: f64) {
    let seconds = wtime() - start_time;
    let min_distance: i64 = 1 << 23;
    let max_distance = ceil_div(z - low, threads as i64);

    if seconds < 60.0 {
        *thread_distance *= 2;
    }
    if seconds > 60.0 {
        *thread_distance /= 2;
    }
    *thread_distance = (*thread_distance).max(min_distance).min(max_distance.max(1));
}
