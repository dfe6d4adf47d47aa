//! The contribution of the trivial special leaves.
//!
//! A special leaf n = primes[b] * primes[l] is trivial when
//! phi(x / n, b - 1) = 1, i.e. when x / n < primes[b]. Their total
//! contribution reduces to a sum of pi(y) - pi(max(x / p^2, p)) over
//! the primes p in (max(c-th prime, sqrt(z)), y).

use tracing::debug;

use crate::clock::wtime;
use crate::error::{Error, Result};
use crate::imath::{ceil_div, isqrt};
use crate::parallel::{ideal_num_threads, parallel_sum};
use crate::pi_table::PiTable;
use crate::primes::{nth_prime, PrimeIter};
use crate::MAX_X;

/// Compute the trivial special leaves of the Deleglise-Rivat
/// algorithm, in parallel over equal stripes of `[sqrt(z), y]`.
///
/// Requires the usual parameter relation z = x / y (so that
/// x / z stays at most y); c is the small prime-index threshold.
///
/// # Errors
///
/// Returns an error if `x` is negative or exceeds [`MAX_X`], if `y`,
/// `z` or `c` is less than 1, or if z is inconsistent with x / y.
pub fn s2_trivial(x: i128, y: i64, z: i64, c: i64, threads: usize) -> Result<i128> {
    if !(0..=MAX_X).contains(&x) {
        return Err(Error::OutOfRange(format!(
            "S2_trivial requires 0 <= x <= 10^27, got x = {x}"
        )));
    }
    if y < 1 || z < 1 || c < 1 {
        return Err(Error::InvalidInput(format!(
            "S2_trivial requires y, z, c >= 1, got y = {y}, z = {z}, c = {c}"
        )));
    }
    if x / (i128::from(z) + 1) >= i128::from(y) {
        return Err(Error::InvalidInput(format!(
            "S2_trivial requires z = x / y, got x = {x}, y = {y}, z = {z}"
        )));
    }

    let time = wtime();
    debug!("S2_trivial(x = {x}, y = {y}, z = {z}, c = {c}, threads = {threads})");

    let threads = ideal_num_threads(threads, y, 10_000_000);
    let pi = PiTable::new(y);
    let pi_y = pi.pi(y);
    let start = nth_prime(c).max(isqrt(z)) + 1;

    let sum = if start >= y {
        0
    } else {
        let thread_distance = ceil_div(y - start, threads as i64);
        parallel_sum(threads, |i| {
            let start = start + thread_distance * i as i64;
            let stop = (start + thread_distance).min(y);
            let mut it = PrimeIter::new(start - 1, stop);
            let mut sum: i128 = 0;
            loop {
                let prime = it.next_prime();
                if prime >= stop {
                    break;
                }
                let p = i128::from(prime);
                let xn = (x / (p * p)).max(p) as i64;
                sum += i128::from(pi_y - pi.pi(xn));
            }
            sum
        })
    };

    debug!("S2_trivial = {sum}, {:.3}s", wtime() - time);
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primes::generate_primes;

    // Count the trivial leaves directly: pairs (b, l) with b > c,
    // l > b, primes[b] * primes[l] <= x and x / n < primes[b]
    // (equivalent to phi(x / n, b - 1) = 1).
    fn s2_trivial_naive(x: i64, y: i64, c: i64) -> i128 {
        let primes = generate_primes(y);
        let n = primes.len() as i64 - 1;
        let mut count: i128 = 0;
        for b in c + 1..=n {
            for l in b + 1..=n {
                let product = primes[b as usize] * primes[l as usize];
                if product > x {
                    break;
                }
                if x / product < primes[b as usize] {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn test_s2_trivial_seeded_values() {
        assert_eq!(s2_trivial(1_000_000, 125, 8_000, 6, 1).expect("valid input"), 13);
        assert_eq!(s2_trivial(10_000_000, 250, 40_000, 6, 1).expect("valid input"), 20);
    }

    #[test]
    fn test_s2_trivial_matches_naive() {
        // y close to alpha * x^(1/3), z = x / y, assorted c
        let cases = [
            (20_000i64, 40, 3),
            (100_000, 60, 4),
            (1_000_000, 125, 6),
            (3_000_000, 200, 6),
            (10_000_000, 250, 6),
        ];
        for (x, y, c) in cases {
            let z = x / y;
            assert_eq!(
                s2_trivial(i128::from(x), y, z, c, 1).expect("valid input"),
                s2_trivial_naive(x, y, c),
                "S2_trivial({x}, {y}, {z}, {c})"
            );
        }
    }

    #[test]
    fn test_s2_trivial_empty_range_is_zero() {
        // c-th prime at or above y leaves no primes to scan
        assert_eq!(s2_trivial(1_000, 10, 100, 4, 1).expect("valid input"), 0);
    }

    #[test]
    fn test_s2_trivial_rejects_bad_input() {
        assert!(s2_trivial(-1, 10, 10, 1, 1).is_err());
        assert!(s2_trivial(MAX_X + 1, 10, 10, 1, 1).is_err());
        assert!(s2_trivial(100, 0, 10, 1, 1).is_err());
        assert!(s2_trivial(100, 10, 10, 0, 1).is_err());
        // z far smaller than x / y
        assert!(s2_trivial(1_000_000, 125, 100, 6, 1).is_err());
    }
}
