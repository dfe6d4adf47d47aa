//! The A formula of Gourdon's algorithm.
//!
//! A(x, y) = sum over pairs of primes p < q with
//! x^(1/4)-ish < p <= x^(1/3) and p < q <= sqrt(x / p) of
//! pi(x / (p * q)), counted twice when x / (p * q) < y.

use rayon::prelude::*;
use tracing::debug;

use crate::clock::wtime;
use crate::config;
use crate::error::{Error, Result};
use crate::imath::{fast_div64, iroot, isqrt128};
use crate::parallel::ideal_num_threads;
use crate::pi_table::PiTable;
use crate::primes::generate_primes;
use crate::status::S2Status;
use crate::MAX_X;

/// Compute the A partial sum of Gourdon's algorithm.
///
/// Runs in parallel over the outer prime with dynamic scheduling; the
/// iteration count per outer prime shrinks rapidly, so static striping
/// would leave most threads idle.
///
/// # Errors
///
/// Returns an error if `x` is negative or exceeds [`MAX_X`], or if
/// `y < 1`.
pub fn a(x: i128, y: i64, threads: usize) -> Result<i128> {
    if !(0..=MAX_X).contains(&x) {
        return Err(Error::OutOfRange(format!("A(x, y) requires 0 <= x <= 10^27, got x = {x}")));
    }
    if y < 1 {
        return Err(Error::InvalidInput(format!("A(x, y) requires y >= 1, got y = {y}")));
    }

    let time = wtime();
    debug!("A(x = {x}, y = {y}, threads = {threads})");

    let sum = a_impl(x, y, threads)?;

    debug!("A = {sum}, {:.3}s", wtime() - time);
    Ok(sum)
}

fn a_impl(x: i128, y: i64, threads: usize) -> Result<i128> {
    let x13 = iroot::<3>(x);
    let y2 = i128::from(y) * i128::from(y);
    let start = (x / y2).max(i128::from(iroot::<4>(x)));
    if start >= i128::from(x13) {
        return Ok(0);
    }
    let start = start as i64;

    let threads = ideal_num_threads(threads, x13, 1000);
    let max_prime = isqrt128(x / i128::from(start));
    let primes = generate_primes(max_prime);
    let pi = PiTable::new(isqrt128(x));
    let pi_x13 = pi.pi(x13);
    let status = S2Status::new(x);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| Error::Internal(format!("thread pool: {e}")))?;

    let sum = pool.install(|| {
        (pi.pi(start) + 1..pi_x13 + 1)
            .into_par_iter()
            .map(|b| {
                let prime = primes[b as usize];
                let x2 = x / i128::from(prime);
                let max_j = pi.pi(isqrt128(x2));

                let mut sum: i128 = 0;
                for j in b + 1..=max_j {
                    let xn = fast_div64(x2, primes[j as usize]);
                    if xn < y {
                        sum += i128::from(pi.pi(xn)) * 2;
                    } else {
                        sum += i128::from(pi.pi(xn));
                    }
                }

                if config::is_print() {
                    status.print_progress(b, pi_x13);
                }
                sum
            })
            .sum::<i128>()
    });

    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a_small_values() {
        // verified against a direct evaluation over a full pi table
        assert_eq!(a(1_000_000, 150, 1).expect("valid input"), 5_769);
        assert_eq!(a(10_000_000, 300, 1).expect("valid input"), 23_877);
    }

    #[test]
    fn test_a_degenerate_range_is_zero() {
        // y <= x^(1/3) leaves no outer primes
        assert_eq!(a(1_000_000, 100, 1).expect("valid input"), 0);
        assert_eq!(a(0, 1, 1).expect("valid input"), 0);
        assert_eq!(a(3, 1, 1).expect("valid input"), 0);
    }

    #[test]
    fn test_a_rejects_bad_input() {
        assert!(a(-1, 10, 1).is_err());
        assert!(a(MAX_X + 1, 10, 1).is_err());
        assert!(a(100, 0, 1).is_err());
    }
}
