//! The 3rd partial sieve function P3(x, a), used in Lehmer's prime
//! counting formula.

use rayon::prelude::*;
use tracing::debug;

use crate::clock::wtime;
use crate::error::{Error, Result};
use crate::imath::{iroot, isqrt};
use crate::parallel::ideal_num_threads;
use crate::primes::{generate_primes, pi_bsearch};

/// P3(x, a) counts the numbers <= x that have exactly 3 prime factors,
/// each exceeding the a-th prime. Memory usage: O(pi(sqrt(x))).
///
/// The prime table only reaches sqrt(x), so every pi lookup
/// x / (primes[i] * primes[j]) must stay below sqrt(x). That holds
/// exactly when all factors exceed x^(1/4), so `a` must be at least
/// pi(x^(1/4)) -- the value Lehmer's formula calls this function with.
///
/// # Errors
///
/// Returns an error if `x` or `a` is negative, or if
/// `a < pi(x^(1/4))`.
pub fn p3(x: i64, a: i64, threads: usize) -> Result<i64> {
    if x < 0 {
        return Err(Error::OutOfRange(format!("P3(x, a) requires x >= 0, got x = {x}")));
    }
    if a < 0 {
        return Err(Error::InvalidInput(format!("P3(x, a) requires a >= 0, got a = {a}")));
    }

    let time = wtime();
    debug!("P3(x = {x}, a = {a}, threads = {threads})");

    let primes = generate_primes(isqrt(x));
    let pi_x14 = pi_bsearch(&primes, iroot::<4>(i128::from(x)));
    if a < pi_x14 {
        return Err(Error::InvalidInput(format!(
            "P3(x, a) requires a >= pi(x^(1/4)) = {pi_x14} so the pi lookups \
             stay below sqrt(x), got a = {a}"
        )));
    }

    let y = iroot::<3>(i128::from(x));
    let pi_y = pi_bsearch(&primes, y);
    let threads = ideal_num_threads(threads, pi_y, 100);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| Error::Internal(format!("thread pool: {e}")))?;

    let sum = pool.install(|| {
        (a + 1..pi_y + 1)
            .into_par_iter()
            .map(|i| {
                let xi = x / primes[i as usize];
                let bi = pi_bsearch(&primes, isqrt(xi));
                let mut sum = 0;
                for j in i..=bi {
                    sum += pi_bsearch(&primes, xi / primes[j as usize]) - (j - 1);
                }
                sum
            })
            .sum::<i64>()
    });

    debug!("P3 = {sum}, {:.3}s", wtime() - time);
    Ok(sum)
}
