//! Progress estimation and throttled in-place status printing.
//!
//! The value of the special-leaf sum accumulates unevenly over the
//! sieve interval, so the raw ratio current / approx is a poor proxy
//! for elapsed time. `skewed_percent` warps that ratio through a
//! power curve, calibrated so the reported percent tracks wall time
//! far better than the linear ratio does.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::clock::wtime;

// Minimum milliseconds between status line updates.
const PRINT_INTERVAL_MS: u64 = 100;

/// Relative standard deviation (sigma / mu) of the samples, in percent.
///
/// Returns 0 for fewer than 2 samples or a zero mean.
#[must_use]
pub fn relative_standard_deviation(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let var = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / (n - 1.0);
    100.0 * var.sqrt() / mean
}

/// Load balance quality in percent: 100 means all recent work units
/// took the same time, lower means skewed distribution.
#[must_use]
pub fn load_balance_percent(work_times: &[f64]) -> f64 {
    let rsd = relative_standard_deviation(work_times);
    (100.0 - rsd + 0.5).clamp(0.0, 100.0)
}

/// Per-kernel progress estimator with throttled single-line printing.
///
/// All methods take `&self`; the print throttle is an atomic timestamp
/// so workers can report progress without any lock.
#[derive(Debug)]
pub struct S2Status {
    precision: usize,
    last_print_ms: AtomicU64,
}

impl S2Status {
    /// Create a status estimator for a computation on `x`. Larger x
    /// values progress more slowly and get more percent digits.
    #[must_use]
    pub fn new(x: i128) -> Self {
        let precision = if x >= 10i128.pow(23) {
            2
        } else if x >= 10i128.pow(21) {
            1
        } else {
            0
        };
        Self { precision, last_print_ms: AtomicU64::new(0) }
    }

    /// Percent complete of `current` towards `approx`, warped through
    /// a power curve (see module docs).
    ///
    /// Monotone in `current`, with fixed points at 0 and 100.
    #[must_use]
    pub fn skewed_percent(current: i128, approx: i128) -> f64 {
        if approx <= 0 {
            return 100.0;
        }
        let linear = (100.0 * current as f64 / approx as f64).clamp(0.0, 100.0);
        let base = 0.95 + linear / 2100.0;
        let floor = base.powf(100.0);
        let val = (100.0 * (base.powf(linear) - floor) / (1.0 - floor)).clamp(0.0, 100.0);
        100.0 - val
    }

    // Claim the right to print; at most one claim per PRINT_INTERVAL_MS.
    fn try_print(&self) -> bool {
        let now = (wtime() * 1000.0) as u64;
        let last = self.last_print_ms.load(Ordering::Relaxed);
        if now.saturating_sub(last) < PRINT_INTERVAL_MS && last != 0 {
            return false;
        }
        self.last_print_ms
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }

    /// Print the skewed percent and load balance on one CR-terminated
    /// line. I/O errors are ignored.
    pub fn print(&self, current: i128, approx: i128, load_balance: f64) {
        if !self.try_print() {
            return;
        }
        let percent = Self::skewed_percent(current, approx);
        let mut out = io::stdout();
        let _ = write!(
            out,
            "\r{:40}\rStatus: {:.*}%, Load balance: {:.0}%",
            "", self.precision, percent, load_balance
        );
        let _ = out.flush();
    }

    /// Print a linear progress percent (`current` out of `total`).
    pub fn print_progress(&self, current: i64, total: i64) {
        if total <= 0 || !self.try_print() {
            return;
        }
        let percent = (100.0 * current as f64 / total as f64).clamp(0.0, 100.0);
        let mut out = io::stdout();
        let _ = write!(out, "\rStatus: {:.*}%", self.precision, percent);
        let _ = out.flush();
    }
}
