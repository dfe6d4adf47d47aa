//! Monotonic wall-clock time and per-worker runtime accounting.

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Get the monotonic wall time in seconds, anchored at first use.
#[must_use]
pub fn wtime() -> f64 {
    EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// Per-worker runtime record: how long the worker spent initializing
/// its sieve segment versus actually sieving the last work unit.
///
/// The load balancers react to these durations when deciding whether
/// to grow or shrink the next work unit.
#[derive(Debug, Default, Clone, Copy)]
pub struct Runtime {
    /// Seconds spent initializing the last sieve segment.
    pub init: f64,
    /// Seconds spent sieving the last work unit.
    pub work: f64,
    mark: f64,
}

impl Runtime {
    /// Start timing segment initialization.
    pub fn init_start(&mut self) {
        self.mark = wtime();
    }

    /// Stop timing segment initialization.
    pub fn init_stop(&mut self) {
        self.init = wtime() - self.mark;
    }

    /// Start timing the work unit.
    pub fn start(&mut self) {
        self.mark = wtime();
    }

    /// Stop timing the work unit.
    pub fn stop(&mut self) {
        self.work = wtime() - self.mark;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wtime_monotonic() {
        let t1 = wtime();
        let t2 = wtime();
        assert!(t2 >= t1);
    }

    #[test]
    fn test_runtime_default_is_zero() {
        let rt = Runtime::default();
        assert_eq!(rt.init, 0.0);
        assert_eq!(rt.work, 0.0);
    }

    #[test]
    fn test_runtime_measures_elapsed() {
        let mut rt = Runtime::default();
        rt.start();
        std::thread::sleep(std::time::Duration::from_millis(5));
        rt.stop();
        assert!(rt.work > 0.0);

        rt.init_start();
        rt.init_stop();
        assert!(rt.init >= 0.0);
    }
}
